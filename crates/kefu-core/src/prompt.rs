//! Shapes a conversation into a provider-neutral completion request.

use crate::model::{strip_data_url_prefix, ImageAttachment, Message, MessageKind, Sender};

/// Number of earlier messages sent along with each new turn
pub const DEFAULT_HISTORY_WINDOW: usize = 15;

/// Stand-in text for historical image turns, which are sent as text only
pub const SHARED_IMAGE_TEXT: &str = "Shared an image";

/// Prompt used when an image is sent without any text
pub const ANALYZE_IMAGE_TEXT: &str = "请帮我看看这个图片里的问题 (Please analyze this image)";

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are Lao Li (老李), a senior application engineer at a factory that makes \
taps, drills, dies and knurling tools. You are chatting over instant messaging \
with long-standing customers who treat you as an old friend.

Keep replies short and casual, like a chat app, not an email. Be the expert: \
spot machining problems quickly (wear, breakage, wrong speed or feed) and \
recommend the right tool spec. For broken taps ask about material hardness and \
cutting fluid. If they send a picture, assume it shows a tool failure or a \
workpiece defect and analyse it. For prices, confirm the spec first and say \
finance will send a quote.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Model => "model",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload, no data-URL header
    pub data: String,
}

impl From<&ImageAttachment> for InlineImage {
    fn from(img: &ImageAttachment) -> Self {
        Self {
            mime_type: img.mime_type.clone(),
            data: strip_data_url_prefix(&img.data).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    pub image: Option<InlineImage>,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub history: Vec<Turn>,
    pub current: Turn,
}

/// Map a stored message to a history turn. Earlier images are not resent.
///
/// The model speaks as the operator, so the operator's earlier messages are
/// its own turns and the customer's lines are the user's.
fn history_turn(message: &Message) -> Turn {
    let role = match message.sender {
        Sender::Me => TurnRole::Model,
        Sender::Other => TurnRole::User,
    };

    let text = match message.kind {
        MessageKind::Image if message.text.is_empty() => SHARED_IMAGE_TEXT.to_string(),
        _ => message.text.clone(),
    };

    Turn { role, text, image: None }
}

/// Build the request for a new turn.
///
/// `history` is the conversation before the new turn; only its last `window`
/// messages are included.
pub fn build_request(
    system: &str,
    history: &[Message],
    text: &str,
    image: Option<&ImageAttachment>,
    window: usize,
) -> CompletionRequest {
    let start = history.len().saturating_sub(window);
    let history = history[start..].iter().map(history_turn).collect();

    let text = if text.is_empty() && image.is_some() {
        ANALYZE_IMAGE_TEXT.to_string()
    } else {
        text.to_string()
    };

    CompletionRequest {
        system: system.to_string(),
        history,
        current: Turn {
            role: TurnRole::User,
            text,
            image: image.map(InlineImage::from),
        },
    }
}
