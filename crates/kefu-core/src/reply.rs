//! Turns a conversation into the counterpart's next message.
//!
//! This is the one place a provider failure is handled: whatever goes wrong,
//! the caller gets a string it can append.

use tracing::{debug, error};

use crate::model::{ImageAttachment, Message};
use crate::prompt::{build_request, DEFAULT_HISTORY_WINDOW, DEFAULT_SYSTEM_PROMPT};
use crate::provider::ReplyClient;

/// Appended in place of a reply when the provider call fails
pub const FALLBACK_REPLY: &str = "哎呀，网络有点卡，刚才没听清。再说一遍？(Network error)";

/// Appended when the provider answers with no text
pub const EMPTY_REPLY: &str = "Receive empty response.";

#[derive(Clone)]
pub struct ReplyService {
    client: ReplyClient,
    model: String,
    system_prompt: String,
    history_window: usize,
}

impl ReplyService {
    pub fn new(client: ReplyClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_window: DEFAULT_HISTORY_WINDOW,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Generate the next reply. `history` excludes the turn being sent.
    pub async fn generate_reply(
        &self,
        history: &[Message],
        text: &str,
        image: Option<&ImageAttachment>,
    ) -> String {
        let request = build_request(
            &self.system_prompt,
            history,
            text,
            image,
            self.history_window,
        );

        debug!(
            provider = self.client.provider().as_str(),
            model = %self.model,
            history = request.history.len(),
            has_image = request.current.image.is_some(),
            "requesting reply"
        );

        match self.client.complete(&self.model, &request).await {
            Ok(reply) => non_empty(reply),
            Err(e) => {
                error!(provider = self.client.provider().as_str(), error = %e, "reply generation failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}

/// Only a reply with no text at all is replaced; whitespace is passed through
fn non_empty(reply: String) -> String {
    if reply.is_empty() {
        EMPTY_REPLY.to_string()
    } else {
        reply
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{EchoClient, OllamaClient};
    use crate::model::Sender;
    use std::time::Duration;

    fn echo_service() -> ReplyService {
        ReplyService::new(ReplyClient::Echo(EchoClient::new(Duration::ZERO)), "echo")
    }

    #[tokio::test]
    async fn successful_reply_is_returned() {
        let history = vec![Message::text(Sender::Other, "老李，在吗")];
        let reply = echo_service().generate_reply(&history, "在的", None).await;
        assert_eq!(reply, "[echo] 在的");
    }

    #[tokio::test]
    async fn failure_falls_back_to_static_reply() {
        let client = ReplyClient::Ollama(OllamaClient::new("http://127.0.0.1:9"));
        let service = ReplyService::new(client, "gemma3:latest");
        let reply = service.generate_reply(&[], "hello", None).await;
        assert_eq!(reply, FALLBACK_REPLY);
    }

    #[test]
    fn empty_reply_gets_placeholder() {
        assert_eq!(non_empty(String::new()), EMPTY_REPLY);
        assert_eq!(non_empty("  ".to_string()), "  ");
        assert_eq!(non_empty("好的".to_string()), "好的");
    }

    #[test]
    fn builder_overrides() {
        let mut service = echo_service()
            .with_system_prompt("be brief")
            .with_history_window(4);
        service.set_model("other");
        assert_eq!(service.model(), "other");
        assert_eq!(service.history_window, 4);
        assert_eq!(service.system_prompt, "be brief");
    }
}
