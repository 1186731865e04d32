//! UI-agnostic conversation records
//!
//! Customers, messages and image attachments. These types don't depend on
//! any UI framework and are shared by everything above the core crate.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// Preview shown in the customer list for image messages
pub const IMAGE_PREVIEW: &str = "[图片]";

/// Preview given to a freshly added customer
pub const NEW_CUSTOMER_PREVIEW: &str = "刚添加了好友";

/// Who sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    /// Typed and sent from this console
    Me,
    /// The counterpart's reply, produced by the AI provider
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Text,
    Image,
}

/// An inline image, base64 encoded without any data-URL header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub data: String,
}

impl ImageAttachment {
    /// Read an image from disk. Only png, jpeg and webp are accepted.
    pub fn from_path(path: &Path) -> CoreResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let mime_type = match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            _ => return Err(CoreError::UnsupportedImage(path.display().to_string())),
        };

        let bytes = std::fs::read(path)?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            data: STANDARD.encode(bytes),
        })
    }

    /// Parse `data:<mime>;base64,<payload>`. A string without a header is
    /// taken as a raw jpeg payload.
    pub fn from_data_url(url: &str) -> Self {
        let mime_type = url
            .strip_prefix("data:")
            .and_then(|rest| rest.split([';', ',']).next())
            .filter(|m| !m.is_empty())
            .unwrap_or("image/jpeg");

        Self {
            mime_type: mime_type.to_string(),
            data: strip_data_url_prefix(url).to_string(),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Approximate decoded size in bytes
    pub fn byte_len(&self) -> usize {
        let padding = self.data.chars().rev().take_while(|c| *c == '=').count();
        (self.data.len() / 4 * 3).saturating_sub(padding)
    }
}

/// Drop everything up to and including the first comma of a data URL.
pub fn strip_data_url_prefix(url: &str) -> &str {
    match url.split_once(',') {
        Some((_, payload)) => payload,
        None => url,
    }
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub kind: MessageKind,
    pub image: Option<ImageAttachment>,
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl Message {
    pub fn text(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            kind: MessageKind::Text,
            image: None,
            timestamp: Utc::now(),
            text: text.into(),
        }
    }

    pub fn image(sender: Sender, text: impl Into<String>, image: ImageAttachment) -> Self {
        Self {
            kind: MessageKind::Image,
            image: Some(image),
            ..Self::text(sender, text)
        }
    }

    /// Backdate a message, used for seed data
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Text shown in the customer list when this is the latest message
    pub fn preview(&self) -> &str {
        match self.kind {
            MessageKind::Image => IMAGE_PREVIEW,
            MessageKind::Text => &self.text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub avatar_seed: String,
    pub last_message: Option<String>,
    pub last_message_time: Option<DateTime<Utc>>,
}

impl Customer {
    /// A newly added contact with a fresh id and a random avatar
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: format!("c{}", Uuid::new_v4().simple()),
            name: name.into(),
            avatar_seed: Uuid::new_v4().simple().to_string(),
            last_message: Some(NEW_CUSTOMER_PREVIEW.to_string()),
            last_message_time: Some(Utc::now()),
        }
    }

    pub fn avatar_url(&self) -> String {
        format!("https://picsum.photos/seed/{}/200", self.avatar_seed)
    }

    /// Stable palette index for the avatar badge
    pub fn avatar_index(&self, palette_len: usize) -> usize {
        if palette_len == 0 {
            return 0;
        }
        let hash = self
            .avatar_seed
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        hash as usize % palette_len
    }

    /// First character of the name, for the avatar badge
    pub fn initial(&self) -> char {
        self.name.chars().next().unwrap_or('?')
    }
}
