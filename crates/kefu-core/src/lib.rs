pub mod ai;
pub mod config;
pub mod error;
pub mod model;
pub mod prompt;
pub mod provider;
pub mod reply;
pub mod session;

// Re-export main types for convenience
pub use ai::{ClaudeClient, EchoClient, GeminiClient, OllamaClient, OpenAIClient};
pub use config::Config;
pub use error::{CoreError, CoreResult};
pub use model::{Customer, ImageAttachment, Message, MessageKind, Sender};
pub use provider::{Provider, ReplyClient};
pub use reply::{ReplyService, EMPTY_REPLY, FALLBACK_REPLY};
pub use session::Conversations;
