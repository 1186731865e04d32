//! Error types for the core library.

use thiserror::Error;

use crate::provider::Provider;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown customer: {0}")]
    UnknownCustomer(String),

    #[error("customer name must not be empty")]
    EmptyName,

    #[error("no API key configured for {}", .0.display_name())]
    MissingApiKey(Provider),

    #[error("unsupported image type: {0} (expected png, jpeg or webp)")]
    UnsupportedImage(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;
