//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("quality must be one of {allowed:?} or 'auto'")]
    UnsupportedQuality { value: String, allowed: Vec<&'static str> },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid URL scheme")]
    InvalidScheme,

    #[error("Link from an unsupported domain")]
    DomainNotAllowed(String),
}
