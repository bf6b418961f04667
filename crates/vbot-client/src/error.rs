//! Client error types.

use thiserror::Error;

use vbot_models::ModelError;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (network, DNS, TLS, timeout).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("Server returned {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Invalid response: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rejected locally before anything was sent.
    #[error("{0}")]
    Invalid(#[from] ModelError),

    #[error("Invalid server URL: {0}")]
    BaseUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn status(status: u16, detail: impl Into<String>) -> Self {
        Self::Status {
            status,
            detail: detail.into(),
        }
    }
}
