//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

use vbot_models::{ErrorBody, ModelError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vbot_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] vbot_queue::QueueError),
}

impl From<ModelError> for ApiError {
    fn from(e: ModelError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Queue(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> Option<&'static str> {
        match self {
            ApiError::RateLimited => Some("rate_limited"),
            _ => None,
        }
    }
}

/// Detail sent instead of internal error text when redaction is on.
pub const REDACTED_DETAIL: &str = "An internal error occurred";

/// Response extension marking a body that carries internal error text.
#[derive(Debug, Clone, Copy)]
pub struct InternalErrorDetail;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (detail, internal) = match &self {
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => (msg.clone(), false),
            ApiError::RateLimited => ("Rate limit exceeded".to_string(), false),
            _ => (self.to_string(), true),
        };

        let body = ErrorBody {
            detail,
            code: self.code().map(str::to_string),
        };

        let mut response = (status, Json(body)).into_response();
        if internal {
            response.extensions_mut().insert(InternalErrorDetail);
        }
        response
    }
}

/// Replace internal error bodies with [`REDACTED_DETAIL`]. Installed by the
/// router in production.
pub async fn redact_internal_errors(response: Response) -> Response {
    if response.extensions().get::<InternalErrorDetail>().is_none() {
        return response;
    }
    let body = ErrorBody {
        detail: REDACTED_DETAIL.to_string(),
        code: None,
    };
    (response.status(), Json(body)).into_response()
}
