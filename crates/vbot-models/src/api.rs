//! HTTP request/response bodies shared by the server and the client.

use serde::{Deserialize, Serialize};

use crate::JobId;

/// Query string of `POST /api/download`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitQuery {
    pub url: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default = "default_quality")]
    pub quality: String,
}

fn default_format() -> String {
    "mp4".to_string()
}

fn default_quality() -> String {
    "720p".to_string()
}

/// Successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub job_id: JobId,
}

/// Structured error body, `{"detail": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Response of `DELETE /api/file/{job_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFileResponse {
    pub ok: bool,
}
