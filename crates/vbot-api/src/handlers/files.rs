//! Artifact download and deletion handlers.

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use vbot_models::{DeleteFileResponse, JobId};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Quoted, header-safe attachment disposition.
fn content_disposition(filename: &str) -> HeaderValue {
    let sanitized: String = filename
        .chars()
        .map(|c| if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' { c } else { '_' })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", sanitized))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Stream a finished job's output file.
pub async fn get_file(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Response> {
    let job_id = JobId::from(job_id);
    let (artifact, file) = state.artifacts.fetch(&job_id).await.map_err(|e| {
        if e.is_not_found() {
            ApiError::not_found("file not ready")
        } else {
            ApiError::from(e)
        }
    })?;

    metrics::record_file_served();
    info!(job_id = %job_id, filename = %artifact.filename, "Serving file");

    let content_type = HeaderValue::from_str(&artifact.mimetype)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    let body = Body::from_stream(ReaderStream::new(file));

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition(&artifact.filename)),
            (header::CONTENT_LENGTH, HeaderValue::from(artifact.size_bytes)),
        ],
        body,
    )
        .into_response())
}

/// Remove a job's output file. The job record is left untouched.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<DeleteFileResponse>> {
    let job_id = JobId::from(job_id);
    match state.artifacts.delete(&job_id).await {
        Ok(()) => {
            info!(job_id = %job_id, "Deleted file");
            Ok(Json(DeleteFileResponse { ok: true }))
        }
        Err(e) if e.is_not_found() => Err(ApiError::not_found("not found")),
        Err(e) => {
            warn!(job_id = %job_id, "Failed to delete file: {}", e);
            Err(e.into())
        }
    }
}
