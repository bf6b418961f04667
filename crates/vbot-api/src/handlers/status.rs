//! Job status handler.

use axum::extract::{Path, State};
use axum::Json;

use vbot_models::{JobId, StatusPayload};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Current snapshot of a job.
pub async fn get_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<StatusPayload>> {
    let job = state
        .store
        .get(&JobId::from(job_id))
        .await?
        .ok_or_else(|| ApiError::not_found("job not found"))?;

    Ok(Json(StatusPayload::from(&job)))
}
