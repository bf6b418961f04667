//! Job submission handler.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use tracing::{error, info};

use vbot_models::{
    validate_url, ConversionRequest, JobPatch, OutputFormat, Quality, SubmitQuery, SubmitResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Turn raw query parameters into a conversion request.
///
/// Audio-only formats always carry `auto`; `auto` on a video format becomes
/// the default preset.
pub fn parse_submission(query: &SubmitQuery, allowed_domains: &[String]) -> ApiResult<ConversionRequest> {
    let format: OutputFormat = query.format.parse()?;
    let quality: Quality = query.quality.parse()?;
    let quality = if format.is_audio() {
        Quality::Auto
    } else {
        quality.resolve()
    };

    let url = query.url.trim();
    validate_url(url, allowed_domains)?;

    Ok(ConversionRequest::new(url, format, quality))
}

/// Create a job and enqueue it for conversion.
pub async fn submit_download(
    State(state): State<AppState>,
    query: Result<Query<SubmitQuery>, QueryRejection>,
) -> ApiResult<Json<SubmitResponse>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let request = parse_submission(&query, &state.config.allowed_domains)?;
    let format = request.format;

    let job_id = state.store.create(request).await?;

    if let Err(e) = state.queue.push(&job_id).await {
        error!(job_id = %job_id, "Failed to enqueue job: {}", e);
        state
            .store
            .update(
                &job_id,
                JobPatch::failed("Failed to enqueue the job", Some("queue_unavailable".to_string())),
            )
            .await
            .ok();
        return Err(e.into());
    }

    info!(job_id = %job_id, format = %format, "Job submitted");
    metrics::record_job_submitted(format.as_str());

    Ok(Json(SubmitResponse { job_id }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(url: &str, format: &str, quality: &str) -> SubmitQuery {
        SubmitQuery {
            url: url.to_string(),
            format: format.to_string(),
            quality: quality.to_string(),
        }
    }

    fn domains() -> Vec<String> {
        vec!["youtube.com".to_string(), "youtu.be".to_string()]
    }

    #[test]
    fn test_audio_format_forces_auto_quality() {
        let request =
            parse_submission(&query("https://youtu.be/x", "mp3", "1080p"), &domains()).unwrap();
        assert_eq!(request.format, OutputFormat::Mp3);
        assert_eq!(request.quality, Quality::Auto);
    }

    #[test]
    fn test_auto_on_video_resolves_to_default() {
        let request =
            parse_submission(&query("https://www.youtube.com/watch?v=1", "mp4", "auto"), &domains())
                .unwrap();
        assert_eq!(request.quality, Quality::P720);
    }

    #[test]
    fn test_rejections() {
        assert!(parse_submission(&query("https://youtu.be/x", "flac", "720p"), &domains()).is_err());
        assert!(parse_submission(&query("https://youtu.be/x", "mp4", "4k"), &domains()).is_err());
        assert!(parse_submission(&query("https://vimeo.com/1", "mp4", "720p"), &domains()).is_err());
        assert!(parse_submission(&query("ftp://youtu.be/x", "mp4", "720p"), &domains()).is_err());
    }
}
