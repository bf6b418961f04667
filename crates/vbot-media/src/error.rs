//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while retrieving or converting media.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("yt-dlp not found in PATH")]
    YtDlpNotFound,

    #[error("Probe failed: {message}")]
    ProbeFailed { message: String },

    #[error("Download failed: {message}")]
    DownloadFailed { message: String },

    #[error("Source rate limited the download: {0}")]
    RateLimited(String),

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("Estimated size (~{size_mb} MB) exceeds the {limit_mb} MB limit")]
    TooLarge { size_mb: f64, limit_mb: u64 },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create a probe failure error.
    pub fn probe_failed(message: impl Into<String>) -> Self {
        Self::ProbeFailed {
            message: message.into(),
        }
    }

    /// Create a download failure error.
    pub fn download_failed(message: impl Into<String>) -> Self {
        Self::DownloadFailed {
            message: message.into(),
        }
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Machine-readable reason code recorded with a failed job.
    pub fn reason(&self) -> &'static str {
        match self {
            MediaError::ProbeFailed { message } | MediaError::DownloadFailed { message } => {
                classify_source_failure(message).unwrap_or("download_failed")
            }
            MediaError::RateLimited(_) => "rate_limited",
            MediaError::FfmpegFailed { .. } | MediaError::FfmpegNotFound => "conversion_failed",
            MediaError::TooLarge { .. } => "too_large",
            MediaError::UnsupportedFormat(_) => "unsupported_format",
            _ => "internal",
        }
    }

    /// Human-readable message recorded with a failed job.
    pub fn user_message(&self) -> String {
        match self.reason() {
            "age_restricted" => "Video is age-restricted".to_string(),
            "private" => "Video is private".to_string(),
            "unavailable" => "Video unavailable".to_string(),
            "geo_blocked" => "Video is not available in this region".to_string(),
            "live_stream" => "Live streams are not supported".to_string(),
            _ => self.to_string(),
        }
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            MediaError::RateLimited(_) => true,
            MediaError::ProbeFailed { message } | MediaError::DownloadFailed { message } => {
                classify_source_failure(message).is_none() && looks_transient(message)
            }
            _ => false,
        }
    }
}

/// Map yt-dlp error text to a permanent failure reason.
fn classify_source_failure(message: &str) -> Option<&'static str> {
    let msg = message.to_lowercase();

    if msg.contains("age") && (msg.contains("restrict") || msg.contains("verif") || msg.contains("confirm your age")) {
        return Some("age_restricted");
    }
    if msg.contains("private video") || msg.contains("video is private") {
        return Some("private");
    }
    if msg.contains("video unavailable")
        || msg.contains("video is unavailable")
        || msg.contains("video not available")
        || msg.contains("video has been removed")
        || msg.contains("video was deleted")
    {
        return Some("unavailable");
    }
    if msg.contains("copyright") && msg.contains("block") {
        return Some("unavailable");
    }
    if msg.contains("not available in your country") || msg.contains("blocked in your country") {
        return Some("geo_blocked");
    }
    if msg.contains("live stream") || msg.contains("live event") {
        return Some("live_stream");
    }
    None
}

fn looks_transient(message: &str) -> bool {
    let msg = message.to_lowercase();
    [
        "timed out",
        "timeout",
        "connection reset",
        "connection refused",
        "temporary failure",
        "network is unreachable",
        "http error 5",
        "read error",
    ]
    .iter()
    .any(|needle| msg.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_classification() {
        let age = MediaError::download_failed("ERROR: Sign in to confirm your age. This video may be inappropriate");
        assert_eq!(age.reason(), "age_restricted");
        assert_eq!(age.user_message(), "Video is age-restricted");

        let gone = MediaError::probe_failed("ERROR: [youtube] abc: Video unavailable");
        assert_eq!(gone.reason(), "unavailable");
        assert_eq!(gone.user_message(), "Video unavailable");

        let private = MediaError::download_failed("ERROR: Private video. Sign in if you've been granted access");
        assert_eq!(private.reason(), "private");

        assert_eq!(MediaError::download_failed("something odd").reason(), "download_failed");
        assert_eq!(
            MediaError::TooLarge { size_mb: 600.0, limit_mb: 500 }.reason(),
            "too_large"
        );
        assert_eq!(
            MediaError::ffmpeg_failed("ffmpeg conversion failed", None, Some(1)).reason(),
            "conversion_failed"
        );
        assert_eq!(MediaError::internal("boom").reason(), "internal");
    }

    #[test]
    fn test_transient_detection() {
        assert!(MediaError::download_failed("ERROR: Read timed out").is_transient());
        assert!(MediaError::download_failed("HTTP Error 503: Service Unavailable").is_transient());
        assert!(MediaError::RateLimited("HTTP Error 429".into()).is_transient());
        assert!(!MediaError::download_failed("Video unavailable").is_transient());
        assert!(!MediaError::TooLarge { size_mb: 1.0, limit_mb: 0 }.is_transient());
    }

    #[test]
    fn test_too_large_message() {
        let err = MediaError::TooLarge { size_mb: 612.5, limit_mb: 500 };
        assert_eq!(err.user_message(), "Estimated size (~612.5 MB) exceeds the 500 MB limit");
    }
}
