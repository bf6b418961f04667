//! Backend selection.

use std::str::FromStr;
use std::time::Duration;

use crate::error::QueueError;

/// Which job backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Store and queue live inside the API process
    #[default]
    Memory,
    /// Store and queue live in Redis; a separate worker consumes jobs
    Redis,
}

impl FromStr for BackendKind {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "memory" => Ok(BackendKind::Memory),
            "redis" | "rq" => Ok(BackendKind::Redis),
            other => Err(QueueError::Config(format!(
                "QUEUE_BACKEND must be 'memory' or 'redis', got '{}'",
                other
            ))),
        }
    }
}

/// Backend configuration.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub kind: BackendKind,
    /// Redis URL
    pub redis_url: String,
    /// Redis list holding pending job ids
    pub queue_name: String,
    /// Expiry of job records in Redis
    pub result_ttl: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: BackendKind::Memory,
            redis_url: "redis://localhost:6379/0".to_string(),
            queue_name: "downloads".to_string(),
            result_ttl: Duration::from_secs(3600),
        }
    }
}

impl BackendConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, QueueError> {
        let kind = std::env::var("QUEUE_BACKEND")
            .unwrap_or_default()
            .parse()?;
        let result_ttl_secs = parse_ttl(std::env::var("RQ_RESULT_TTL_SEC").ok())?;

        Ok(Self {
            kind,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379/0".to_string()),
            queue_name: std::env::var("RQ_QUEUE").unwrap_or_else(|_| "downloads".to_string()),
            result_ttl: Duration::from_secs(result_ttl_secs),
        })
    }
}

/// Parse `RQ_RESULT_TTL_SEC`; unset or blank keeps the default.
fn parse_ttl(raw: Option<String>) -> Result<u64, QueueError> {
    let secs = match raw {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            QueueError::Config(format!("RQ_RESULT_TTL_SEC has an invalid value '{}'", raw))
        })?,
        _ => 3600,
    };
    if secs == 0 {
        return Err(QueueError::Config(
            "RQ_RESULT_TTL_SEC must be greater than zero".to_string(),
        ));
    }
    Ok(secs)
}
