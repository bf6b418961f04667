//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{WorkerError, WorkerResult};

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// Root of the per-job output directories
    pub tmp_dir: PathBuf,
    /// Size limit for a single download
    pub max_file_size_mb: u64,
    /// Age after which temp files and in-memory records expire
    pub job_ttl: Duration,
    /// How long one queue pop blocks
    pub poll_timeout: Duration,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            tmp_dir: PathBuf::from("./temp"),
            max_file_size_mb: 500,
            job_ttl: Duration::from_secs(900),
            poll_timeout: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

/// Parse `raw` as the value of `key`; unset or blank keeps `default`.
fn parse_or<T: std::str::FromStr>(key: &str, raw: Option<String>, default: T) -> WorkerResult<T> {
    match raw {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            WorkerError::config_error(format!("{} has an invalid value '{}'", key, raw))
        }),
        _ => Ok(default),
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> WorkerResult<T> {
    parse_or(key, std::env::var(key).ok(), default)
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> WorkerResult<Self> {
        let defaults = Self::default();
        let config = Self {
            max_concurrent_jobs: env_or("WORKER_MAX_JOBS", defaults.max_concurrent_jobs)?,
            tmp_dir: std::env::var("TMP_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.tmp_dir),
            max_file_size_mb: env_or("MAX_FILE_SIZE_MB", defaults.max_file_size_mb)?,
            job_ttl: Duration::from_secs(env_or("JOB_TTL_SEC", defaults.job_ttl.as_secs())?),
            poll_timeout: defaults.poll_timeout,
            shutdown_timeout: Duration::from_secs(env_or(
                "WORKER_SHUTDOWN_TIMEOUT",
                defaults.shutdown_timeout.as_secs(),
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WorkerResult<()> {
        if self.max_concurrent_jobs == 0 {
            return Err(WorkerError::config_error("WORKER_MAX_JOBS must be greater than 0"));
        }
        if self.max_file_size_mb == 0 {
            return Err(WorkerError::config_error("MAX_FILE_SIZE_MB must be greater than 0"));
        }
        if self.job_ttl.is_zero() {
            return Err(WorkerError::config_error("JOB_TTL_SEC must be greater than 0"));
        }
        Ok(())
    }
}
