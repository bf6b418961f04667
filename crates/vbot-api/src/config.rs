//! API configuration.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use vbot_models::DEFAULT_ALLOWED_DOMAINS;

/// Rejected configuration value.
#[derive(Debug, Error)]
#[error("Invalid configuration: {0}")]
pub struct ConfigError(pub String);

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Single origin allowed for CORS; no CORS headers when unset
    pub cors_origin: Option<String>,
    /// Source domains accepted for submission
    pub allowed_domains: Vec<String>,
    /// Root of the per-job output directories
    pub tmp_dir: PathBuf,
    /// Age after which temp files and in-memory records expire
    pub job_ttl: Duration,
    /// Submissions allowed per client IP within `rate_limit_window`
    pub rate_limit_submissions: u32,
    pub rate_limit_window: Duration,
    /// Serve `/metrics`
    pub metrics_enabled: bool,
    /// Max request body size
    pub max_body_size: usize,
    /// Environment (development/production); production redacts internal
    /// error details from responses
    pub environment: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origin: None,
            allowed_domains: DEFAULT_ALLOWED_DOMAINS.iter().map(|d| d.to_string()).collect(),
            tmp_dir: PathBuf::from("./temp"),
            job_ttl: Duration::from_secs(900),
            rate_limit_submissions: 10,
            rate_limit_window: Duration::from_secs(600),
            metrics_enabled: true,
            max_body_size: 64 * 1024,
            environment: "development".to_string(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError(format!("{} has an invalid value '{}'", key, raw))),
        _ => Ok(default),
    }
}

/// Split a comma-separated list, dropping blanks.
pub fn split_domains(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty())
        .collect()
}

impl ApiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            host: std::env::var("APP_HOST").unwrap_or(defaults.host),
            port: env_parse("APP_PORT", defaults.port)?,
            cors_origin: std::env::var("CORS_ORIGIN")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            allowed_domains: std::env::var("ALLOWED_DOMAINS")
                .ok()
                .map(|s| split_domains(&s))
                .filter(|d| !d.is_empty())
                .unwrap_or(defaults.allowed_domains),
            tmp_dir: std::env::var("TMP_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.tmp_dir),
            job_ttl: Duration::from_secs(env_parse("JOB_TTL_SEC", defaults.job_ttl.as_secs())?),
            rate_limit_submissions: env_parse(
                "RATE_LIMIT_SUBMISSIONS",
                defaults.rate_limit_submissions,
            )?,
            rate_limit_window: Duration::from_secs(env_parse(
                "RATE_LIMIT_WINDOW_SEC",
                defaults.rate_limit_window.as_secs(),
            )?),
            metrics_enabled: std::env::var("METRICS_ENABLED")
                .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
                .unwrap_or(defaults.metrics_enabled),
            max_body_size: defaults.max_body_size,
            environment: std::env::var("ENVIRONMENT").unwrap_or(defaults.environment),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.job_ttl.is_zero() {
            return Err(ConfigError("JOB_TTL_SEC must be greater than zero".into()));
        }
        if self.rate_limit_submissions == 0 || self.rate_limit_window.is_zero() {
            return Err(ConfigError(
                "RATE_LIMIT_SUBMISSIONS and RATE_LIMIT_WINDOW_SEC must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Check if running in production mode.
    pub fn is_production(&self) -> bool {
        self.environment.to_lowercase() == "production"
    }
}
