//! Axum HTTP API server.
//!
//! This crate provides:
//! - Job submission, status and artifact download endpoints
//! - Per-IP submission rate limiting and security headers
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, ConfigError};
pub use error::{redact_internal_errors, ApiError, ApiResult, REDACTED_DETAIL};
pub use routes::create_router;
pub use state::AppState;
