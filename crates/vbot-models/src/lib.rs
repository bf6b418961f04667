//! Shared data models for the video web bot.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, their lifecycle state and partial updates
//! - Output formats and quality presets
//! - Extracted media metadata
//! - The wire status payload and request/response bodies
//! - Source URL validation

pub mod api;
pub mod error;
pub mod format;
pub mod job;
pub mod meta;
pub mod status;
pub mod utils;

// Re-export common types
pub use api::{DeleteFileResponse, ErrorBody, SubmitQuery, SubmitResponse};
pub use error::{ModelError, ModelResult};
pub use format::{OutputFormat, Quality, DEFAULT_QUALITY};
pub use job::{ConversionRequest, Job, JobId, JobPatch, JobState};
pub use meta::MediaMeta;
pub use status::StatusPayload;
pub use utils::{validate_url, DEFAULT_ALLOWED_DOMAINS};
