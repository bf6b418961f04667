//! Client for the conversion API.
//!
//! This crate provides:
//! - A typed HTTP client for submission, status and file endpoints
//! - The cancellable status poll loop and its renderer seam
//! - Form rules tying quality to the chosen format
//! - Persistence of the last submitted URL

pub mod api;
pub mod error;
pub mod form;
pub mod last_url;
pub mod marker;
pub mod poll;
pub mod render;
pub mod submitter;

pub use api::ApiClient;
pub use error::{ClientError, ClientResult};
pub use form::FormSelection;
pub use last_url::LastUrlStore;
pub use marker::PollMarker;
pub use poll::{poll_job, PollConfig, PollOutcome, DEFAULT_POLL_INTERVAL};
pub use render::{failure_message, Renderer, TerminalRenderer};
pub use submitter::{Submission, Submitter, POLL_PANIC_MESSAGE};
