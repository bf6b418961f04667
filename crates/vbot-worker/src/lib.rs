//! Conversion job executor.
//!
//! This crate provides:
//! - The executor loop pulling job ids off the work queue
//! - The per-job pipeline relaying converter events into the job store
//! - Panic isolation so one job cannot take down the others
//! - Graceful shutdown

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod processor;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use processor::{process_job, JobOutcome, ProcessingContext, INTERNAL_ERROR_MESSAGE};
