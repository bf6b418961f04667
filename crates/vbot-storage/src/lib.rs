//! Local storage for finished conversions.
//!
//! Each job owns `{root}/{job_id}/`. The converter writes its output there,
//! the worker registers it with [`ArtifactStore`], and the API streams it
//! back. [`cleanup`] sweeps whatever outlives the TTL.

pub mod artifacts;
pub mod cleanup;
pub mod error;

pub use artifacts::{Artifact, ArtifactStore};
pub use cleanup::{cleanup_expired_files, delete_path, run_periodic_cleanup, CleanupConfig, CleanupStats};
pub use error::{StorageError, StorageResult};
