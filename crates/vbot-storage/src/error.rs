//! Storage error types.

use std::path::PathBuf;
use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Artifact not found for job {0}")]
    NotFound(String),

    #[error("Path {0} is outside the job directory")]
    OutsideJobDir(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn not_found(job_id: impl Into<String>) -> Self {
        Self::NotFound(job_id.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}
