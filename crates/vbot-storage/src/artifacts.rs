//! Artifact registry backed by per-job sidecar files.
//!
//! `register` writes `{root}/{job_id}/artifact.json` next to the output, so
//! any process sharing the temp directory sees the same registry.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tracing::{debug, info};

use vbot_models::JobId;

use crate::error::{StorageError, StorageResult};

const SIDECAR: &str = "artifact.json";

/// A finished output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub job_id: JobId,
    pub path: PathBuf,
    pub filename: String,
    pub mimetype: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// Registry of job artifacts under a root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory owned by `job_id`. `None` for ids that are not a single
    /// safe path component.
    pub fn job_dir(&self, job_id: &JobId) -> Option<PathBuf> {
        let id = job_id.as_str();
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        safe.then(|| self.root.join(id))
    }

    /// Create (if needed) and return the job's directory.
    pub async fn prepare_job_dir(&self, job_id: &JobId) -> StorageResult<PathBuf> {
        let dir = self
            .job_dir(job_id)
            .ok_or_else(|| StorageError::not_found(job_id.as_str()))?;
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    fn sidecar(&self, job_id: &JobId) -> StorageResult<PathBuf> {
        self.job_dir(job_id)
            .map(|dir| dir.join(SIDECAR))
            .ok_or_else(|| StorageError::not_found(job_id.as_str()))
    }

    /// Record `path` as the job's artifact.
    pub async fn register(
        &self,
        job_id: &JobId,
        path: &Path,
        mimetype: &str,
    ) -> StorageResult<Artifact> {
        let dir = self.prepare_job_dir(job_id).await?;
        let dir = tokio::fs::canonicalize(&dir).await?;
        let file = tokio::fs::canonicalize(path)
            .await
            .map_err(|_| StorageError::OutsideJobDir(path.to_path_buf()))?;
        if file.parent() != Some(dir.as_path()) {
            return Err(StorageError::OutsideJobDir(path.to_path_buf()));
        }

        let meta = tokio::fs::metadata(&file).await?;
        let filename = file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let artifact = Artifact {
            job_id: job_id.clone(),
            path: file,
            filename,
            mimetype: mimetype.to_string(),
            size_bytes: meta.len(),
            created_at: Utc::now(),
        };

        let sidecar = dir.join(SIDECAR);
        let tmp = dir.join(format!("{}.tmp", SIDECAR));
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&artifact)?).await?;
        tokio::fs::rename(&tmp, &sidecar).await?;

        info!(
            "Registered artifact {} for job {} ({} bytes)",
            artifact.filename, job_id, artifact.size_bytes
        );
        Ok(artifact)
    }

    /// Look up the job's artifact.
    pub async fn get(&self, job_id: &JobId) -> StorageResult<Artifact> {
        let sidecar = self.sidecar(job_id)?;
        let raw = match tokio::fs::read(&sidecar).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::not_found(job_id.as_str()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_slice(&raw)?)
    }

    /// Look up the artifact and open it for reading.
    pub async fn fetch(&self, job_id: &JobId) -> StorageResult<(Artifact, File)> {
        let artifact = self.get(job_id).await?;
        match File::open(&artifact.path).await {
            Ok(file) => Ok((artifact, file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(job_id.as_str()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete the artifact and the job directory. The job record is untouched.
    pub async fn delete(&self, job_id: &JobId) -> StorageResult<()> {
        self.get(job_id).await?;
        let dir = self
            .job_dir(job_id)
            .ok_or_else(|| StorageError::not_found(job_id.as_str()))?;
        tokio::fs::remove_dir_all(&dir).await?;
        info!("Deleted artifact for job {}", job_id);
        Ok(())
    }

    /// Remove whatever a job left in its directory, registered or not.
    pub async fn discard(&self, job_id: &JobId) {
        let Some(dir) = self.job_dir(job_id) else {
            return;
        };
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => debug!("Removed job directory {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => debug!("Failed to remove {}: {}", dir.display(), e),
        }
    }
}
