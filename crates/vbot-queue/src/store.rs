//! Job store: one record per job id.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use vbot_models::{ConversionRequest, Job, JobId, JobPatch};

use crate::error::QueueResult;

/// Result of merging a patch into a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Patch merged
    Applied,
    /// Record is terminal; nothing changed
    Frozen,
    /// No record for this id (never created or already deleted); nothing written
    Missing,
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied)
    }
}

/// Source of truth for job state.
///
/// Only the executor that owns a job writes to its record; readers get a
/// copy of whatever is stored at call time.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Allocate a fresh id and store a queued record.
    async fn create(&self, request: ConversionRequest) -> QueueResult<JobId>;

    /// Fetch the current record.
    async fn get(&self, job_id: &JobId) -> QueueResult<Option<Job>>;

    /// Merge a partial update. A no-op for terminal or missing records.
    async fn update(&self, job_id: &JobId, patch: JobPatch) -> QueueResult<UpdateOutcome>;

    /// Remove the record. Returns `false` if it was already gone.
    async fn delete(&self, job_id: &JobId) -> QueueResult<bool>;
}

/// In-memory store for single-process deployments and tests.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    /// Drop records not updated within `ttl`. Returns how many were removed.
    pub async fn purge_expired(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.updated_at >= cutoff);
        let removed = before - jobs.len();
        if removed > 0 {
            debug!("Purged {} expired job records", removed);
        }
        removed
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, request: ConversionRequest) -> QueueResult<JobId> {
        let mut jobs = self.jobs.write().await;
        let mut job_id = JobId::new();
        while jobs.contains_key(&job_id) {
            job_id = JobId::new();
        }
        jobs.insert(job_id.clone(), Job::new(job_id.clone(), request));
        Ok(job_id)
    }

    async fn get(&self, job_id: &JobId) -> QueueResult<Option<Job>> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn update(&self, job_id: &JobId, patch: JobPatch) -> QueueResult<UpdateOutcome> {
        let mut jobs = self.jobs.write().await;
        let outcome = match jobs.get_mut(job_id) {
            None => UpdateOutcome::Missing,
            Some(job) => {
                if job.apply(patch) {
                    UpdateOutcome::Applied
                } else {
                    UpdateOutcome::Frozen
                }
            }
        };
        Ok(outcome)
    }

    async fn delete(&self, job_id: &JobId) -> QueueResult<bool> {
        Ok(self.jobs.write().await.remove(job_id).is_some())
    }
}
