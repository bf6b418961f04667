//! Work queue feeding job ids to the executor.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use vbot_models::JobId;

use crate::error::{QueueError, QueueResult};

/// FIFO of job ids waiting for a worker.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue a job id.
    async fn push(&self, job_id: &JobId) -> QueueResult<()>;

    /// Wait up to `timeout` for the next job id.
    async fn pop(&self, timeout: Duration) -> QueueResult<Option<JobId>>;
}

/// Unbounded in-process queue.
pub struct MemoryJobQueue {
    tx: mpsc::UnboundedSender<JobId>,
    rx: Mutex<mpsc::UnboundedReceiver<JobId>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }
}

impl Default for MemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn push(&self, job_id: &JobId) -> QueueResult<()> {
        self.tx
            .send(job_id.clone())
            .map_err(|_| QueueError::enqueue_failed("queue receiver dropped"))
    }

    async fn pop(&self, timeout: Duration) -> QueueResult<Option<JobId>> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(job_id) => Ok(job_id),
            Err(_) => Ok(None),
        }
    }
}
