//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

use vbot_media::Converter;
use vbot_models::{JobId, JobPatch};
use vbot_queue::{JobQueue, JobStore};
use vbot_storage::ArtifactStore;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::processor::{process_job, JobOutcome, ProcessingContext, INTERNAL_ERROR_MESSAGE};

/// Job executor that processes jobs from the queue.
///
/// Each job runs in its own task, bounded by `max_concurrent_jobs`.
pub struct JobExecutor {
    config: WorkerConfig,
    ctx: Arc<ProcessingContext>,
    queue: Arc<dyn JobQueue>,
    job_semaphore: Arc<Semaphore>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn JobStore>,
        queue: Arc<dyn JobQueue>,
        converter: Arc<dyn Converter>,
    ) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = watch::channel(false);
        let artifacts = ArtifactStore::new(config.tmp_dir.clone());

        Self {
            ctx: Arc::new(ProcessingContext::new(store, artifacts, converter)),
            config,
            queue,
            job_semaphore,
            shutdown,
        }
    }

    /// Start the executor. Returns after `shutdown` is signalled and
    /// in-flight jobs have finished or the shutdown timeout has passed.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor with {} max concurrent jobs",
            self.config.max_concurrent_jobs
        );
        tokio::fs::create_dir_all(&self.config.tmp_dir).await?;

        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_next() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        }

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!("Shutdown timeout elapsed with jobs still running");
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Wait for a free slot, pop one job id and spawn it.
    async fn consume_next(&self) -> WorkerResult<()> {
        let permit = Arc::clone(&self.job_semaphore)
            .acquire_owned()
            .await
            .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;

        let Some(job_id) = self.queue.pop(self.config.poll_timeout).await? else {
            return Ok(());
        };

        debug!("Consumed job {} from queue", job_id);
        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(Self::execute_job(ctx, job_id, permit));
        Ok(())
    }

    /// Execute a single job, isolating panics from the executor.
    async fn execute_job(ctx: Arc<ProcessingContext>, job_id: JobId, permit: OwnedSemaphorePermit) {
        let _permit = permit;

        let job = match ctx.store.get(&job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!("Job {} no longer exists, skipping", job_id);
                return;
            }
            Err(e) => {
                error!("Failed to load job {}: {}", job_id, e);
                return;
            }
        };
        if job.is_terminal() {
            debug!("Job {} is already {}, skipping", job_id, job.state);
            return;
        }

        info!("Executing job {}", job_id);
        let task_ctx = Arc::clone(&ctx);
        let handle = tokio::spawn(async move { process_job(&task_ctx, job).await });

        match handle.await {
            Ok(Ok(JobOutcome::Done { filename })) => {
                info!("Job {} completed successfully: {}", job_id, filename);
            }
            Ok(Ok(JobOutcome::Failed { reason })) => {
                info!("Job {} failed ({})", job_id, reason);
            }
            Ok(Ok(JobOutcome::Deleted)) => {
                warn!("Job {} was deleted while running", job_id);
            }
            Ok(Err(e)) => {
                error!("Job {} failed unexpectedly: {}", job_id, e);
                Self::record_internal_error(&ctx, &job_id).await;
            }
            Err(e) if e.is_panic() => {
                error!("Job {} panicked", job_id);
                Self::record_internal_error(&ctx, &job_id).await;
            }
            Err(e) => {
                error!("Job {} task was cancelled: {}", job_id, e);
                Self::record_internal_error(&ctx, &job_id).await;
            }
        }
    }

    async fn record_internal_error(ctx: &ProcessingContext, job_id: &JobId) {
        ctx.artifacts.discard(job_id).await;
        let patch = JobPatch::failed(INTERNAL_ERROR_MESSAGE, Some("internal".to_string()));
        match ctx.store.update(job_id, patch).await {
            Ok(_) => {
                metrics::counter!("vbot_jobs_failed_total", "reason" => "internal").increment(1);
            }
            Err(e) => error!("Failed to record internal error for job {}: {}", job_id, e),
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            let available = self.job_semaphore.available_permits();
            if available == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Artifact registry used by this executor.
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.ctx.artifacts
    }
}
