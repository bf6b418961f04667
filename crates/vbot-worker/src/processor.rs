//! Per-job pipeline.
//!
//! Runs the converter for one job and is the only writer of that job's
//! record while it runs. Converter events are relayed into the store in
//! order, and the terminal write happens only after the relay has drained.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, Instrument};

use vbot_media::{ConversionEvent, Converter};
use vbot_models::{Job, JobId, JobPatch};
use vbot_queue::{JobStore, UpdateOutcome};
use vbot_storage::ArtifactStore;

use crate::error::WorkerResult;
use crate::logging::JobLogger;

/// Error text recorded when a job panics or hits an unexpected failure.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal error while processing the job";

/// Message recorded with a finished job.
pub const DONE_MESSAGE: &str = "File is ready to download";

/// Shared handles used by every job.
pub struct ProcessingContext {
    pub store: Arc<dyn JobStore>,
    pub artifacts: ArtifactStore,
    pub converter: Arc<dyn Converter>,
}

impl ProcessingContext {
    pub fn new(
        store: Arc<dyn JobStore>,
        artifacts: ArtifactStore,
        converter: Arc<dyn Converter>,
    ) -> Self {
        Self {
            store,
            artifacts,
            converter,
        }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Done { filename: String },
    Failed { reason: String },
    /// The record disappeared while the job ran; nothing was written back.
    Deleted,
}

/// Run one job to a terminal state.
pub async fn process_job(ctx: &ProcessingContext, job: Job) -> WorkerResult<JobOutcome> {
    let logger = JobLogger::new(&job.id, &job.request);
    let span = logger.span();
    run(ctx, job, logger).instrument(span).await
}

async fn run(ctx: &ProcessingContext, job: Job, logger: JobLogger) -> WorkerResult<JobOutcome> {
    let job_id = job.id.clone();

    if job.request.url.trim().is_empty() {
        logger.failed("missing_url", "Job payload has no URL");
        return fail(ctx, &job_id, "Missing URL in job payload", "missing_url").await;
    }

    logger.started(&job.request);
    let output_dir = ctx.artifacts.prepare_job_dir(&job_id).await?;

    let (tx, rx) = mpsc::unbounded_channel();
    let relay = tokio::spawn(relay_events(
        Arc::clone(&ctx.store),
        job_id.clone(),
        rx,
        logger.clone(),
    ));

    let result = ctx.converter.convert(&job.request, &output_dir, tx).await;
    let still_exists = relay.await.unwrap_or(true);

    match result {
        Ok(file) => {
            if !still_exists || ctx.store.get(&job_id).await?.is_none() {
                logger.warning("Job was deleted while running, discarding output");
                ctx.artifacts.discard(&job_id).await;
                return Ok(JobOutcome::Deleted);
            }

            let artifact = match ctx.artifacts.register(&job_id, &file.path, &file.mimetype).await {
                Ok(artifact) => artifact,
                Err(e) => {
                    logger.failed("internal", &format!("Failed to register artifact: {}", e));
                    ctx.artifacts.discard(&job_id).await;
                    return fail(ctx, &job_id, INTERNAL_ERROR_MESSAGE, "internal").await;
                }
            };

            let patch = JobPatch::done(artifact.filename.clone(), DONE_MESSAGE);
            match ctx.store.update(&job_id, patch).await? {
                UpdateOutcome::Missing => {
                    logger.warning("Job was deleted before completion was recorded");
                    ctx.artifacts.discard(&job_id).await;
                    Ok(JobOutcome::Deleted)
                }
                _ => {
                    logger.completed(&artifact.filename);
                    metrics::counter!("vbot_jobs_completed_total").increment(1);
                    Ok(JobOutcome::Done {
                        filename: artifact.filename,
                    })
                }
            }
        }
        Err(e) => {
            logger.failed(e.reason(), &e.to_string());
            ctx.artifacts.discard(&job_id).await;
            fail(ctx, &job_id, &e.user_message(), e.reason()).await
        }
    }
}

/// Record a failure and report the outcome.
pub(crate) async fn fail(
    ctx: &ProcessingContext,
    job_id: &JobId,
    error: &str,
    reason: &str,
) -> WorkerResult<JobOutcome> {
    let outcome = ctx
        .store
        .update(job_id, JobPatch::failed(error, Some(reason.to_string())))
        .await?;
    if outcome == UpdateOutcome::Missing {
        return Ok(JobOutcome::Deleted);
    }
    metrics::counter!("vbot_jobs_failed_total", "reason" => reason.to_string()).increment(1);
    Ok(JobOutcome::Failed {
        reason: reason.to_string(),
    })
}

/// Apply converter events to the job record in arrival order.
///
/// Returns `false` once the record is found missing; later events are
/// drained and dropped.
async fn relay_events(
    store: Arc<dyn JobStore>,
    job_id: JobId,
    mut rx: mpsc::UnboundedReceiver<ConversionEvent>,
    logger: JobLogger,
) -> bool {
    let mut exists = true;

    while let Some(event) = rx.recv().await {
        if !exists {
            continue;
        }
        let patch = match event {
            ConversionEvent::Stage { message, progress } => {
                logger.stage(&message, progress);
                JobPatch::stage(message, progress)
            }
            ConversionEvent::Progress(progress) => JobPatch::new().progress(progress),
            ConversionEvent::Meta(meta) => JobPatch::new().meta(meta),
        };

        match store.update(&job_id, patch).await {
            Ok(UpdateOutcome::Missing) => {
                logger.warning("Job record is gone, dropping further updates");
                exists = false;
            }
            Ok(_) => {}
            Err(e) => debug!("Progress update for {} failed: {}", job_id, e),
        }
    }

    exists
}
