//! Standalone conversion worker for the Redis backend.

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vbot_media::{check_tools, ConverterConfig, YtDlpConverter};
use vbot_queue::{Backend, BackendConfig, BackendKind};
use vbot_storage::{run_periodic_cleanup, CleanupConfig};
use vbot_worker::{JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vbot=info,vbot_worker=info,vbot_media=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(true).with_target(true))
            .with(env_filter)
            .init();
    }

    info!("Starting vbot-worker");

    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    info!("Worker config: {:?}", config);

    let backend_config = BackendConfig::from_env().context("invalid backend configuration")?;
    if backend_config.kind != BackendKind::Redis {
        bail!("vbot-worker consumes the Redis queue; set QUEUE_BACKEND=redis or run the API with the memory backend");
    }
    let backend = Backend::connect(&backend_config).context("failed to connect to Redis")?;

    if let Err(e) = check_tools() {
        warn!("External tool check failed: {}", e);
    }

    let converter = Arc::new(YtDlpConverter::new(ConverterConfig {
        max_file_size_mb: config.max_file_size_mb,
        ..Default::default()
    }));
    let executor = Arc::new(JobExecutor::new(
        config.clone(),
        backend.store.clone(),
        backend.queue.clone(),
        converter,
    ));

    let (cleanup_tx, cleanup_rx) = watch::channel(false);
    let cleanup = tokio::spawn(run_periodic_cleanup(
        CleanupConfig::new(config.tmp_dir.clone(), config.job_ttl),
        cleanup_rx,
        || async {},
    ));

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_executor.shutdown();
    });

    executor.run().await.context("executor error")?;

    let _ = cleanup_tx.send(true);
    cleanup.await.ok();

    info!("Worker shutdown complete");
    Ok(())
}
