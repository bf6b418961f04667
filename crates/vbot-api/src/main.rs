//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vbot_api::{create_router, metrics, ApiConfig, AppState};
use vbot_media::{check_tools, ConverterConfig, YtDlpConverter};
use vbot_queue::{Backend, BackendConfig};
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
        .unwrap_or_else(|_| EnvFilter::new("vbot=info,vbot_api=info,vbot_worker=info,vbot_media=info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vbot-api");

    let config = ApiConfig::from_env().context("invalid API configuration")?;
    info!("API config: host={}, port={}", config.host, config.port);

    tokio::fs::create_dir_all(&config.tmp_dir)
        .await
        .with_context(|| format!("failed to create {}", config.tmp_dir.display()))?;

    let backend_config = BackendConfig::from_env().context("invalid backend configuration")?;
    let backend = Backend::connect(&backend_config).context("failed to connect queue backend")?;
    info!("Queue backend: {:?}", backend_config.kind);

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install metrics recorder")?)
    } else {
        None
    };

    let (cleanup_tx, cleanup_rx) = watch::channel(false);
    let mut background = Vec::new();
    let mut executor = None;

    // The memory backend runs conversions and cleanup in-process; with Redis
    // the worker binary owns both.
    if let Some(memory_store) = backend.memory_store.clone() {
        if let Err(e) = check_tools() {
            warn!("External tool check failed: {}", e);
        }

        let worker_config = WorkerConfig::from_env().context("invalid worker configuration")?;
        let converter = Arc::new(YtDlpConverter::new(ConverterConfig {
            max_file_size_mb: worker_config.max_file_size_mb,
            ..Default::default()
        }));
        let job_executor = Arc::new(JobExecutor::new(
            worker_config,
            Arc::clone(&backend.store),
            Arc::clone(&backend.queue),
            converter,
        ));

        let runner = Arc::clone(&job_executor);
        background.push(tokio::spawn(async move {
            if let Err(e) = runner.run().await {
                warn!("Executor stopped with error: {}", e);
            }
        }));

        let ttl = config.job_ttl;
        background.push(tokio::spawn(run_periodic_cleanup(
            CleanupConfig::new(config.tmp_dir.clone(), ttl),
            cleanup_rx,
            move || {
                let store = Arc::clone(&memory_store);
                async move {
                    let purged = store.purge_expired(ttl).await;
                    if purged > 0 {
                        info!("Purged {} expired job records", purged);
                    }
                }
            },
        )));

        executor = Some(job_executor);
    }

    let state = AppState::new(config.clone(), &backend);
    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(executor) = executor {
        executor.shutdown();
    }
    let _ = cleanup_tx.send(true);
    for task in background {
        task.await.ok();
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
