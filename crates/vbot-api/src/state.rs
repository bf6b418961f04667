//! Application state.

use std::sync::Arc;

use vbot_queue::{Backend, JobQueue, JobStore};
use vbot_storage::ArtifactStore;

use crate::config::ApiConfig;
use crate::middleware::RateLimiterCache;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<dyn JobStore>,
    pub queue: Arc<dyn JobQueue>,
    pub artifacts: ArtifactStore,
    pub rate_limiter: Arc<RateLimiterCache>,
}

impl AppState {
    pub fn new(config: ApiConfig, backend: &Backend) -> Self {
        let rate_limiter = Arc::new(RateLimiterCache::new(
            config.rate_limit_submissions,
            config.rate_limit_window,
        ));
        Self {
            artifacts: ArtifactStore::new(config.tmp_dir.clone()),
            store: Arc::clone(&backend.store),
            queue: Arc::clone(&backend.queue),
            rate_limiter,
            config,
        }
    }
}
