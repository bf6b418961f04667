//! Job store and work queue.
//!
//! This crate provides:
//! - The job store, single source of truth for job state
//! - The work queue feeding job ids to the executor
//! - In-memory backends for single-process deployments
//! - Redis backends for a separate worker process

pub mod config;
pub mod error;
pub mod queue;
pub mod redis_backend;
pub mod store;

use std::sync::Arc;

pub use config::{BackendConfig, BackendKind};
pub use error::{QueueError, QueueResult};
pub use queue::{JobQueue, MemoryJobQueue};
pub use redis_backend::{RedisJobQueue, RedisJobStore};
pub use store::{JobStore, MemoryJobStore, UpdateOutcome};

/// Store and queue handles for the configured backend.
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn JobStore>,
    pub queue: Arc<dyn JobQueue>,
    /// Set only for the memory backend, which needs periodic purging.
    pub memory_store: Option<Arc<MemoryJobStore>>,
}

impl Backend {
    /// Build the store/queue pair selected by `config.kind`.
    pub fn connect(config: &BackendConfig) -> QueueResult<Self> {
        match config.kind {
            BackendKind::Memory => {
                let store = Arc::new(MemoryJobStore::new());
                Ok(Self {
                    store: store.clone(),
                    queue: Arc::new(MemoryJobQueue::new()),
                    memory_store: Some(store),
                })
            }
            BackendKind::Redis => {
                let client = redis::Client::open(config.redis_url.as_str())?;
                Ok(Self {
                    store: Arc::new(RedisJobStore::new(client.clone(), config.result_ttl)),
                    queue: Arc::new(RedisJobQueue::new(client, config.queue_name.clone())),
                    memory_store: None,
                })
            }
        }
    }
}
