//! Redis-backed job store and queue.
//!
//! Records live as JSON under `job:{id}` with an expiry; pending ids are
//! pushed to a Redis list and popped with `BRPOP` by the worker process.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use vbot_models::{ConversionRequest, Job, JobId, JobPatch};

use crate::error::QueueResult;
use crate::queue::JobQueue;
use crate::store::{JobStore, UpdateOutcome};

/// Redis key of a job record.
pub fn job_key(job_id: &JobId) -> String {
    format!("job:{}", job_id)
}

/// Job store backed by Redis string keys.
pub struct RedisJobStore {
    client: redis::Client,
    ttl: Duration,
}

impl RedisJobStore {
    pub fn new(client: redis::Client, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    async fn write(&self, conn: &mut redis::aio::MultiplexedConnection, job: &Job) -> QueueResult<()> {
        let payload = serde_json::to_string(job)?;
        conn.set_ex::<_, _, ()>(job_key(&job.id), payload, self.ttl.as_secs().max(1))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn create(&self, request: ConversionRequest) -> QueueResult<JobId> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let job = Job::new(JobId::new(), request);
        self.write(&mut conn, &job).await?;
        debug!("Created job record {}", job.id);
        Ok(job.id)
    }

    async fn get(&self, job_id: &JobId) -> QueueResult<Option<Job>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(job_key(job_id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    // Read-merge-write is safe because only the owning executor writes a record.
    async fn update(&self, job_id: &JobId, patch: JobPatch) -> QueueResult<UpdateOutcome> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(job_key(job_id)).await?;
        let Some(raw) = raw else {
            return Ok(UpdateOutcome::Missing);
        };

        let mut job: Job = serde_json::from_str(&raw)?;
        if !job.apply(patch) {
            return Ok(UpdateOutcome::Frozen);
        }

        // SET ... XX only overwrites an existing key, so a delete racing
        // this write is not undone.
        let payload = serde_json::to_string(&job)?;
        let written: Option<String> = redis::cmd("SET")
            .arg(job_key(job_id))
            .arg(payload)
            .arg("EX")
            .arg(self.ttl.as_secs().max(1))
            .arg("XX")
            .query_async(&mut conn)
            .await?;

        Ok(if written.is_some() {
            UpdateOutcome::Applied
        } else {
            UpdateOutcome::Missing
        })
    }

    async fn delete(&self, job_id: &JobId) -> QueueResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let removed: u64 = conn.del(job_key(job_id)).await?;
        Ok(removed > 0)
    }
}

/// Work queue backed by a Redis list.
pub struct RedisJobQueue {
    client: redis::Client,
    name: String,
}

impl RedisJobQueue {
    pub fn new(client: redis::Client, name: impl Into<String>) -> Self {
        Self {
            client,
            name: name.into(),
        }
    }

    /// Number of pending job ids.
    pub async fn len(&self) -> QueueResult<u64> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn.llen(&self.name).await?)
    }
}

#[async_trait]
impl JobQueue for RedisJobQueue {
    async fn push(&self, job_id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.lpush::<_, _, ()>(&self.name, job_id.as_str()).await?;
        Ok(())
    }

    async fn pop(&self, timeout: Duration) -> QueueResult<Option<JobId>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let popped: Option<(String, String)> = conn
            .brpop(&self.name, timeout.as_secs_f64().max(0.1))
            .await?;
        Ok(popped.map(|(_, id)| JobId::from(id)))
    }
}
