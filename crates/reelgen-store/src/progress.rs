//! Progress events via Redis Pub/Sub.
//!
//! Every committed job transition can be mirrored onto a per-job channel so
//! a push layer (out of scope here) can stream progress without polling the
//! job record. Publishing is best effort: a dropped event costs nothing,
//! because GET /api/jobs always reads the committed record.

use async_trait::async_trait;
use chrono::Utc;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::debug;

use reelgen_models::{Job, JobId, JobPhase};

use crate::error::StoreResult;

/// Snapshot of a job transition, published after the commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub owner_id: String,
    pub phase: JobPhase,
    /// Progress percentage (0-100)
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Event timestamp (milliseconds since epoch)
    pub timestamp_ms: i64,
}

impl ProgressEvent {
    /// Snapshot the publishable fields of a job.
    pub fn for_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            owner_id: job.owner_id.clone(),
            phase: job.phase,
            progress: job.progress,
            error_message: job.error_message.clone(),
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// Where committed transitions are announced.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn publish(&self, event: &ProgressEvent) -> StoreResult<()>;
}

/// Sink that drops every event; used in tests and single-process setups
/// where polling the job record is enough.
pub struct NoopProgress;

#[async_trait]
impl ProgressSink for NoopProgress {
    async fn publish(&self, _event: &ProgressEvent) -> StoreResult<()> {
        Ok(())
    }
}

/// Pub/Sub sink over Redis.
pub struct RedisProgressChannel {
    client: redis::Client,
    key_prefix: String,
}

impl RedisProgressChannel {
    pub fn new(redis_url: &str, key_prefix: impl Into<String>) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            key_prefix: key_prefix.into(),
        })
    }

    /// Channel a job's events are published on.
    pub fn channel_name(&self, owner_id: &str, job_id: &JobId) -> String {
        format!("{}:progress:{}:{}", self.key_prefix, owner_id, job_id)
    }
}

#[async_trait]
impl ProgressSink for RedisProgressChannel {
    async fn publish(&self, event: &ProgressEvent) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = self.channel_name(&event.owner_id, &event.job_id);
        let payload = serde_json::to_string(event)?;

        debug!(%channel, progress = event.progress, "publishing progress event");
        conn.publish::<_, _, ()>(channel, payload).await?;
        Ok(())
    }
}
