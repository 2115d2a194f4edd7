//! Redis-backed job and project stores.
//!
//! Records are single JSON values, so each commit is one atomic key write.
//! Write leases are `SET NX PX` keys holding an opaque holder token; lease
//! renewal, release and the guarded commit run as scripts so the holder
//! check and the write cannot interleave with another worker.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use tracing::debug;
use uuid::Uuid;

use reelgen_models::{Job, JobId, Project, ProjectId};

use crate::error::{StoreError, StoreResult};
use crate::job_store::{JobKey, JobStore, WriteLease};
use crate::project_store::ProjectStore;

/// Store configuration.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    /// Redis URL
    pub redis_url: String,
    /// Prefix for every key this deployment writes.
    pub key_prefix: String,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://localhost:6379".to_string(),
            key_prefix: "reelgen".to_string(),
        }
    }
}

impl RedisStoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            key_prefix: std::env::var("REELGEN_KEY_PREFIX")
                .unwrap_or_else(|_| "reelgen".to_string()),
        }
    }
}

/// Redis-backed implementation of both stores.
pub struct RedisStore {
    client: redis::Client,
    config: RedisStoreConfig,
}

const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

const RENEW_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return 0
"#;

// KEYS: lease, job, active set. ARGV: holder, record, terminal flag, member.
const COMMIT_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    redis.call('SET', KEYS[2], ARGV[2])
    if ARGV[3] == '1' then
        redis.call('SREM', KEYS[3], ARGV[4])
    else
        redis.call('SADD', KEYS[3], ARGV[4])
    end
    return 1
end
return 0
"#;

impl RedisStore {
    pub fn new(config: RedisStoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> StoreResult<Self> {
        Self::new(RedisStoreConfig::from_env())
    }

    async fn conn(&self) -> StoreResult<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    fn job_key(&self, owner_id: &str, job_id: &JobId) -> String {
        format!("{}:job:{}:{}", self.config.key_prefix, owner_id, job_id)
    }

    fn project_key(&self, owner_id: &str, project_id: &ProjectId) -> String {
        format!(
            "{}:project:{}:{}",
            self.config.key_prefix, owner_id, project_id
        )
    }

    fn lease_key(&self, key: &JobKey) -> String {
        format!("{}:lease:{}", self.config.key_prefix, key)
    }

    fn active_key(&self) -> String {
        format!("{}:jobs:active", self.config.key_prefix)
    }

    fn cancel_key(&self, key: &JobKey) -> String {
        format!("{}:cancel:{}", self.config.key_prefix, key)
    }
}

#[async_trait]
impl JobStore for RedisStore {
    async fn create(&self, job: &Job) -> StoreResult<()> {
        let key = self.job_key(&job.owner_id, &job.id);
        let payload = serde_json::to_string(job)?;
        let mut conn = self.conn().await?;

        let created: bool = conn.set_nx(&key, payload).await?;
        if !created {
            return Err(StoreError::already_exists(key));
        }
        let member = JobKey::for_job(job).to_string();
        conn.sadd::<_, _, ()>(self.active_key(), member).await?;

        debug!(job_id = %job.id, "created job record");
        Ok(())
    }

    async fn get(&self, owner_id: &str, job_id: &JobId) -> StoreResult<Option<Job>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(self.job_key(owner_id, job_id)).await?;
        match raw {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn acquire_lease(&self, key: &JobKey, ttl: Duration) -> StoreResult<Option<WriteLease>> {
        let holder = Uuid::new_v4().to_string();
        let mut conn = self.conn().await?;

        let acquired: Option<String> = redis::cmd("SET")
            .arg(self.lease_key(key))
            .arg(&holder)
            .arg("NX")
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .query_async(&mut conn)
            .await?;

        Ok(acquired.map(|_| WriteLease {
            key: key.clone(),
            holder,
        }))
    }

    async fn renew_lease(&self, lease: &WriteLease, ttl: Duration) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let renewed: i64 = Script::new(RENEW_SCRIPT)
            .key(self.lease_key(&lease.key))
            .arg(&lease.holder)
            .arg(ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await?;
        Ok(renewed == 1)
    }

    async fn release_lease(&self, lease: &WriteLease) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        let _released: i64 = Script::new(RELEASE_SCRIPT)
            .key(self.lease_key(&lease.key))
            .arg(&lease.holder)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn commit(&self, lease: &WriteLease, job: &Job) -> StoreResult<()> {
        let payload = serde_json::to_string(job)?;
        let member = lease.key.to_string();
        let terminal = if job.phase.is_terminal() { "1" } else { "0" };
        let mut conn = self.conn().await?;

        let committed: i64 = Script::new(COMMIT_SCRIPT)
            .key(self.lease_key(&lease.key))
            .key(self.job_key(&lease.key.owner_id, &lease.key.job_id))
            .key(self.active_key())
            .arg(&lease.holder)
            .arg(payload)
            .arg(terminal)
            .arg(member)
            .invoke_async(&mut conn)
            .await?;

        if committed != 1 {
            return Err(StoreError::lease_lost(lease.key.to_string()));
        }
        Ok(())
    }

    async fn active_jobs(&self) -> StoreResult<Vec<JobKey>> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = conn.smembers(self.active_key()).await?;

        Ok(members
            .iter()
            .filter_map(|member| {
                // Job ids are UUIDs and never contain ':'; owners may.
                let (owner, job) = member.rsplit_once(':')?;
                Some(JobKey::new(owner, JobId::from_string(job)))
            })
            .collect())
    }

    async fn request_cancel(&self, key: &JobKey) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(self.cancel_key(key), 1).await?;
        Ok(())
    }

    async fn cancel_requested(&self, key: &JobKey) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let flag: Option<i64> = conn.get(self.cancel_key(key)).await?;
        Ok(flag.is_some())
    }
}

#[async_trait]
impl ProjectStore for RedisStore {
    async fn put(&self, project: &Project) -> StoreResult<()> {
        let payload = serde_json::to_string(project)?;
        let mut conn = self.conn().await?;
        conn.set::<_, _, ()>(self.project_key(&project.owner_id, &project.id), payload)
            .await?;
        Ok(())
    }

    async fn get(&self, owner_id: &str, project_id: &ProjectId) -> StoreResult<Option<Project>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = conn.get(self.project_key(owner_id, project_id)).await?;
        match raw {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RedisStoreConfig::default();
        assert_eq!(config.redis_url, "redis://localhost:6379");
        assert_eq!(config.key_prefix, "reelgen");
    }

    /// Live round-trip against a local Redis.
    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_lease_round_trip() {
        let store = RedisStore::from_env().unwrap();
        let key = JobKey::new("test-owner", JobId::new());

        let lease = store
            .acquire_lease(&key, Duration::from_secs(30))
            .await
            .unwrap()
            .expect("first acquire succeeds");
        assert!(store
            .acquire_lease(&key, Duration::from_secs(30))
            .await
            .unwrap()
            .is_none());
        assert!(store.renew_lease(&lease, Duration::from_secs(30)).await.unwrap());
        store.release_lease(&lease).await.unwrap();
    }
}
