//! Job store contract: keyed persistence with single-writer leases.
//!
//! At any instant at most one worker holds the write lease for a job; a
//! worker that cannot acquire it exits quietly and lets the holder rearm.
//! Commits rewrite the whole record so the tuple (phase, progress, shots,
//! outputs, error) advances atomically; partial updates are never
//! observable.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use reelgen_models::{Job, JobId};

use crate::error::StoreResult;

/// Owner-namespaced job key. Every persisted key carries the owner so one
/// owner's state is never reachable through another owner's requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobKey {
    pub owner_id: String,
    pub job_id: JobId,
}

impl JobKey {
    pub fn new(owner_id: impl Into<String>, job_id: JobId) -> Self {
        Self {
            owner_id: owner_id.into(),
            job_id,
        }
    }

    pub fn for_job(job: &Job) -> Self {
        Self {
            owner_id: job.owner_id.clone(),
            job_id: job.id.clone(),
        }
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.owner_id, self.job_id)
    }
}

/// Proof of write ownership for one job, valid until its TTL expires or it
/// is released. Commits are rejected once the lease is lost.
#[derive(Debug, Clone)]
pub struct WriteLease {
    pub key: JobKey,
    pub holder: String,
}

/// Default lease TTL; long enough to cover a full wake-up including slow
/// provider calls, short enough that a crashed worker frees the job.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(120);

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job. Fails if the key already exists.
    async fn create(&self, job: &Job) -> StoreResult<()>;

    /// Read the latest committed snapshot, owner-scoped.
    async fn get(&self, owner_id: &str, job_id: &JobId) -> StoreResult<Option<Job>>;

    /// Try to take the write lease. Returns None when another worker holds
    /// it.
    async fn acquire_lease(&self, key: &JobKey, ttl: Duration) -> StoreResult<Option<WriteLease>>;

    /// Extend a held lease. Returns false when the lease was already lost.
    async fn renew_lease(&self, lease: &WriteLease, ttl: Duration) -> StoreResult<bool>;

    /// Release a held lease. Releasing a lost lease is a no-op.
    async fn release_lease(&self, lease: &WriteLease) -> StoreResult<()>;

    /// Atomically replace the job record, guarded by the lease. A job that
    /// reached a terminal phase leaves the active index.
    async fn commit(&self, lease: &WriteLease, job: &Job) -> StoreResult<()>;

    /// Keys of jobs not yet in a terminal phase, for startup resume.
    async fn active_jobs(&self) -> StoreResult<Vec<JobKey>>;

    /// Mark a job for cancellation. The record itself stays untouched (it
    /// belongs to the lease holder); the orchestrator observes the marker at
    /// its next wake-up.
    async fn request_cancel(&self, key: &JobKey) -> StoreResult<()>;

    /// Whether cancellation has been requested for a job.
    async fn cancel_requested(&self, key: &JobKey) -> StoreResult<bool>;
}
