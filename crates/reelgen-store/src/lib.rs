//! Durable stores for jobs and projects.
//!
//! Two guarantees back the orchestrator:
//! - Single-writer: at most one worker holds a job's write lease; everyone
//!   else sees read-only snapshots.
//! - Atomic transitions: a job record is one value; commits replace it
//!   whole, so partial updates are never observable.

pub mod error;
pub mod job_store;
pub mod memory;
pub mod progress;
pub mod project_store;
pub mod redis_store;

pub use error::{StoreError, StoreResult};
pub use job_store::{JobKey, JobStore, WriteLease, DEFAULT_LEASE_TTL};
pub use memory::MemoryStore;
pub use progress::{NoopProgress, ProgressEvent, ProgressSink, RedisProgressChannel};
pub use project_store::ProjectStore;
pub use redis_store::{RedisStore, RedisStoreConfig};
