//! Store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A record with this key already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A guarded commit found the lease expired or taken by another worker.
    #[error("Write lease lost for {0}")]
    LeaseLost(String),
}

impl StoreError {
    pub fn already_exists(key: impl Into<String>) -> Self {
        Self::AlreadyExists(key.into())
    }

    pub fn lease_lost(key: impl Into<String>) -> Self {
        Self::LeaseLost(key.into())
    }
}
