//! Provider error taxonomy.
//!
//! Every adapter failure is classified as retryable (network trouble, 5xx,
//! 429, timeout without a response) or permanent (semantic 4xx, malformed
//! payloads, missing credentials). The orchestrator and the retry helper
//! rely on this classification.

use thiserror::Error;

use crate::credentials::Capability;

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection-level failure; no response was received.
    #[error("Network error: {0}")]
    Network(String),

    /// The per-call deadline elapsed without a response.
    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    /// The remote answered with a non-success status.
    #[error("Provider returned {status}: {message}")]
    Http { status: u16, message: String },

    /// The remote answered 2xx but the payload did not match the contract.
    #[error("Malformed provider response: {0}")]
    Malformed(String),

    /// No credentials configured for the capability.
    #[error("No credentials configured for {0} provider")]
    MissingCredentials(Capability),

    /// Retry budget exhausted; carries the final error's description.
    #[error("Gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl ProviderError {
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of the failure, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether retrying the same call can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Network(_) | ProviderError::Timeout(_) => true,
            ProviderError::Http { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Malformed(_)
            | ProviderError::MissingCredentials(_)
            | ProviderError::Exhausted { .. } => false,
        }
    }
}

/// Map a reqwest transport error onto the taxonomy.
impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ProviderError::network("refused").is_retryable());
        assert!(ProviderError::timeout("60s").is_retryable());
        assert!(ProviderError::http(429, "slow down").is_retryable());
        assert!(ProviderError::http(503, "unavailable").is_retryable());

        assert!(!ProviderError::http(400, "bad request").is_retryable());
        assert!(!ProviderError::http(401, "bad key").is_retryable());
        assert!(!ProviderError::malformed("no choices").is_retryable());
        assert!(!ProviderError::MissingCredentials(Capability::Image).is_retryable());
    }
}
