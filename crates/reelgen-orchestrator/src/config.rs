//! Orchestrator configuration.

use std::time::Duration;

use reelgen_providers::RetryPolicy;

/// Tunables for the job state machine. Defaults match the documented
/// behavior; deployments may override them from the environment.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Cadence of the video and compile poll loops.
    pub poll_interval: Duration,
    /// Poll ticks allowed in the video phase before declaring a timeout.
    pub video_poll_ceiling: u32,
    /// Poll ticks allowed in the compile phase before declaring a timeout.
    pub compile_poll_ceiling: u32,
    /// Write lease TTL for one wake-up.
    pub lease_ttl: Duration,
    /// Backoff policy for external calls.
    pub retry: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            video_poll_ceiling: 40,
            compile_poll_ceiling: 60,
            lease_ttl: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: env_secs("REELGEN_POLL_INTERVAL_SECS")
                .unwrap_or(defaults.poll_interval),
            video_poll_ceiling: env_u32("REELGEN_VIDEO_POLL_CEILING")
                .unwrap_or(defaults.video_poll_ceiling),
            compile_poll_ceiling: env_u32("REELGEN_COMPILE_POLL_CEILING")
                .unwrap_or(defaults.compile_poll_ceiling),
            lease_ttl: env_secs("REELGEN_LEASE_TTL_SECS").unwrap_or(defaults.lease_ttl),
            retry: defaults.retry,
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
