//! Outbound request throttling.
//!
//! Some providers enforce tight request-per-second limits on synthesis
//! endpoints. Adapters that need it wrap calls in a token bucket so bursts
//! of per-shot work drain at a sustainable rate; 429s that still slip
//! through are handled by the retry policy.

use std::num::NonZeroU32;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

/// Token bucket applied to one provider's outbound calls.
pub struct ProviderThrottle {
    limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl ProviderThrottle {
    /// Allow `per_second` requests per second with the same burst size.
    pub fn per_second(per_second: u32) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(per_second.max(1)).expect("nonzero"));
        Self {
            limiter: RateLimiter::direct(quota),
        }
    }

    /// Wait until the bucket allows another request.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let throttle = ProviderThrottle::per_second(10);
        // Must not block on a fresh bucket.
        tokio::time::timeout(std::time::Duration::from_secs(1), throttle.acquire())
            .await
            .expect("first acquire should be immediate");
    }
}
