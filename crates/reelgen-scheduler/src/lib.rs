//! Per-job wake-up timers.
//!
//! The scheduler is a clock, not a worker pool: arming a timer schedules a
//! single wake-up key on a channel, and whoever consumes the channel claims
//! the job's write lease and does the work. Invariants:
//! - at most one outstanding timer per key; rearming replaces it
//! - firings are at-least-once; consumers must be idempotent

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

struct Inner<K> {
    timers: Mutex<HashMap<K, JoinHandle<()>>>,
    tx: mpsc::UnboundedSender<K>,
}

/// Wake-up timer keyed by job.
pub struct Scheduler<K> {
    inner: Arc<Inner<K>>,
}

impl<K> Clone for Scheduler<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> Scheduler<K>
where
    K: Clone + Eq + Hash + Send + Sync + std::fmt::Debug + 'static,
{
    /// Create a scheduler and the channel its firings arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<K>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                inner: Arc::new(Inner {
                    timers: Mutex::new(HashMap::new()),
                    tx,
                }),
            },
            rx,
        )
    }

    /// Arm (or re-arm) the key's timer to fire after `delay`.
    pub async fn arm_in(&self, key: K, delay: Duration) {
        let mut timers = self.inner.timers.lock().await;
        if let Some(existing) = timers.remove(&key) {
            existing.abort();
        }

        debug!(?key, delay_ms = delay.as_millis() as u64, "arming timer");

        let weak = Arc::downgrade(&self.inner);
        let tx = self.inner.tx.clone();
        let fire_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.timers.lock().await.remove(&fire_key);
            }
            let _ = tx.send(fire_key);
        });

        timers.insert(key, handle);
    }

    /// Arm (or re-arm) the key's timer for an absolute wall-clock time.
    /// Times in the past fire immediately.
    pub async fn arm_at(&self, key: K, at: DateTime<Utc>) {
        let delay = (at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        self.arm_in(key, delay).await;
    }

    /// Cancel the key's outstanding timer, if any.
    pub async fn disarm(&self, key: &K) {
        if let Some(handle) = self.inner.timers.lock().await.remove(key) {
            handle.abort();
        }
    }

    /// Number of armed timers (for tests and introspection).
    pub async fn armed_count(&self) -> usize {
        self.inner.timers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_once() {
        let (scheduler, mut rx) = Scheduler::new();
        scheduler.arm_in("job-1", Duration::from_secs(30)).await;
        assert_eq!(scheduler.armed_count().await, 1);

        tokio::time::advance(Duration::from_secs(31)).await;

        assert_eq!(rx.recv().await, Some("job-1"));
        assert_eq!(scheduler.armed_count().await, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearm_replaces_previous_timer() {
        let (scheduler, mut rx) = Scheduler::new();
        scheduler.arm_in("job-1", Duration::from_secs(10)).await;
        scheduler.arm_in("job-1", Duration::from_secs(60)).await;
        assert_eq!(scheduler.armed_count().await, 1);

        // The original 10s deadline passes without a firing.
        tokio::time::advance(Duration::from_secs(20)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::advance(Duration::from_secs(41)).await;
        assert_eq!(rx.recv().await, Some("job-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disarm_cancels() {
        let (scheduler, mut rx) = Scheduler::new();
        scheduler.arm_in("job-1", Duration::from_secs(5)).await;
        scheduler.disarm(&"job-1").await;

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_keys() {
        let (scheduler, mut rx) = Scheduler::new();
        scheduler.arm_in("job-1", Duration::from_secs(5)).await;
        scheduler.arm_in("job-2", Duration::from_secs(10)).await;

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(rx.recv().await, Some("job-1"));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(rx.recv().await, Some("job-2"));
    }
}
