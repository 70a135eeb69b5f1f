//! Request pacing.
//!
//! The leaderboard service has no published rate limit, so calls are spaced by
//! a fixed minimum delay. Pacing is a collaborator so tests can run without
//! real sleeps.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

#[async_trait::async_trait]
pub trait Pacer: Send + Sync {
    /// Suspends until the next remote call may be issued.
    async fn pace(&self);
}

/// Enforces a minimum gap between consecutive calls.
pub struct FixedDelayPacer {
    min_delay: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl FixedDelayPacer {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait::async_trait]
impl Pacer for FixedDelayPacer {
    async fn pace(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_delay {
                let wait_time = self.min_delay - elapsed;
                debug!("Pacing: waiting {}ms", wait_time.as_millis());
                sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// No delay at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacing;

#[async_trait::async_trait]
impl Pacer for NoPacing {
    async fn pace(&self) {}
}
