//! Time source for the engine.
//!
//! Everything that waits or measures (retry backoff, per-account timeouts,
//! pacing delays, adaptive throughput, progress ETA, timestamps) goes through
//! [`Clock`] so tests can drive it deterministically.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Wall time, monotonic time and sleeping.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current wall-clock time, used for stamps stored on results.
    fn now(&self) -> DateTime<Utc>;

    /// Current monotonic time, used for elapsed measurements.
    fn instant(&self) -> Instant;

    /// Sleep for `duration`. A zero duration returns immediately.
    async fn sleep(&self, duration: Duration);
}

/// Clock backed by `chrono` wall time and `tokio::time`.
///
/// Under `#[tokio::test(start_paused = true)]` its monotonic side and sleeps
/// follow tokio's paused clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
