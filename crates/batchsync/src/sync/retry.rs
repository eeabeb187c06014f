//! Linear retry backoff for account sync attempts.
//!
//! The delay before retry `n` is `base × n`, so with a 1s base the waits are
//! 1s, 2s, 3s, ... up to `max_retries` retries.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, Sleeper};

use crate::clock::Clock;

/// Builder for [`LinearBackoff`], usable anywhere backon takes a backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearBuilder {
    base: Duration,
    max_times: usize,
}

impl LinearBuilder {
    #[must_use]
    pub fn new(base: Duration, max_times: usize) -> Self {
        Self { base, max_times }
    }
}

impl BackoffBuilder for LinearBuilder {
    type Backoff = LinearBackoff;

    fn build(self) -> Self::Backoff {
        LinearBackoff {
            base: self.base,
            max_times: self.max_times,
            attempt: 0,
        }
    }
}

/// Iterator of linearly growing delays.
#[derive(Debug, Clone)]
pub struct LinearBackoff {
    base: Duration,
    max_times: usize,
    attempt: usize,
}

impl Iterator for LinearBackoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_times {
            return None;
        }
        self.attempt += 1;
        let factor = u32::try_from(self.attempt).unwrap_or(u32::MAX);
        Some(self.base.saturating_mul(factor))
    }
}

/// backon sleeper that waits on the engine's [`Clock`].
///
/// A named type keeps the retry future `Send`, so workers can be spawned.
#[derive(Clone)]
pub struct ClockSleeper(pub Arc<dyn Clock>);

impl Sleeper for ClockSleeper {
    type Sleep = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn sleep(&self, dur: Duration) -> Self::Sleep {
        let clock = Arc::clone(&self.0);
        Box::pin(async move { clock.sleep(dur).await })
    }
}
