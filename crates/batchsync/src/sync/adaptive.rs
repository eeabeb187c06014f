//! Hill-climbing chunk size controller for the adaptive strategy.
//!
//! The controller only looks at the chunk that just finished. Throughput at or
//! above the scale-up threshold doubles the chunk size (capped at the
//! configured maximum); throughput below the scale-down threshold halves it
//! (floor 1). A chunk size of one runs sequentially, anything larger runs in
//! parallel.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::summary::per_minute;
use super::types::{SCALE_DOWN_PER_MINUTE, SCALE_UP_PER_MINUTE, SyncMode};

/// Throughput thresholds, in accounts per minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveThresholds {
    pub scale_up_per_minute: f64,
    pub scale_down_per_minute: f64,
}

impl Default for AdaptiveThresholds {
    fn default() -> Self {
        Self {
            scale_up_per_minute: SCALE_UP_PER_MINUTE,
            scale_down_per_minute: SCALE_DOWN_PER_MINUTE,
        }
    }
}

/// A chunk size change decided after a chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustment {
    pub from: usize,
    pub to: usize,
    pub mode: SyncMode,
    pub accounts_per_minute: f64,
}

/// Feedback controller state for one adaptive run.
#[derive(Debug, Clone)]
pub struct AdaptiveController {
    chunk_size: usize,
    max_chunk_size: usize,
    mode: SyncMode,
    thresholds: AdaptiveThresholds,
}

impl AdaptiveController {
    /// Start sequential with a chunk size of one.
    #[must_use]
    pub fn new(max_chunk_size: usize, thresholds: AdaptiveThresholds) -> Self {
        Self {
            chunk_size: 1,
            max_chunk_size: max_chunk_size.max(1),
            mode: SyncMode::Sequential,
            thresholds,
        }
    }

    #[must_use]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    #[must_use]
    pub fn mode(&self) -> SyncMode {
        self.mode
    }

    /// Feed the size and duration of the chunk that just finished.
    ///
    /// A chunk that took no measurable time counts as infinitely fast.
    pub fn observe(&mut self, processed: usize, elapsed: Duration) -> Option<Adjustment> {
        let rate = if elapsed.is_zero() {
            f64::INFINITY
        } else {
            per_minute(processed as f64, elapsed)
        };
        let from = self.chunk_size;

        if rate >= self.thresholds.scale_up_per_minute && from < self.max_chunk_size {
            self.chunk_size = (from * 2).min(self.max_chunk_size);
        } else if rate < self.thresholds.scale_down_per_minute && from > 1 {
            self.chunk_size = (from / 2).max(1);
        } else {
            return None;
        }

        self.mode = if self.chunk_size > 1 {
            SyncMode::Parallel
        } else {
            SyncMode::Sequential
        };

        Some(Adjustment {
            from,
            to: self.chunk_size,
            mode: self.mode,
            accounts_per_minute: rate,
        })
    }
}
