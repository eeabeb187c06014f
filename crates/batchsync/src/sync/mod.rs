//! Batch synchronization building blocks.
//!
//! # Module Structure
//!
//! - [`types`] - Configurations, results, options, constants
//! - [`worker`] - `AccountSyncWorker`: one account with linear-backoff retry
//! - [`chunk`] - `ChunkExecutor`: a chunk of accounts, sequential or bounded-parallel
//! - [`strategy`] - `StrategyRunner`: sequential, parallel and adaptive runs
//! - [`adaptive`] - `AdaptiveController`: throughput-driven chunk sizing
//! - [`progress`] - `ProgressTracker`: live per-configuration progress
//! - [`queue`] - `SyncQueue`: priority-ordered pending requests
//! - [`stats`] - engine-wide and per-configuration statistics
//! - [`events`] - `SyncEvent`, `EventCallback`, `emit()`
//!
//! These pieces are wired together by [`BatchSyncEngine`](crate::BatchSyncEngine);
//! they are public so custom front-ends can reuse them.

pub mod adaptive;
mod cancel;
pub mod chunk;
mod events;
pub mod progress;
pub mod queue;
pub mod retry;
pub mod stats;
pub mod strategy;
pub mod summary;
mod types;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export types
pub use types::{
    AccountStatus, AccountSyncResult, BatchSyncConfig, BatchSyncResult, ConfigPatch, ConfigSpec,
    ExecuteOptions, ItemCounters, Priority, ResultSummary, RunStatus, StrategyReport,
    SyncConditions, SyncMode, SyncPolicy, TopError,
};

// Re-export constants
pub use types::{
    CONDITIONS_VERSION, DEFAULT_MAX_CONCURRENT_ACCOUNTS, DEFAULT_MAX_RETRIES,
    DEFAULT_RATE_LIMIT_DELAY_MS, DEFAULT_RETRY_DELAY_MS, DEFAULT_TIMEOUT_MS,
    DISPATCH_INTERVAL_MS, HISTORY_LIMIT, PROGRESS_MAX_AGE_SECS, SCALE_DOWN_PER_MINUTE,
    SCALE_UP_PER_MINUTE, TOP_ERRORS_LIMIT,
};

pub use adaptive::{AdaptiveController, AdaptiveThresholds};
pub use cancel::CancelFlag;
pub use chunk::ChunkExecutor;
pub use events::{DropReason, EventCallback, SyncEvent, emit};
pub use progress::{ProgressTracker, SyncProgress};
pub use queue::{BusyPolicy, QueuedSync, SyncQueue};
pub use stats::{ConfigStats, EngineStats};
pub use strategy::{StrategyOutcome, StrategyRunner};
pub use worker::AccountSyncWorker;
