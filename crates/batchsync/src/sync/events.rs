//! Lifecycle events emitted while a batch sync runs.
//!
//! Consumers (progress bars, log reporters, metrics exporters) register an
//! [`EventCallback`] on the engine builder and receive every event in order
//! of emission for a given run.

use uuid::Uuid;

use super::types::{AccountStatus, RunStatus, SyncMode};

/// Why the dispatcher discarded a queued entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The configuration was deleted after it was queued.
    Missing,
    /// The configuration is disabled.
    Disabled,
    /// The configuration already has an active run.
    Busy,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::Missing => write!(f, "missing"),
            DropReason::Disabled => write!(f, "disabled"),
            DropReason::Busy => write!(f, "busy"),
        }
    }
}

/// Events emitted by the engine, strategies and account workers.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncEvent {
    /// A run was registered as active and is about to start.
    RunStarted {
        config_id: Uuid,
        run_id: Uuid,
        total_accounts: usize,
        mode: SyncMode,
    },

    /// A chunk of accounts is about to be processed.
    ChunkStarted {
        config_id: Uuid,
        /// Zero-based chunk index.
        index: usize,
        size: usize,
        /// Whether members of the chunk run concurrently.
        concurrent: bool,
    },

    /// An account attempt failed and will be retried.
    AccountRetry {
        config_id: Uuid,
        account_id: String,
        /// Attempt that just failed (1-indexed).
        attempt: u32,
        retry_in_ms: u64,
        error: String,
    },

    /// An account reached its final outcome.
    AccountFinished {
        config_id: Uuid,
        account_id: String,
        status: AccountStatus,
        retry_count: u32,
    },

    /// A chunk settled.
    ChunkFinished {
        config_id: Uuid,
        index: usize,
        processed: usize,
        total: usize,
        elapsed_ms: u64,
    },

    /// The adaptive controller changed the chunk size.
    AdaptiveResized {
        config_id: Uuid,
        from: usize,
        to: usize,
        mode: SyncMode,
        accounts_per_minute: f64,
    },

    /// A run reached a terminal state other than cancelled.
    RunFinished {
        config_id: Uuid,
        run_id: Uuid,
        status: RunStatus,
        processed: usize,
        successful: usize,
        failed: usize,
        skipped: usize,
    },

    /// A run was cancelled.
    RunCancelled { config_id: Uuid, run_id: Uuid },

    /// The strategy task itself failed (panic or join error).
    StrategyFailed {
        config_id: Uuid,
        run_id: Uuid,
        error: String,
    },

    /// The dispatcher dropped a queue entry without running it.
    QueueDropped { config_id: Uuid, reason: DropReason },
}

/// Callback type for sync events.
pub type EventCallback = Box<dyn Fn(SyncEvent) + Send + Sync>;

/// Helper to emit an event if a callback is registered.
#[inline]
pub fn emit(on_event: Option<&EventCallback>, event: SyncEvent) {
    if let Some(cb) = on_event {
        cb(event);
    }
}
