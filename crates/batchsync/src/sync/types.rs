//! Core types for batch synchronization: configurations, results, options.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use crate::entity::priority::Priority;
pub use crate::entity::sync_mode::SyncMode;

/// Number of results retained in each configuration's history.
pub const HISTORY_LIMIT: usize = 50;

/// Adaptive throughput (accounts/minute) at or above which the chunk size doubles.
pub const SCALE_UP_PER_MINUTE: f64 = 30.0;

/// Adaptive throughput (accounts/minute) below which the chunk size halves.
pub const SCALE_DOWN_PER_MINUTE: f64 = 10.0;

/// Pause between dispatcher attempts.
pub const DISPATCH_INTERVAL_MS: u64 = 1_000;

/// Progress records older than this are swept regardless of run state.
pub const PROGRESS_MAX_AGE_SECS: u64 = 3_600;

/// Number of distinct error messages reported in a result summary.
pub const TOP_ERRORS_LIMIT: usize = 5;

/// Current layout of [`SyncConditions`].
pub const CONDITIONS_VERSION: u32 = 1;

/// Default upper bound on simultaneous account syncs.
pub const DEFAULT_MAX_CONCURRENT_ACCOUNTS: usize = 5;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay for linear retry backoff (milliseconds).
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Default per-account timeout (milliseconds).
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Default pacing delay between accounts or chunks (milliseconds).
pub const DEFAULT_RATE_LIMIT_DELAY_MS: u64 = 1_000;

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Per-configuration conditions consumed by the account worker and client.
///
/// Fields the engine does not interpret travel in `extra` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConditions {
    /// Layout version, bumped when named fields change meaning.
    pub version: u32,
    /// Ask the client not to write anything downstream.
    pub dry_run: bool,
    /// Cap on downstream updates per account, forwarded to the client.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_updates_per_account: Option<u64>,
    /// Completed outcomes below this confidence are recorded as skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
    /// Client-specific settings.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for SyncConditions {
    fn default() -> Self {
        Self {
            version: CONDITIONS_VERSION,
            dry_run: false,
            max_updates_per_account: None,
            min_confidence: None,
            extra: BTreeMap::new(),
        }
    }
}

/// Execution policy of a configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncPolicy {
    pub sync_mode: SyncMode,
    /// Upper bound on simultaneous account syncs.
    pub max_concurrent_accounts: usize,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base delay of the linear retry backoff.
    pub retry_delay_ms: u64,
    /// Per-account call timeout. Zero disables the timeout.
    pub timeout_ms: u64,
    /// Pause between accounts (sequential) or chunks (parallel, adaptive).
    pub rate_limit_delay_ms: u64,
    pub priority: Priority,
    pub conditions: SyncConditions,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            sync_mode: SyncMode::default(),
            max_concurrent_accounts: DEFAULT_MAX_CONCURRENT_ACCOUNTS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            rate_limit_delay_ms: DEFAULT_RATE_LIMIT_DELAY_MS,
            priority: Priority::default(),
            conditions: SyncConditions::default(),
        }
    }
}

impl SyncPolicy {
    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Per-account timeout, `None` when disabled.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    #[must_use]
    pub fn rate_limit_delay(&self) -> Duration {
        Duration::from_millis(self.rate_limit_delay_ms)
    }

    /// Concurrency bound clamped to at least one.
    #[must_use]
    pub fn concurrency_limit(&self) -> usize {
        self.max_concurrent_accounts.max(1)
    }
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// A named, reusable definition of which accounts to sync and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSyncConfig {
    pub id: Uuid,
    pub name: String,
    /// Accounts in processing order. Duplicates are synced independently.
    pub account_ids: Vec<String>,
    pub enabled: bool,
    pub policy: SyncPolicy,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_sync: Option<DateTime<Utc>>,
    pub next_sync: Option<DateTime<Utc>>,
    /// Most recent results, oldest first.
    pub sync_history: Vec<BatchSyncResult>,
}

impl BatchSyncConfig {
    /// Build a new configuration from a creation request.
    #[must_use]
    pub fn from_spec(spec: ConfigSpec, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: spec.name,
            account_ids: spec.account_ids,
            enabled: spec.enabled,
            policy: spec.policy,
            created_at: now,
            updated_at: now,
            last_sync: None,
            next_sync: spec.next_sync,
            sync_history: Vec::new(),
        }
    }

    /// Append a terminal result, evicting the oldest entries beyond `limit`.
    pub fn push_history(&mut self, result: BatchSyncResult, limit: usize) {
        self.sync_history.push(result);
        if self.sync_history.len() > limit {
            let excess = self.sync_history.len() - limit;
            self.sync_history.drain(..excess);
        }
    }

    /// The most recent recorded result.
    #[must_use]
    pub fn last_result(&self) -> Option<&BatchSyncResult> {
        self.sync_history.last()
    }

    /// Find a recorded result by run id.
    #[must_use]
    pub fn find_result(&self, run_id: Uuid) -> Option<&BatchSyncResult> {
        self.sync_history.iter().rev().find(|r| r.id == run_id)
    }
}

/// Request to create a configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSpec {
    pub name: String,
    pub account_ids: Vec<String>,
    pub enabled: bool,
    pub policy: SyncPolicy,
    pub next_sync: Option<DateTime<Utc>>,
}

impl Default for ConfigSpec {
    fn default() -> Self {
        Self {
            name: String::new(),
            account_ids: Vec::new(),
            enabled: true,
            policy: SyncPolicy::default(),
            next_sync: None,
        }
    }
}

impl ConfigSpec {
    /// An enabled configuration with the default policy.
    pub fn new<I, S>(name: impl Into<String>, account_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            account_ids: account_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: SyncPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Partial update for a configuration. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigPatch {
    pub name: Option<String>,
    pub account_ids: Option<Vec<String>>,
    pub enabled: Option<bool>,
    pub sync_mode: Option<SyncMode>,
    pub max_concurrent_accounts: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
    pub rate_limit_delay_ms: Option<u64>,
    pub priority: Option<Priority>,
    pub conditions: Option<SyncConditions>,
    /// `Some(None)` clears the scheduled time.
    pub next_sync: Option<Option<DateTime<Utc>>>,
}

impl ConfigPatch {
    /// Whether applying this patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge the set fields into `config`.
    pub fn apply_to(self, config: &mut BatchSyncConfig) {
        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(account_ids) = self.account_ids {
            config.account_ids = account_ids;
        }
        if let Some(enabled) = self.enabled {
            config.enabled = enabled;
        }

        let policy = &mut config.policy;
        if let Some(mode) = self.sync_mode {
            policy.sync_mode = mode;
        }
        if let Some(max) = self.max_concurrent_accounts {
            policy.max_concurrent_accounts = max;
        }
        if let Some(retries) = self.max_retries {
            policy.max_retries = retries;
        }
        if let Some(delay) = self.retry_delay_ms {
            policy.retry_delay_ms = delay;
        }
        if let Some(timeout) = self.timeout_ms {
            policy.timeout_ms = timeout;
        }
        if let Some(delay) = self.rate_limit_delay_ms {
            policy.rate_limit_delay_ms = delay;
        }
        if let Some(priority) = self.priority {
            policy.priority = priority;
        }
        if let Some(conditions) = self.conditions {
            policy.conditions = conditions;
        }
        if let Some(next_sync) = self.next_sync {
            config.next_sync = next_sync;
        }
    }
}

/// Options for a single execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecuteOptions {
    /// Run even when the configuration is disabled.
    pub force: bool,
    /// Ask the client not to write anything downstream.
    pub dry_run: bool,
    /// Restrict the run to these accounts, in this order.
    pub account_ids: Option<Vec<String>>,
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// Lifecycle state of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
    Partial,
}

impl RunStatus {
    /// Every state except `Running` is terminal.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Partial => "partial",
        };
        f.write_str(s)
    }
}

/// Outcome of one account within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Completed,
    Failed,
    Skipped,
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AccountStatus::Completed => "completed",
            AccountStatus::Failed => "failed",
            AccountStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Downstream item counters reported by the account sync client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCounters {
    pub total: u64,
    pub updated: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl ItemCounters {
    pub fn add(&mut self, other: &ItemCounters) {
        self.total += other.total;
        self.updated += other.updated;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Result of syncing one account within one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSyncResult {
    pub account_id: String,
    pub account_name: String,
    pub status: AccountStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub items: ItemCounters,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Failed attempts before success, or total attempts when failed.
    pub retry_count: u32,
    /// Client confidence in the outcome, 0 to 1.
    pub confidence: f64,
    pub top_sub_resources: Vec<String>,
}

impl AccountSyncResult {
    /// A failed result carrying a single error, used when no attempt could complete.
    #[must_use]
    pub fn failed(
        account_id: impl Into<String>,
        error: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        let account_id = account_id.into();
        Self {
            account_name: account_id.clone(),
            account_id,
            status: AccountStatus::Failed,
            start_time,
            end_time,
            items: ItemCounters::default(),
            errors: vec![error.into()],
            warnings: Vec::new(),
            retry_count: 0,
            confidence: 0.0,
            top_sub_resources: Vec::new(),
        }
    }
}

/// A distinct error message with its occurrences across a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopError {
    pub message: String,
    pub count: usize,
    pub account_ids: Vec<String>,
}

/// Derived metrics of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub average_confidence: f64,
    pub accounts_per_minute: f64,
    pub items_per_minute: f64,
    /// Successful / processed × 100, zero when nothing was processed.
    pub success_rate: f64,
    pub top_errors: Vec<TopError>,
}

/// How a strategy partitioned the account list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyReport {
    pub requested_mode: SyncMode,
    /// Mode in effect when the run ended (adaptive may switch).
    pub final_mode: SyncMode,
    /// Size of every chunk, in execution order.
    pub chunk_sizes: Vec<usize>,
}

impl StrategyReport {
    /// Largest chunk the run used.
    #[must_use]
    pub fn peak_chunk_size(&self) -> usize {
        self.chunk_sizes.iter().copied().max().unwrap_or(0)
    }
}

/// One execution of a configuration, running or terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSyncResult {
    pub id: Uuid,
    pub batch_config_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Monotonic duration of the run, set when it reaches a terminal state.
    pub processing_time_ms: Option<u64>,
    pub status: RunStatus,
    pub dry_run: bool,

    pub total_accounts: usize,
    pub processed_accounts: usize,
    pub successful_accounts: usize,
    pub failed_accounts: usize,
    pub skipped_accounts: usize,
    pub items: ItemCounters,

    /// Per-account detail in input order.
    pub account_results: Vec<AccountSyncResult>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub summary: ResultSummary,
    pub strategy: Option<StrategyReport>,
}

impl BatchSyncResult {
    /// A fresh `running` result.
    #[must_use]
    pub fn running(
        batch_config_id: Uuid,
        total_accounts: usize,
        dry_run: bool,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            batch_config_id,
            start_time,
            end_time: None,
            processing_time_ms: None,
            status: RunStatus::Running,
            dry_run,
            total_accounts,
            processed_accounts: 0,
            successful_accounts: 0,
            failed_accounts: 0,
            skipped_accounts: 0,
            items: ItemCounters::default(),
            account_results: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            summary: ResultSummary::default(),
            strategy: None,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.status == RunStatus::Running
    }

    #[must_use]
    pub fn processing_time(&self) -> Option<Duration> {
        self.processing_time_ms.map(Duration::from_millis)
    }

    /// Mark the result terminal without touching its account detail.
    pub fn terminate(
        &mut self,
        status: RunStatus,
        end_time: DateTime<Utc>,
        elapsed: Duration,
    ) {
        self.status = status;
        self.end_time = Some(end_time);
        self.processing_time_ms = Some(elapsed.as_millis() as u64);
    }
}
