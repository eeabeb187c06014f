//! Sequential, parallel and adaptive execution over a run's account list.

use std::sync::Arc;

use uuid::Uuid;

use super::adaptive::{AdaptiveController, AdaptiveThresholds};
use super::chunk::ChunkExecutor;
use super::events::{SyncEvent, emit};
use super::progress::ProgressTracker;
use super::types::{AccountSyncResult, StrategyReport, SyncMode};

/// What a strategy produced for a run.
#[derive(Debug, Clone)]
#[must_use]
pub struct StrategyOutcome {
    /// Per-account results in input order, for every account processed.
    pub account_results: Vec<AccountSyncResult>,
    pub report: StrategyReport,
    /// The cancel flag stopped the run before every account was processed.
    pub cancelled: bool,
}

/// Drives a [`ChunkExecutor`] over the accounts of one run.
///
/// All three strategies walk the account list in chunks:
/// - sequential uses chunks of one;
/// - parallel uses chunks of `max_concurrent_accounts`, run concurrently;
/// - adaptive starts at one and lets an [`AdaptiveController`] resize.
///
/// The configuration's `rate_limit_delay` is slept between chunks (never
/// after the last), progress is recorded at every chunk boundary, and the
/// cancel flag is checked before each chunk.
pub struct StrategyRunner {
    executor: ChunkExecutor,
    progress: Arc<ProgressTracker>,
    thresholds: AdaptiveThresholds,
    run_id: Uuid,
}

impl StrategyRunner {
    pub fn new(executor: ChunkExecutor, progress: Arc<ProgressTracker>, run_id: Uuid) -> Self {
        Self {
            executor,
            progress,
            thresholds: AdaptiveThresholds::default(),
            run_id,
        }
    }

    #[must_use]
    pub fn with_thresholds(mut self, thresholds: AdaptiveThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub async fn run(&self, accounts: &[String]) -> StrategyOutcome {
        let worker = self.executor.worker();
        let clock = Arc::clone(worker.clock());
        let config = worker.config();
        let config_id = config.id;
        let policy = &config.policy;
        let mode = policy.sync_mode;
        let max = policy.concurrency_limit();

        let mut adaptive =
            (mode == SyncMode::Adaptive).then(|| AdaptiveController::new(max, self.thresholds));
        let mut report = StrategyReport {
            requested_mode: mode,
            final_mode: mode,
            chunk_sizes: Vec::new(),
        };
        let mut results = Vec::with_capacity(accounts.len());
        let mut cancelled = false;
        let mut offset = 0;

        while offset < accounts.len() {
            if worker.is_cancelled() {
                cancelled = true;
                break;
            }

            let (size, concurrent) = match (&adaptive, mode) {
                (Some(controller), _) => (
                    controller.chunk_size(),
                    controller.mode() == SyncMode::Parallel,
                ),
                (None, SyncMode::Parallel) => (max, true),
                (None, _) => (1, false),
            };
            let end = (offset + size).min(accounts.len());
            let chunk = &accounts[offset..end];
            let index = report.chunk_sizes.len();

            self.progress
                .set_current(config_id, self.run_id, chunk.first().map(String::as_str));
            emit(
                worker.events(),
                SyncEvent::ChunkStarted {
                    config_id,
                    index,
                    size: chunk.len(),
                    concurrent,
                },
            );

            let chunk_started = clock.instant();
            let chunk_results = if concurrent {
                self.executor.run_concurrent(chunk, chunk.len()).await
            } else {
                self.executor.run_sequential(chunk).await
            };
            let elapsed = clock.instant().saturating_duration_since(chunk_started);

            results.extend(chunk_results);
            report.chunk_sizes.push(chunk.len());
            offset = end;

            self.progress
                .record(config_id, self.run_id, results.len(), clock.instant());
            tracing::debug!(
                %config_id,
                chunk = index,
                chunk_size = chunk.len(),
                processed = results.len(),
                total = accounts.len(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Chunk finished"
            );
            emit(
                worker.events(),
                SyncEvent::ChunkFinished {
                    config_id,
                    index,
                    processed: results.len(),
                    total: accounts.len(),
                    elapsed_ms: elapsed.as_millis() as u64,
                },
            );

            if let Some(controller) = adaptive.as_mut()
                && let Some(adjustment) = controller.observe(chunk.len(), elapsed)
            {
                tracing::debug!(
                    %config_id,
                    from = adjustment.from,
                    to = adjustment.to,
                    mode = %adjustment.mode,
                    accounts_per_minute = adjustment.accounts_per_minute,
                    "Adaptive chunk size changed"
                );
                emit(
                    worker.events(),
                    SyncEvent::AdaptiveResized {
                        config_id,
                        from: adjustment.from,
                        to: adjustment.to,
                        mode: adjustment.mode,
                        accounts_per_minute: adjustment.accounts_per_minute,
                    },
                );
            }

            if offset < accounts.len() {
                if worker.is_cancelled() {
                    cancelled = true;
                    break;
                }
                clock.sleep(policy.rate_limit_delay()).await;
            }
        }

        report.final_mode = match &adaptive {
            Some(controller) => controller.mode(),
            None if mode == SyncMode::Parallel => SyncMode::Parallel,
            None => SyncMode::Sequential,
        };

        StrategyOutcome {
            account_results: results,
            report,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SyncRequest;
    use crate::clock::{Clock, TokioClock};
    use crate::sync::test_support::{ScriptedClient, config_with, fast_policy};
    use crate::sync::worker::AccountSyncWorker;
    use crate::sync::{AccountStatus, CancelFlag, SyncPolicy};
    use chrono::Utc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn accounts(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("acct-{i}")).collect()
    }

    fn runner(
        client: Arc<ScriptedClient>,
        policy: SyncPolicy,
        cancel: CancelFlag,
    ) -> (StrategyRunner, Arc<ProgressTracker>, Uuid) {
        let config = Arc::new(config_with(&[], policy));
        let config_id = config.id;
        let worker = AccountSyncWorker::new(
            client,
            config,
            Arc::new(TokioClock),
            SyncRequest {
                cancel,
                ..SyncRequest::default()
            },
        );
        let progress = Arc::new(ProgressTracker::new());
        let run_id = Uuid::new_v4();
        (
            StrategyRunner::new(ChunkExecutor::new(worker), Arc::clone(&progress), run_id),
            progress,
            config_id,
        )
    }

    async fn timed_run(mode: SyncMode, n: usize) -> (StrategyOutcome, Duration) {
        let client = Arc::new(ScriptedClient::new().with_latency(Duration::from_secs(2)));
        let policy = SyncPolicy {
            sync_mode: mode,
            max_concurrent_accounts: 8,
            ..fast_policy()
        };
        let (runner, _, _) = runner(client, policy, CancelFlag::new());
        let start = Instant::now();
        let outcome = runner.run(&accounts(n)).await;
        (outcome, start.elapsed())
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_paces_between_accounts_but_not_after_the_last() {
        let client = Arc::new(ScriptedClient::new());
        let policy = SyncPolicy {
            rate_limit_delay_ms: 500,
            ..fast_policy()
        };
        let (runner, _, _) = runner(Arc::clone(&client), policy, CancelFlag::new());
        let start = TokioClock.instant();

        let outcome = runner.run(&accounts(3)).await;

        assert_eq!(outcome.account_results.len(), 3);
        assert_eq!(outcome.report.chunk_sizes, vec![1, 1, 1]);
        assert_eq!(client.peak_in_flight(), 1);
        assert_eq!(start.elapsed(), Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_uses_fixed_chunks_of_max_concurrency() {
        let (outcome, elapsed) = timed_run(SyncMode::Parallel, 20).await;

        assert_eq!(outcome.report.chunk_sizes, vec![8, 8, 4]);
        assert_eq!(outcome.report.final_mode, SyncMode::Parallel);
        assert_eq!(elapsed, Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn adaptive_scales_up_and_beats_sequential() {
        let (adaptive, adaptive_elapsed) = timed_run(SyncMode::Adaptive, 20).await;
        let (sequential, sequential_elapsed) = timed_run(SyncMode::Sequential, 20).await;

        assert_eq!(adaptive.account_results.len(), 20);
        assert_eq!(adaptive.report.chunk_sizes, vec![1, 2, 4, 8, 5]);
        assert!(adaptive.report.peak_chunk_size() > 1);
        assert_eq!(adaptive.report.final_mode, SyncMode::Parallel);
        assert_eq!(sequential.report.peak_chunk_size(), 1);
        assert!(
            adaptive_elapsed < sequential_elapsed,
            "adaptive {adaptive_elapsed:?} should beat sequential {sequential_elapsed:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_abort_the_run_and_order_is_preserved() {
        let client = Arc::new(ScriptedClient::new().failing(["acct-1", "acct-4"]));
        let policy = SyncPolicy {
            sync_mode: SyncMode::Parallel,
            max_concurrent_accounts: 3,
            ..fast_policy()
        };
        let (runner, _, _) = runner(client, policy, CancelFlag::new());
        let input = accounts(6);

        let outcome = runner.run(&input).await;

        let order: Vec<_> = outcome
            .account_results
            .iter()
            .map(|r| r.account_id.clone())
            .collect();
        assert_eq!(order, input);
        let failed: Vec<_> = outcome
            .account_results
            .iter()
            .filter(|r| r.status == AccountStatus::Failed)
            .map(|r| r.account_id.as_str())
            .collect();
        assert_eq!(failed, vec!["acct-1", "acct-4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_flag_stops_between_chunks() {
        let client = Arc::new(ScriptedClient::new().with_latency(Duration::from_secs(1)));
        let cancel = CancelFlag::new();
        let (runner, _, _) = runner(Arc::clone(&client), fast_policy(), cancel.clone());

        let handle = tokio::spawn(async move { runner.run(&accounts(10)).await });
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        cancel.cancel();
        let outcome = handle.await.expect("runner task");

        assert!(outcome.cancelled);
        assert_eq!(outcome.account_results.len(), 2);
        assert_eq!(client.total_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn progress_is_recorded_at_chunk_boundaries() {
        let client = Arc::new(ScriptedClient::new().with_latency(Duration::from_secs(1)));
        let (runner, progress, config_id) = runner(client, fast_policy(), CancelFlag::new());
        progress.start(config_id, runner.run_id, 4, Utc::now(), Instant::now());

        let watcher = {
            let progress = Arc::clone(&progress);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(2_500)).await;
                progress.get(config_id)
            })
        };
        let _ = runner.run(&accounts(4)).await;
        let mid_run = watcher.await.expect("watcher").expect("record exists");

        assert_eq!(mid_run.processed_accounts, 2);
        assert_eq!(mid_run.progress, 50);
        assert_eq!(mid_run.current_account.as_deref(), Some("acct-2"));
        assert_eq!(mid_run.estimated_time_remaining_ms, Some(2_000));
    }

    #[tokio::test]
    async fn empty_account_list_runs_no_chunks() {
        let client = Arc::new(ScriptedClient::new());
        let (runner, _, _) = runner(Arc::clone(&client), fast_policy(), CancelFlag::new());

        let outcome = runner.run(&[]).await;

        assert!(outcome.account_results.is_empty());
        assert!(outcome.report.chunk_sizes.is_empty());
        assert!(!outcome.cancelled);
        assert_eq!(client.total_calls(), 0);
    }
}
