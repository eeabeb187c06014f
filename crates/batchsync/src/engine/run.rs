//! Run lifecycle: execute, cancel, enqueue.

use std::sync::Arc;

use uuid::Uuid;

use super::{ActiveRun, BatchSyncEngine, EngineInner};
use crate::client::SyncRequest;
use crate::error::{EngineError, Result};
use crate::sync::{
    AccountSyncWorker, BatchSyncResult, CancelFlag, ChunkExecutor,
    ExecuteOptions, Priority, RunStatus, StrategyOutcome, StrategyRunner, SyncEvent,
    summary::apply_account_results,
};

/// Clears a run's active slot and progress record if the executing future
/// is dropped before it finalizes.
struct RunGuard {
    inner: Arc<EngineInner>,
    config_id: Uuid,
    run_id: Uuid,
    cancel: CancelFlag,
    armed: bool,
}

impl RunGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.cancel.cancel();
        {
            let mut state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
            if state
                .active
                .get(&self.config_id)
                .is_some_and(|run| run.result.id == self.run_id)
            {
                state.active.remove(&self.config_id);
            }
        }
        self.inner.progress.finish(self.config_id, self.run_id);
        tracing::warn!(
            config_id = %self.config_id,
            run_id = %self.run_id,
            "Run abandoned before completion"
        );
    }
}

/// What finalizing a run found in the active map.
enum Finalized {
    /// The run still owned its slot; its result was recorded.
    Recorded {
        result: BatchSyncResult,
        /// The configuration still exists and should be saved.
        stored: bool,
    },
    /// The run was cancelled (or its configuration deleted) while executing.
    Superseded(Option<BatchSyncResult>),
}

impl BatchSyncEngine {
    /// Run a configuration now and wait for it to finish.
    ///
    /// The finished result is appended to the configuration's history and
    /// returned. Account failures are reported inside the result; a panic in
    /// the strategy produces a `failed` result rather than an error. If the
    /// run is cancelled while executing, the recorded `cancelled` result is
    /// returned.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` for an unknown id,
    /// `EngineError::AlreadyRunning` if the configuration has an active run,
    /// and `EngineError::Disabled` if it is disabled and `force` is not set.
    pub async fn execute_now(&self, id: Uuid, options: ExecuteOptions) -> Result<BatchSyncResult> {
        let inner = &self.inner;
        let start_time = inner.clock.now();
        let started = inner.clock.instant();

        let (config, accounts, run_id, cancel, dry_run) = {
            let mut state = self.state();
            let config = state.configs.get(&id).ok_or(EngineError::NotFound { id })?;
            if state.active.contains_key(&id) {
                return Err(EngineError::AlreadyRunning { id });
            }
            if !config.enabled && !options.force {
                return Err(EngineError::Disabled { id });
            }

            let config = Arc::new(config.clone());
            let accounts = options
                .account_ids
                .clone()
                .unwrap_or_else(|| config.account_ids.clone());
            let dry_run = options.dry_run || config.policy.conditions.dry_run;
            let result = BatchSyncResult::running(id, accounts.len(), dry_run, start_time);
            let run_id = result.id;
            let cancel = CancelFlag::new();

            state.active.insert(
                id,
                ActiveRun {
                    result,
                    cancel: cancel.clone(),
                    started,
                },
            );
            (config, accounts, run_id, cancel, dry_run)
        };

        let total_accounts = accounts.len();
        let guard = RunGuard {
            inner: Arc::clone(inner),
            config_id: id,
            run_id,
            cancel: cancel.clone(),
            armed: true,
        };

        inner
            .progress
            .start(id, run_id, accounts.len(), start_time, started);
        tracing::info!(
            config_id = %id,
            %run_id,
            accounts = accounts.len(),
            mode = %config.policy.sync_mode,
            dry_run,
            "Starting batch sync"
        );
        self.emit(SyncEvent::RunStarted {
            config_id: id,
            run_id,
            total_accounts: accounts.len(),
            mode: config.policy.sync_mode,
        });

        let request = SyncRequest {
            force: options.force,
            dry_run,
            cancel,
        };
        let worker = AccountSyncWorker::new(
            Arc::clone(&inner.client),
            Arc::clone(&config),
            Arc::clone(&inner.clock),
            request,
        )
        .with_events(inner.on_event.clone());
        let runner = StrategyRunner::new(
            ChunkExecutor::new(worker),
            Arc::clone(&inner.progress),
            run_id,
        )
        .with_thresholds(inner.options.adaptive);

        let joined = tokio::spawn(async move { runner.run(&accounts).await }).await;
        let elapsed = inner.clock.instant().saturating_duration_since(started);
        let end_time = inner.clock.now();

        let outcome = match joined {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let error = EngineError::strategy(format!("Task panic: {}", e));
                tracing::error!(config_id = %id, %run_id, error = %error, "Strategy task failed");
                self.emit(SyncEvent::StrategyFailed {
                    config_id: id,
                    run_id,
                    error: error.to_string(),
                });
                Err(error)
            }
        };

        let finalized = self.finalize(id, run_id, outcome, end_time, elapsed);
        inner.progress.finish(id, run_id);
        guard.disarm();

        match finalized {
            Finalized::Recorded { result, stored } => {
                tracing::info!(
                    config_id = %id,
                    %run_id,
                    status = %result.status,
                    processed = result.processed_accounts,
                    successful = result.successful_accounts,
                    failed = result.failed_accounts,
                    skipped = result.skipped_accounts,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Batch sync finished"
                );
                self.emit(SyncEvent::RunFinished {
                    config_id: id,
                    run_id,
                    status: result.status,
                    processed: result.processed_accounts,
                    successful: result.successful_accounts,
                    failed: result.failed_accounts,
                    skipped: result.skipped_accounts,
                });
                if stored {
                    self.persist(id).await;
                }
                Ok(result)
            }
            Finalized::Superseded(recorded) => {
                tracing::debug!(config_id = %id, %run_id, "Run superseded by cancellation");
                Ok(recorded.unwrap_or_else(|| {
                    let mut result =
                        BatchSyncResult::running(id, total_accounts, dry_run, start_time);
                    result.id = run_id;
                    result.terminate(RunStatus::Cancelled, end_time, elapsed);
                    result
                }))
            }
        }
    }

    /// Record a finished strategy into the active result and history.
    fn finalize(
        &self,
        id: Uuid,
        run_id: Uuid,
        outcome: std::result::Result<StrategyOutcome, EngineError>,
        end_time: chrono::DateTime<chrono::Utc>,
        elapsed: std::time::Duration,
    ) -> Finalized {
        let mut state = self.state();

        let owned = state
            .active
            .get(&id)
            .is_some_and(|run| run.result.id == run_id);
        let Some(run) = owned.then(|| state.active.remove(&id)).flatten() else {
            let recorded = state
                .configs
                .get(&id)
                .and_then(|c| c.find_result(run_id))
                .cloned();
            return Finalized::Superseded(recorded);
        };

        let mut result = run.result;
        match outcome {
            Ok(outcome) => {
                let cancelled = outcome.cancelled;
                apply_account_results(&mut result, outcome.account_results, elapsed);
                result.strategy = Some(outcome.report);
                let status = if cancelled {
                    RunStatus::Cancelled
                } else {
                    result.status
                };
                result.terminate(status, end_time, elapsed);
            }
            Err(error) => {
                result.errors.push(error.to_string());
                result.terminate(RunStatus::Failed, end_time, elapsed);
            }
        }

        let history_limit = self.inner.options.history_limit;
        let stored = state
            .configs
            .get_mut(&id)
            .map(|config| {
                config.last_sync = Some(end_time);
                config.push_history(result.clone(), history_limit);
            })
            .is_some();

        Finalized::Recorded { result, stored }
    }

    /// Cancel a configuration's active run.
    ///
    /// The run's result becomes `cancelled` immediately and is appended to
    /// history; accounts already in flight finish in the background but are
    /// not counted. A new run may start as soon as this returns.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotRunning` if nothing is active for `id`.
    pub async fn cancel(&self, id: Uuid) -> Result<BatchSyncResult> {
        let now = self.inner.clock.now();
        let instant = self.inner.clock.instant();
        let history_limit = self.inner.options.history_limit;

        let (result, stored) = {
            let mut state = self.state();
            let run = state
                .active
                .remove(&id)
                .ok_or(EngineError::NotRunning { id })?;
            run.cancel.cancel();

            let mut result = run.result;
            result.terminate(
                RunStatus::Cancelled,
                now,
                instant.saturating_duration_since(run.started),
            );
            let stored = state
                .configs
                .get_mut(&id)
                .map(|config| config.push_history(result.clone(), history_limit))
                .is_some();
            (result, stored)
        };

        self.inner.progress.finish(id, result.id);
        tracing::info!(config_id = %id, run_id = %result.id, "Cancelled batch sync");
        self.emit(SyncEvent::RunCancelled {
            config_id: id,
            run_id: result.id,
        });

        if stored {
            self.persist(id).await;
        }
        Ok(result)
    }

    /// Queue a configuration for the background dispatcher.
    ///
    /// Re-enqueueing a queued configuration updates its priority and enqueue
    /// time instead of adding a second entry. Returns the entry's 1-based
    /// position. Starts the dispatcher if it is idle.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` for an unknown id and
    /// `EngineError::Disabled` for a disabled configuration.
    pub fn enqueue(&self, id: Uuid, priority: Priority) -> Result<usize> {
        let now = self.inner.clock.now();
        let position = {
            let mut state = self.state();
            let config = state.configs.get(&id).ok_or(EngineError::NotFound { id })?;
            if !config.enabled {
                return Err(EngineError::Disabled { id });
            }

            let inserted = state.queue.upsert(id, priority, now);
            let position = state
                .queue
                .snapshot()
                .into_iter()
                .find(|q| q.config_id == id)
                .map_or(state.queue.len(), |q| q.position);
            tracing::debug!(config_id = %id, %priority, position, inserted, "Enqueued sync");
            position
        };

        self.ensure_dispatcher();
        Ok(position)
    }
}
