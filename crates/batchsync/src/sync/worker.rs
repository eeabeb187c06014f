//! Single-account sync with bounded retry.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use backon::Retryable;
use chrono::{DateTime, Utc};

use super::events::{EventCallback, SyncEvent, emit};
use super::retry::{ClockSleeper, LinearBuilder};
use super::types::{AccountStatus, AccountSyncResult, BatchSyncConfig, ItemCounters};
use crate::client::{
    AccountSyncClient, AccountSyncError, AccountSyncOutcome, SyncRequest, short_error_message,
};
use crate::clock::Clock;

/// Runs one account's sync attempts for a single run.
///
/// The worker makes up to `max_retries + 1` attempts, waiting
/// `retry_delay × attempt` between them. It never fails: every outcome,
/// including timeouts, is captured into the returned [`AccountSyncResult`].
/// Cheap to clone; chunk execution hands one clone to each spawned task.
#[derive(Clone)]
pub struct AccountSyncWorker {
    client: Arc<dyn AccountSyncClient>,
    config: Arc<BatchSyncConfig>,
    clock: Arc<dyn Clock>,
    request: SyncRequest,
    on_event: Option<Arc<EventCallback>>,
}

impl AccountSyncWorker {
    pub fn new(
        client: Arc<dyn AccountSyncClient>,
        config: Arc<BatchSyncConfig>,
        clock: Arc<dyn Clock>,
        request: SyncRequest,
    ) -> Self {
        Self {
            client,
            config,
            clock,
            request,
            on_event: None,
        }
    }

    #[must_use]
    pub fn with_events(mut self, on_event: Option<Arc<EventCallback>>) -> Self {
        self.on_event = on_event;
        self
    }

    pub fn config(&self) -> &BatchSyncConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn events(&self) -> Option<&EventCallback> {
        self.on_event.as_deref()
    }

    pub fn is_cancelled(&self) -> bool {
        self.request.cancel.is_cancelled()
    }

    /// Sync one account, retrying failures.
    pub async fn sync(&self, account_id: &str) -> AccountSyncResult {
        let start_time = self.clock.now();
        let policy = &self.config.policy;
        let config_id = self.config.id;
        let attempts = AtomicU32::new(0);

        let operation = || {
            attempts.fetch_add(1, Ordering::SeqCst);
            self.attempt(account_id)
        };

        let outcome = operation
            .retry(LinearBuilder::new(
                policy.retry_delay(),
                policy.max_retries as usize,
            ))
            .sleep(ClockSleeper(Arc::clone(&self.clock)))
            .when(|err: &AccountSyncError| err.is_retryable() && !self.is_cancelled())
            .notify(|err, delay| {
                let attempt = attempts.load(Ordering::SeqCst);
                tracing::debug!(
                    %config_id,
                    account_id,
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    error = %err,
                    "Account sync attempt failed, retrying"
                );
                emit(
                    self.events(),
                    SyncEvent::AccountRetry {
                        config_id,
                        account_id: account_id.to_string(),
                        attempt,
                        retry_in_ms: delay.as_millis() as u64,
                        error: short_error_message(err),
                    },
                );
            })
            .await;

        let end_time = self.clock.now();
        let attempts = attempts.load(Ordering::SeqCst);

        let result = match outcome {
            Ok(outcome) => self.completed(
                account_id,
                outcome,
                attempts.saturating_sub(1),
                start_time,
                end_time,
            ),
            Err(err) => {
                tracing::warn!(
                    %config_id,
                    account_id,
                    attempts,
                    error = %err,
                    "Account sync failed"
                );
                AccountSyncResult {
                    retry_count: attempts,
                    ..AccountSyncResult::failed(
                        account_id,
                        short_error_message(&err),
                        start_time,
                        end_time,
                    )
                }
            }
        };

        emit(
            self.events(),
            SyncEvent::AccountFinished {
                config_id,
                account_id: account_id.to_string(),
                status: result.status,
                retry_count: result.retry_count,
            },
        );

        result
    }

    async fn attempt(&self, account_id: &str) -> Result<AccountSyncOutcome, AccountSyncError> {
        let call = self
            .client
            .sync_account(&self.config, account_id, &self.request);

        let Some(limit) = self.config.policy.timeout() else {
            return call.await;
        };
        tokio::select! {
            biased;
            result = call => result,
            () = self.clock.sleep(limit) => Err(AccountSyncError::Timeout {
                after_ms: limit.as_millis() as u64,
            }),
        }
    }

    fn completed(
        &self,
        account_id: &str,
        outcome: AccountSyncOutcome,
        retry_count: u32,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> AccountSyncResult {
        let confidence = outcome.confidence.clamp(0.0, 1.0);
        let mut warnings = outcome.warnings;
        let mut status = AccountStatus::Completed;

        if let Some(threshold) = self.config.policy.conditions.min_confidence
            && confidence < threshold
        {
            status = AccountStatus::Skipped;
            warnings.push(format!(
                "Confidence {confidence:.2} below threshold {threshold:.2}, changes not counted"
            ));
        }

        AccountSyncResult {
            account_id: account_id.to_string(),
            account_name: outcome
                .account_name
                .unwrap_or_else(|| account_id.to_string()),
            status,
            start_time,
            end_time,
            items: ItemCounters {
                total: outcome.total_items,
                updated: outcome.updated_items,
                failed: outcome.failed_items,
                skipped: outcome.skipped_items,
            },
            errors: outcome.errors,
            warnings,
            retry_count,
            confidence,
            top_sub_resources: outcome.top_sub_resources,
        }
    }
}
