use batchsync::sync::{AccountStatus, SyncEvent};

/// Logging reporter using tracing for structured output.
pub(crate) struct LoggingReporter;

impl LoggingReporter {
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) fn handle(&self, event: SyncEvent) {
        match event {
            SyncEvent::RunStarted {
                config_id,
                run_id,
                total_accounts,
                mode,
            } => {
                tracing::info!(%config_id, %run_id, total_accounts, %mode, "Sync started");
            }

            SyncEvent::ChunkStarted {
                config_id,
                index,
                size,
                concurrent,
            } => {
                tracing::debug!(%config_id, chunk = index, chunk_size = size, concurrent, "Chunk started");
            }

            SyncEvent::AccountRetry {
                config_id,
                account_id,
                attempt,
                retry_in_ms,
                error,
            } => {
                tracing::warn!(%config_id, account_id = %account_id, attempt, retry_in_ms, error = %error, "Account attempt failed, retrying");
            }

            SyncEvent::AccountFinished {
                config_id,
                account_id,
                status,
                retry_count,
            } => match status {
                AccountStatus::Completed | AccountStatus::Skipped => {
                    tracing::debug!(%config_id, account_id = %account_id, %status, retry_count, "Account finished");
                }
                _ => {
                    tracing::warn!(%config_id, account_id = %account_id, %status, retry_count, "Account failed");
                }
            },

            SyncEvent::ChunkFinished {
                config_id,
                index,
                processed,
                total,
                elapsed_ms,
            } => {
                tracing::info!(%config_id, chunk = index, processed, total, elapsed_ms, "Chunk finished");
            }

            SyncEvent::AdaptiveResized {
                config_id,
                from,
                to,
                mode,
                accounts_per_minute,
            } => {
                tracing::info!(%config_id, from, to, %mode, accounts_per_minute, "Adaptive chunk size changed");
            }

            SyncEvent::RunFinished {
                config_id,
                run_id,
                status,
                processed,
                successful,
                failed,
                skipped,
            } => {
                tracing::info!(%config_id, %run_id, %status, processed, successful, failed, skipped, "Sync finished");
            }

            SyncEvent::RunCancelled { config_id, run_id } => {
                tracing::warn!(%config_id, %run_id, "Sync cancelled");
            }

            SyncEvent::StrategyFailed {
                config_id,
                run_id,
                error,
            } => {
                tracing::error!(%config_id, %run_id, error = %error, "Sync strategy failed");
            }

            SyncEvent::QueueDropped { config_id, reason } => {
                tracing::warn!(%config_id, %reason, "Skipped queued sync");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
