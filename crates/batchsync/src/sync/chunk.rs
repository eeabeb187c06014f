//! Execution of one chunk of accounts.

use std::sync::Arc;

use tokio::sync::Semaphore;

use super::types::AccountSyncResult;
use super::worker::AccountSyncWorker;

/// Runs a chunk of accounts either one by one or with bounded parallelism.
///
/// Concurrent execution is a barrier: the call returns only after every
/// account in the chunk has settled, and results come back in input order.
/// A worker task that panics still yields a failed result for its account.
#[derive(Clone)]
pub struct ChunkExecutor {
    worker: AccountSyncWorker,
}

impl ChunkExecutor {
    pub fn new(worker: AccountSyncWorker) -> Self {
        Self { worker }
    }

    pub fn worker(&self) -> &AccountSyncWorker {
        &self.worker
    }

    /// Process accounts one at a time.
    pub async fn run_sequential(&self, accounts: &[String]) -> Vec<AccountSyncResult> {
        let mut results = Vec::with_capacity(accounts.len());
        for account_id in accounts {
            results.push(self.worker.sync(account_id).await);
        }
        results
    }

    /// Process accounts concurrently, at most `concurrency` in flight.
    pub async fn run_concurrent(
        &self,
        accounts: &[String],
        concurrency: usize,
    ) -> Vec<AccountSyncResult> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(accounts.len());

        for account_id in accounts {
            let worker = self.worker.clone();
            let semaphore = Arc::clone(&semaphore);
            let account_id = account_id.clone();

            let handle = tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        let now = worker.clock().now();
                        return AccountSyncResult::failed(
                            account_id,
                            "Semaphore closed unexpectedly",
                            now,
                            now,
                        );
                    }
                };
                worker.sync(&account_id).await
            });

            handles.push(handle);
        }

        let mut results = Vec::with_capacity(handles.len());
        for (handle, account_id) in handles.into_iter().zip(accounts) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::error!(
                        config_id = %self.worker.config().id,
                        account_id = %account_id,
                        "Account sync task panicked: {}",
                        e
                    );
                    let now = self.worker.clock().now();
                    results.push(AccountSyncResult::failed(
                        account_id.clone(),
                        format!("Task panic: {}", e),
                        now,
                        now,
                    ));
                }
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::SyncRequest;
    use crate::clock::TokioClock;
    use crate::sync::AccountStatus;
    use crate::sync::test_support::{ScriptedClient, config_with, fast_policy};
    use std::time::Duration;

    fn executor(client: Arc<ScriptedClient>) -> ChunkExecutor {
        ChunkExecutor::new(AccountSyncWorker::new(
            client,
            Arc::new(config_with(&[], fast_policy())),
            Arc::new(TokioClock),
            SyncRequest::default(),
        ))
    }

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_chunk_settles_all_members_in_input_order() {
        let client = Arc::new(
            ScriptedClient::new()
                .with_latency(Duration::from_secs(2))
                .failing(["b"]),
        );
        let executor = executor(Arc::clone(&client));
        let start = tokio::time::Instant::now();

        let results = executor.run_concurrent(&ids(&["a", "b", "c", "d"]), 4).await;

        let order: Vec<_> = results.iter().map(|r| r.account_id.as_str()).collect();
        assert_eq!(order, vec!["a", "b", "c", "d"]);
        assert_eq!(results[1].status, AccountStatus::Failed);
        assert_eq!(results[2].status, AccountStatus::Completed);
        assert_eq!(client.peak_in_flight(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_bound_is_respected() {
        let client = Arc::new(ScriptedClient::new().with_latency(Duration::from_secs(1)));
        let executor = executor(Arc::clone(&client));

        let results = executor
            .run_concurrent(&ids(&["a", "b", "c", "d", "e"]), 2)
            .await;

        assert_eq!(results.len(), 5);
        assert_eq!(client.peak_in_flight(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_chunk_never_overlaps() {
        let client = Arc::new(ScriptedClient::new().with_latency(Duration::from_secs(1)));
        let executor = executor(Arc::clone(&client));
        let start = tokio::time::Instant::now();

        let results = executor.run_sequential(&ids(&["a", "b", "c"])).await;

        assert_eq!(results.len(), 3);
        assert_eq!(client.peak_in_flight(), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn panicking_account_becomes_failed_result() {
        let client = Arc::new(ScriptedClient::new().panicking(["boom"]));
        let executor = executor(client);

        let results = executor.run_concurrent(&ids(&["ok", "boom"]), 2).await;

        assert_eq!(results[0].status, AccountStatus::Completed);
        assert_eq!(results[1].status, AccountStatus::Failed);
        assert_eq!(results[1].account_id, "boom");
        assert!(results[1].errors[0].starts_with("Task panic"));
    }
}
