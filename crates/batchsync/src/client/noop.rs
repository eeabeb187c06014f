use async_trait::async_trait;

use super::errors::AccountSyncError;
use super::types::{AccountSyncClient, AccountSyncOutcome, SyncRequest};
use crate::sync::BatchSyncConfig;

/// Placeholder client: every account completes immediately with no items.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAccountSyncClient;

#[async_trait]
impl AccountSyncClient for NoopAccountSyncClient {
    async fn sync_account(
        &self,
        _config: &BatchSyncConfig,
        account_id: &str,
        request: &SyncRequest,
    ) -> Result<AccountSyncOutcome, AccountSyncError> {
        tracing::trace!(account_id, dry_run = request.dry_run, "noop account sync");
        Ok(AccountSyncOutcome {
            account_name: Some(account_id.to_string()),
            ..AccountSyncOutcome::default()
        })
    }
}
