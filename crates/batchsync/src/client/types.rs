use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::errors::AccountSyncError;
use crate::sync::{BatchSyncConfig, CancelFlag};

/// Per-call options handed to the client.
#[derive(Debug, Clone, Default)]
pub struct SyncRequest {
    /// The run was forced past a disabled configuration.
    pub force: bool,
    /// Do not write anything downstream.
    pub dry_run: bool,
    /// Set when the run is cancelled. Clients may stop early on it.
    pub cancel: CancelFlag,
}

/// What a client reports for one successfully synced account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccountSyncOutcome {
    /// Display name, when the downstream system knows one.
    pub account_name: Option<String>,
    pub total_items: u64,
    pub updated_items: u64,
    pub failed_items: u64,
    pub skipped_items: u64,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Confidence in the outcome, 0 to 1.
    pub confidence: f64,
    pub top_sub_resources: Vec<String>,
}

impl Default for AccountSyncOutcome {
    fn default() -> Self {
        Self {
            account_name: None,
            total_items: 0,
            updated_items: 0,
            failed_items: 0,
            skipped_items: 0,
            errors: Vec::new(),
            warnings: Vec::new(),
            confidence: 1.0,
            top_sub_resources: Vec::new(),
        }
    }
}

/// Synchronizes one account against the downstream system.
///
/// Implementations must be safe to call concurrently for different account
/// ids; parallel and adaptive runs issue up to `max_concurrent_accounts`
/// calls at once.
#[async_trait]
pub trait AccountSyncClient: Send + Sync {
    async fn sync_account(
        &self,
        config: &BatchSyncConfig,
        account_id: &str,
        request: &SyncRequest,
    ) -> Result<AccountSyncOutcome, AccountSyncError>;
}

#[async_trait]
impl<C: AccountSyncClient + ?Sized> AccountSyncClient for std::sync::Arc<C> {
    async fn sync_account(
        &self,
        config: &BatchSyncConfig,
        account_id: &str,
        request: &SyncRequest,
    ) -> Result<AccountSyncOutcome, AccountSyncError> {
        (**self).sync_account(config, account_id, request).await
    }
}
