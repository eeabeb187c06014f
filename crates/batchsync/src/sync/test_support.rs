//! Scripted collaborators shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::client::{AccountSyncClient, AccountSyncError, AccountSyncOutcome, SyncRequest};
use crate::sync::{BatchSyncConfig, ConfigSpec, SyncPolicy};

/// Client whose behaviour per account is fixed up front.
pub(crate) struct ScriptedClient {
    latency: Duration,
    fail_accounts: HashSet<String>,
    fail_first: u32,
    panic_accounts: HashSet<String>,
    confidence: f64,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedClient {
    pub(crate) fn new() -> Self {
        Self {
            latency: Duration::ZERO,
            fail_accounts: HashSet::new(),
            fail_first: 0,
            panic_accounts: HashSet::new(),
            confidence: 1.0,
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// These accounts fail on every attempt.
    pub(crate) fn failing<'a>(mut self, accounts: impl IntoIterator<Item = &'a str>) -> Self {
        self.fail_accounts = accounts.into_iter().map(str::to_string).collect();
        self
    }

    /// Every account fails its first `n` attempts.
    pub(crate) fn failing_first(mut self, n: u32) -> Self {
        self.fail_first = n;
        self
    }

    pub(crate) fn panicking<'a>(mut self, accounts: impl IntoIterator<Item = &'a str>) -> Self {
        self.panic_accounts = accounts.into_iter().map(str::to_string).collect();
        self
    }

    pub(crate) fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub(crate) fn calls(&self, account_id: &str) -> u32 {
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        calls.get(account_id).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> u32 {
        let calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
        calls.values().sum()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountSyncClient for ScriptedClient {
    async fn sync_account(
        &self,
        _config: &BatchSyncConfig,
        account_id: &str,
        _request: &SyncRequest,
    ) -> Result<AccountSyncOutcome, AccountSyncError> {
        let attempt = {
            let mut calls = self.calls.lock().unwrap_or_else(|e| e.into_inner());
            let entry = calls.entry(account_id.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_accounts.contains(account_id) {
            panic!("scripted panic for {account_id}");
        }
        if self.fail_accounts.contains(account_id) || attempt <= self.fail_first {
            return Err(AccountSyncError::api(format!(
                "scripted failure for {account_id}"
            )));
        }

        Ok(AccountSyncOutcome {
            account_name: Some(format!("Account {account_id}")),
            total_items: 2,
            updated_items: 1,
            skipped_items: 1,
            confidence: self.confidence,
            top_sub_resources: vec![format!("{account_id}/campaign-1")],
            ..AccountSyncOutcome::default()
        })
    }
}

/// A configuration over `accounts` with the given policy.
pub(crate) fn config_with(accounts: &[&str], policy: SyncPolicy) -> BatchSyncConfig {
    BatchSyncConfig::from_spec(
        ConfigSpec::new("test", accounts.iter().copied()).with_policy(policy),
        Utc::now(),
    )
}

/// A policy with no pacing, short retries and the given mode settings.
pub(crate) fn fast_policy() -> SyncPolicy {
    SyncPolicy {
        max_retries: 0,
        retry_delay_ms: 10,
        rate_limit_delay_ms: 0,
        timeout_ms: 0,
        ..SyncPolicy::default()
    }
}
