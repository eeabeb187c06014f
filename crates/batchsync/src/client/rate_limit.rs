use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

use super::errors::AccountSyncError;
use super::types::{AccountSyncClient, AccountSyncOutcome, SyncRequest};
use crate::sync::BatchSyncConfig;

/// Type alias for the governor rate limiter.
type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// A rate-limited wrapper around any [`AccountSyncClient`].
///
/// Unlike a configuration's `rate_limit_delay`, which paces one run, this
/// limiter is shared by every run using the wrapped client, so it bounds the
/// total call rate against the downstream system.
pub struct RateLimitedClient<C> {
    inner: C,
    rate_limiter: Arc<GovernorRateLimiter>,
}

impl<C> RateLimitedClient<C> {
    /// Create a new rate-limited client wrapper.
    ///
    /// # Arguments
    ///
    /// * `inner` - The underlying client to wrap
    /// * `requests_per_second` - Maximum calls per second (0 is treated as 1)
    pub fn new(inner: C, requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rps));

        Self {
            inner,
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    /// Get a reference to the inner client.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: Clone> Clone for RateLimitedClient<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            rate_limiter: Arc::clone(&self.rate_limiter),
        }
    }
}

#[async_trait]
impl<C: AccountSyncClient> AccountSyncClient for RateLimitedClient<C> {
    async fn sync_account(
        &self,
        config: &BatchSyncConfig,
        account_id: &str,
        request: &SyncRequest,
    ) -> Result<AccountSyncOutcome, AccountSyncError> {
        self.rate_limiter.until_ready().await;
        if request.cancel.is_cancelled() {
            return Err(AccountSyncError::Cancelled);
        }
        self.inner.sync_account(config, account_id, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NoopAccountSyncClient;
    use crate::sync::ConfigSpec;
    use chrono::Utc;

    #[tokio::test]
    async fn delegates_to_inner_client() {
        let client = RateLimitedClient::new(NoopAccountSyncClient, 100);
        let config = BatchSyncConfig::from_spec(ConfigSpec::new("rl", ["a"]), Utc::now());

        let outcome = client
            .sync_account(&config, "a", &SyncRequest::default())
            .await
            .expect("inner client succeeds");
        assert_eq!(outcome.account_name.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn cancelled_request_short_circuits_after_waiting() {
        let client = RateLimitedClient::new(NoopAccountSyncClient, 0);
        let config = BatchSyncConfig::from_spec(ConfigSpec::new("rl", ["a"]), Utc::now());
        let request = SyncRequest::default();
        request.cancel.cancel();

        let err = client
            .sync_account(&config, "a", &request)
            .await
            .expect_err("cancelled request should not reach the inner client");
        assert_eq!(err, AccountSyncError::Cancelled);
    }

    #[test]
    fn clones_share_the_limiter() {
        let client = RateLimitedClient::new(NoopAccountSyncClient, 5);
        let clone = client.clone();
        assert!(Arc::ptr_eq(&client.rate_limiter, &clone.rate_limiter));
    }
}
