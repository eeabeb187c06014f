use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use super::errors::AccountSyncError;
use super::types::{AccountSyncClient, AccountSyncOutcome, SyncRequest};
use crate::http::{HttpTransport, JsonPost, ReqwestTransport, TransportError};
use crate::sync::{BatchSyncConfig, SyncConditions};

/// Longest slice of an error body quoted in an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Request body posted for each account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SyncAccountBody<'a> {
    config_id: Uuid,
    account_id: &'a str,
    force: bool,
    dry_run: bool,
    conditions: &'a SyncConditions,
}

/// Account sync client that delegates each account to an HTTP service.
///
/// Posts a JSON body to `{endpoint}/sync` and expects an
/// [`AccountSyncOutcome`] JSON object back on 2xx. Any other status is an
/// API error, which the worker retries like every other failure.
pub struct HttpAccountSyncClient<T = ReqwestTransport> {
    transport: T,
    endpoint: String,
    token: Option<String>,
}

impl HttpAccountSyncClient<ReqwestTransport> {
    /// Create a client backed by reqwest.
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        Ok(Self::with_transport(
            ReqwestTransport::with_timeout(timeout)?,
            endpoint,
            token,
        ))
    }
}

impl<T: HttpTransport> HttpAccountSyncClient<T> {
    pub fn with_transport(transport: T, endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            token,
        }
    }

    fn sync_url(&self) -> String {
        format!("{}/sync", self.endpoint.trim_end_matches('/'))
    }
}

#[async_trait]
impl<T: HttpTransport> AccountSyncClient for HttpAccountSyncClient<T> {
    async fn sync_account(
        &self,
        config: &BatchSyncConfig,
        account_id: &str,
        request: &SyncRequest,
    ) -> Result<AccountSyncOutcome, AccountSyncError> {
        let conditions = &config.policy.conditions;
        let body = SyncAccountBody {
            config_id: config.id,
            account_id,
            force: request.force,
            dry_run: request.dry_run || conditions.dry_run,
            conditions,
        };
        let body = serde_json::to_vec(&body)
            .map_err(|e| AccountSyncError::internal(format!("encode request: {e}")))?;

        let response = self
            .transport
            .post_json(JsonPost {
                url: self.sync_url(),
                bearer: self.token.clone(),
                body,
            })
            .await
            .map_err(|e| AccountSyncError::transport(e.to_string()))?;

        if !response.is_success() {
            return Err(AccountSyncError::api(format!(
                "HTTP {}: {}",
                response.status,
                response.excerpt(MAX_ERROR_BODY_CHARS)
            )));
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| AccountSyncError::internal(format!("decode response: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Reply, ScriptedTransport};
    use crate::sync::ConfigSpec;
    use chrono::Utc;

    const ENDPOINT: &str = "https://sync.example.test/v1/";

    fn config() -> BatchSyncConfig {
        BatchSyncConfig::from_spec(ConfigSpec::new("http", ["acct-1"]), Utc::now())
    }

    fn reply(status: u16, body: &str) -> Reply {
        Reply {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn posts_request_and_decodes_outcome() {
        let transport = ScriptedTransport::replying([reply(
            200,
            r#"{"accountName":"Acme","totalItems":4,"updatedItems":3,"confidence":0.9}"#,
        )]);
        let client =
            HttpAccountSyncClient::with_transport(transport.clone(), ENDPOINT, Some("t0k".into()));

        let request = SyncRequest {
            dry_run: true,
            ..SyncRequest::default()
        };
        let outcome = client
            .sync_account(&config(), "acct-1", &request)
            .await
            .expect("2xx should decode");

        assert_eq!(outcome.account_name.as_deref(), Some("Acme"));
        assert_eq!(outcome.total_items, 4);
        assert_eq!(outcome.updated_items, 3);

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "https://sync.example.test/v1/sync");
        assert_eq!(sent[0].bearer.as_deref(), Some("t0k"));
        let body: serde_json::Value = serde_json::from_slice(&sent[0].body).unwrap();
        assert_eq!(body["accountId"], "acct-1");
        assert_eq!(body["dryRun"], true);
    }

    #[tokio::test]
    async fn non_success_status_is_an_api_error() {
        let transport = ScriptedTransport::replying([reply(429, "slow down\n")]);
        let client = HttpAccountSyncClient::with_transport(transport, ENDPOINT, None);

        let err = client
            .sync_account(&config(), "acct-1", &SyncRequest::default())
            .await
            .expect_err("429 should fail");

        assert_eq!(err, AccountSyncError::api("HTTP 429: slow down"));
    }

    #[tokio::test]
    async fn undecodable_body_is_an_internal_error() {
        let transport = ScriptedTransport::replying([reply(200, "<html>")]);
        let client = HttpAccountSyncClient::with_transport(transport, ENDPOINT, None);

        let err = client
            .sync_account(&config(), "acct-1", &SyncRequest::default())
            .await
            .expect_err("html is not an outcome");

        assert!(matches!(err, AccountSyncError::Internal { .. }));
    }

    #[tokio::test]
    async fn transport_failure_is_a_transport_error() {
        let client =
            HttpAccountSyncClient::with_transport(ScriptedTransport::default(), ENDPOINT, None);

        let err = client
            .sync_account(&config(), "acct-1", &SyncRequest::default())
            .await
            .expect_err("nothing scripted");

        assert!(matches!(err, AccountSyncError::Transport { .. }));
    }
}
