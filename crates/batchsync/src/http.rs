//! HTTP transport boundary for the HTTP account sync client.
//!
//! The client only ever POSTs a JSON document and reads a JSON reply, so the
//! boundary is a single [`HttpTransport::post_json`] call. Tests swap in a
//! scripted transport instead of opening sockets.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// A JSON POST to the sync service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPost {
    pub url: String,
    /// Sent as `Authorization: Bearer <token>` when present.
    pub bearer: Option<String>,
    /// Already-encoded JSON.
    pub body: Vec<u8>,
}

/// Status and raw body of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Reply {
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body as text, cut to at most `max_chars` characters.
    #[must_use]
    pub fn excerpt(&self, max_chars: usize) -> String {
        let text = String::from_utf8_lossy(&self.body);
        text.trim().chars().take(max_chars).collect()
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("no scripted reply left for POST {url}")]
    Unscripted { url: String },
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(&self, post: JsonPost) -> Result<Reply, TransportError>;
}

/// Transport backed by a shared reqwest client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a client whose every request is bounded by `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("batchsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(&self, post: JsonPost) -> Result<Reply, TransportError> {
        let mut builder = self
            .client
            .post(&post.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::ACCEPT, "application/json")
            .body(post.body);
        if let Some(token) = &post.bearer {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        Ok(Reply {
            status,
            body: body.to_vec(),
        })
    }
}

#[cfg(test)]
pub(crate) use scripted::ScriptedTransport;

#[cfg(test)]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Replies with a fixed script, in order, and records every post.
    #[derive(Clone, Default)]
    pub(crate) struct ScriptedTransport {
        state: Arc<Mutex<Script>>,
    }

    #[derive(Default)]
    struct Script {
        replies: VecDeque<Reply>,
        sent: Vec<JsonPost>,
    }

    impl ScriptedTransport {
        pub(crate) fn replying(replies: impl IntoIterator<Item = Reply>) -> Self {
            let transport = Self::default();
            transport.state.lock().unwrap().replies.extend(replies);
            transport
        }

        pub(crate) fn sent(&self) -> Vec<JsonPost> {
            self.state.lock().unwrap().sent.clone()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn post_json(&self, post: JsonPost) -> Result<Reply, TransportError> {
            let mut state = self.state.lock().unwrap();
            let url = post.url.clone();
            state.sent.push(post);
            state
                .replies
                .pop_front()
                .ok_or(TransportError::Unscripted { url })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(status: u16, body: &str) -> Reply {
        Reply {
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn success_covers_2xx_only() {
        assert!(reply(204, "").is_success());
        assert!(!reply(429, "").is_success());
        assert!(!reply(302, "").is_success());
    }

    #[test]
    fn excerpt_trims_and_truncates() {
        assert_eq!(reply(500, "  upstream exploded \n").excerpt(8), "upstream");
        assert_eq!(reply(500, "").excerpt(8), "");
    }

    #[tokio::test]
    async fn scripted_transport_replays_in_order() {
        let transport = ScriptedTransport::replying([reply(500, "first"), reply(200, "second")]);
        let post = JsonPost {
            url: "https://sync.example.test/sync".into(),
            bearer: None,
            body: b"{}".to_vec(),
        };

        let first = transport.post_json(post.clone()).await.unwrap();
        let second = transport.post_json(post.clone()).await.unwrap();
        let exhausted = transport.post_json(post).await;

        assert_eq!(first.status, 500);
        assert_eq!(second.status, 200);
        assert!(matches!(exhausted, Err(TransportError::Unscripted { .. })));
        assert_eq!(transport.sent().len(), 3);
    }
}
