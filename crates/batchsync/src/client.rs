//! The account sync collaborator.
//!
//! The engine never talks to the downstream system itself. Each account is
//! handed to an [`AccountSyncClient`], which performs the actual protocol
//! call and reports item counters, messages and a confidence score.
//!
//! # Example
//!
//! ```ignore
//! use batchsync::client::{AccountSyncClient, RateLimitedClient, NoopAccountSyncClient};
//!
//! // Wrap any client to cap downstream calls at 5 per second.
//! let client = RateLimitedClient::new(NoopAccountSyncClient, 5);
//! let engine = BatchSyncEngine::builder().client(client).build()?;
//! ```

mod errors;
mod noop;
mod rate_limit;
mod types;

#[cfg(feature = "http")]
mod http;

pub use errors::{AccountSyncError, short_error_message};
pub use noop::NoopAccountSyncClient;
pub use rate_limit::RateLimitedClient;
pub use types::{AccountSyncClient, AccountSyncOutcome, SyncRequest};

#[cfg(feature = "http")]
pub use http::HttpAccountSyncClient;
