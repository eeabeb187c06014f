//! Batchsync - batch synchronization of many accounts against a downstream service.
//!
//! A [`BatchSyncEngine`] holds named configurations (an ordered list of
//! account ids plus an execution policy) and runs them on demand or through
//! a priority queue. Each run walks the account list with one of three
//! strategies:
//!
//! - **sequential**: one account at a time, paced by `rate_limit_delay_ms`;
//! - **parallel**: fixed chunks of `max_concurrent_accounts` run concurrently;
//! - **adaptive**: chunk size grows or shrinks with measured throughput.
//!
//! Every account is retried with linear backoff, bounded by a per-call
//! timeout, and reported individually. The run's aggregate result (status,
//! counters, top errors) is kept in a bounded per-configuration history.
//!
//! # Features
//!
//! - `sqlite` (default) - SQLite driver for [`DatabaseConfigStore`].
//! - `migrate` (default) - Schema migrations and [`connect_and_migrate`].
//! - `http` - [`HttpAccountSyncClient`](client::HttpAccountSyncClient), an
//!   account sync client that POSTs to a JSON endpoint.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use batchsync::{BatchSyncEngine, DatabaseConfigStore, NoopAccountSyncClient, connect_and_migrate};
//! use batchsync::sync::{ConfigSpec, ExecuteOptions, Priority};
//!
//! let db = connect_and_migrate("sqlite://batchsync.db?mode=rwc").await?;
//! let engine = BatchSyncEngine::builder()
//!     .client(NoopAccountSyncClient)
//!     .store(Arc::new(DatabaseConfigStore::new(Arc::new(db))))
//!     .build()?;
//! engine.load_from_store().await?;
//!
//! let config = engine.create_config(ConfigSpec::new("nightly", ["acct-1", "acct-2"])).await?;
//! engine.enqueue(config.id, Priority::High)?;
//! engine.wait_until_idle().await;
//! ```

pub mod client;
pub mod clock;
pub mod db;
pub mod engine;
pub mod entity;
pub mod error;
pub mod store;
pub mod sync;

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "migrate")]
pub mod migration;

pub use client::{
    AccountSyncClient, AccountSyncError, AccountSyncOutcome, NoopAccountSyncClient,
    RateLimitedClient, SyncRequest,
};
pub use clock::{Clock, TokioClock};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use engine::{BatchSyncEngine, BatchSyncEngineBuilder, EngineOptions};
pub use entity::prelude::*;
pub use error::{EngineError, Result};
pub use store::{ConfigStore, DatabaseConfigStore, MemoryConfigStore, StoreError};
