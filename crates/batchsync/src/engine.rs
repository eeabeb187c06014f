//! The batch sync engine façade.
//!
//! [`BatchSyncEngine`] owns the configuration registry, the active-run map,
//! the priority queue and the progress records. All four live behind one
//! engine value (no global state) and are shared by cheap clones.
//!
//! # Example
//!
//! ```ignore
//! use batchsync::{BatchSyncEngine, NoopAccountSyncClient};
//! use batchsync::sync::{ConfigSpec, ExecuteOptions};
//!
//! let engine = BatchSyncEngine::builder()
//!     .client(NoopAccountSyncClient)
//!     .build()?;
//!
//! let config = engine.create_config(ConfigSpec::new("nightly", ["a", "b"])).await?;
//! let result = engine.execute_now(config.id, ExecuteOptions::default()).await?;
//! assert_eq!(result.processed_accounts, 2);
//! ```

mod builder;
mod configs;
mod dispatcher;
mod options;
mod run;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, Notify};
use tokio::time::Instant;
use uuid::Uuid;

use crate::client::AccountSyncClient;
use crate::clock::Clock;
use crate::store::ConfigStore;
use crate::sync::{
    BatchSyncConfig, BatchSyncResult, CancelFlag, EventCallback, ProgressTracker, SyncEvent,
    SyncQueue, emit,
};

pub use builder::BatchSyncEngineBuilder;
pub use options::EngineOptions;

/// Runs batch synchronizations of configured account lists.
///
/// Cloning is cheap and every clone drives the same engine.
#[derive(Clone)]
pub struct BatchSyncEngine {
    inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    client: Arc<dyn AccountSyncClient>,
    store: Option<Arc<dyn ConfigStore>>,
    clock: Arc<dyn Clock>,
    on_event: Option<Arc<EventCallback>>,
    options: EngineOptions,
    progress: Arc<ProgressTracker>,
    state: Mutex<EngineState>,
    /// Held around every store call so writes land in registry order.
    store_writes: AsyncMutex<()>,
    /// Set while a dispatcher loop is alive.
    dispatching: AtomicBool,
    /// Signalled whenever a dispatcher loop exits.
    idle: Notify,
}

/// Engine state guarded by a single mutex.
///
/// The guard is never held across an `.await`.
pub(crate) struct EngineState {
    configs: HashMap<Uuid, BatchSyncConfig>,
    /// At most one entry per configuration.
    active: HashMap<Uuid, ActiveRun>,
    queue: SyncQueue,
}

pub(crate) struct ActiveRun {
    result: BatchSyncResult,
    cancel: CancelFlag,
    started: Instant,
}

impl BatchSyncEngine {
    /// Create a new builder.
    pub fn builder() -> BatchSyncEngineBuilder {
        BatchSyncEngineBuilder::new()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.inner.options
    }

    /// Whether a configuration store is attached.
    pub fn has_store(&self) -> bool {
        self.inner.store.is_some()
    }

    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: SyncEvent) {
        emit(self.inner.on_event.as_deref(), event);
    }

    /// Write a configuration's current registry state through to the store.
    ///
    /// The registry is read under the write lock, so the store ends on the
    /// latest version and a deleted configuration is never written back.
    async fn persist(&self, id: Uuid) {
        let Some(store) = &self.inner.store else {
            return;
        };
        let _order = self.inner.store_writes.lock().await;

        let current = self.state().configs.get(&id).cloned();
        let Some(config) = current else {
            tracing::debug!(config_id = %id, "Skipping save of deleted configuration");
            return;
        };
        if let Err(e) = store.save(&config).await {
            tracing::warn!(config_id = %id, error = %e, "Failed to save configuration");
        }
    }

    async fn persist_delete(&self, id: Uuid) {
        let Some(store) = &self.inner.store else {
            return;
        };
        let _order = self.inner.store_writes.lock().await;

        if let Err(e) = store.delete(id).await {
            tracing::warn!(config_id = %id, error = %e, "Failed to delete configuration");
        }
    }
}
