use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, Notify};

use super::options::EngineOptions;
use super::{BatchSyncEngine, EngineInner, EngineState};
use crate::client::AccountSyncClient;
use crate::clock::{Clock, TokioClock};
use crate::error::{EngineError, Result};
use crate::store::ConfigStore;
use crate::sync::{EventCallback, ProgressTracker, SyncEvent, SyncQueue};

/// Builder for creating a [`BatchSyncEngine`].
///
/// Only the account sync client is required. Without a store the engine
/// keeps configurations in memory only; without a clock it uses
/// [`TokioClock`].
#[derive(Default)]
pub struct BatchSyncEngineBuilder {
    client: Option<Arc<dyn AccountSyncClient>>,
    store: Option<Arc<dyn ConfigStore>>,
    clock: Option<Arc<dyn Clock>>,
    on_event: Option<Arc<EventCallback>>,
    options: Option<EngineOptions>,
}

impl BatchSyncEngineBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the account sync client.
    pub fn client(mut self, client: impl AccountSyncClient + 'static) -> Self {
        self.client = Some(Arc::new(client));
        self
    }

    /// Set an already shared account sync client.
    pub fn shared_client(mut self, client: Arc<dyn AccountSyncClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the configuration store.
    pub fn store(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the clock used for timestamps, pacing and backoff.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Set the event callback.
    pub fn on_event(mut self, callback: impl Fn(SyncEvent) + Send + Sync + 'static) -> Self {
        let callback: EventCallback = Box::new(callback);
        self.on_event = Some(Arc::new(callback));
        self
    }

    /// Set engine options.
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Build the engine.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::MissingField` if no client was set and
    /// `EngineError::InvalidConfig` if `history_limit` is zero.
    pub fn build(self) -> Result<BatchSyncEngine> {
        let client = self
            .client
            .ok_or(EngineError::MissingField { field: "client" })?;
        let options = self.options.unwrap_or_default();

        if options.history_limit == 0 {
            return Err(EngineError::invalid("history_limit must be at least 1"));
        }

        Ok(BatchSyncEngine {
            inner: Arc::new(EngineInner {
                client,
                store: self.store,
                clock: self.clock.unwrap_or_else(|| Arc::new(TokioClock)),
                on_event: self.on_event,
                options,
                progress: Arc::new(ProgressTracker::new()),
                state: Mutex::new(EngineState {
                    configs: HashMap::new(),
                    active: HashMap::new(),
                    queue: SyncQueue::new(),
                }),
                store_writes: AsyncMutex::new(()),
                dispatching: AtomicBool::new(false),
                idle: Notify::new(),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::NoopAccountSyncClient;
    use crate::store::MemoryConfigStore;

    #[test]
    fn test_builder_build_requires_client() {
        let result = BatchSyncEngineBuilder::new().build();
        assert!(matches!(
            result,
            Err(EngineError::MissingField { field: "client" })
        ));
    }

    #[test]
    fn test_builder_defaults() {
        let engine = BatchSyncEngineBuilder::new()
            .client(NoopAccountSyncClient)
            .build()
            .expect("client is enough");

        assert_eq!(engine.options(), &EngineOptions::default());
        assert!(!engine.has_store());
        assert!(engine.get_configs().is_empty());
    }

    #[test]
    fn test_builder_with_store_and_options() {
        let options = EngineOptions {
            history_limit: 5,
            ..EngineOptions::default()
        };
        let engine = BatchSyncEngineBuilder::new()
            .client(NoopAccountSyncClient)
            .store(Arc::new(MemoryConfigStore::new()))
            .options(options.clone())
            .on_event(|_| {})
            .build()
            .expect("valid");

        assert!(engine.has_store());
        assert_eq!(engine.options(), &options);
    }

    #[test]
    fn test_builder_rejects_zero_history_limit() {
        let result = BatchSyncEngineBuilder::new()
            .client(NoopAccountSyncClient)
            .options(EngineOptions {
                history_limit: 0,
                ..EngineOptions::default()
            })
            .build();
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));
    }
}
