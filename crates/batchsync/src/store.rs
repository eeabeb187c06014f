//! Persistence of batch sync configurations.
//!
//! The engine keeps its registry in memory and writes through a
//! [`ConfigStore`]. [`MemoryConfigStore`] suits tests and embedded use;
//! [`DatabaseConfigStore`] persists to the `batch_sync_configs` table.

mod convert;
mod database;
mod errors;
mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::sync::BatchSyncConfig;

pub use convert::{from_model, to_active_model};
pub use database::DatabaseConfigStore;
pub use errors::{Result, StoreError};
pub use memory::MemoryConfigStore;

/// Durable storage for configurations and their bounded history.
///
/// Implementations must be safe to call from concurrent tasks.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Insert or replace a configuration.
    async fn save(&self, config: &BatchSyncConfig) -> Result<()>;

    /// Remove a configuration. Deleting an unknown id is not an error.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Every stored configuration, oldest first.
    async fn load_all(&self) -> Result<Vec<BatchSyncConfig>>;
}
