//! Common re-exports for convenient entity usage.

pub use super::batch_sync_config::{
    ActiveModel as BatchSyncConfigActiveModel, Column as BatchSyncConfigColumn,
    Entity as BatchSyncConfigEntity, Model as BatchSyncConfigModel,
};
pub use super::priority::Priority;
pub use super::sync_mode::SyncMode;
