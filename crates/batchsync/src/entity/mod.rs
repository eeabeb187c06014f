//! SeaORM entity definitions for the batchsync database schema.

pub mod batch_sync_config;
pub mod prelude;
pub mod priority;
pub mod sync_mode;
