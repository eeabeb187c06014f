use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    DatabaseConnection, EntityTrait, Insert, QueryOrder, sea_query::OnConflict,
};
use uuid::Uuid;

use super::convert::{from_model, to_active_model};
use super::{ConfigStore, Result, StoreError};
use crate::entity::batch_sync_config::{ActiveModel, Column, Entity as BatchSyncConfigEntity};
use crate::sync::BatchSyncConfig;

/// Store backed by the `batch_sync_configs` table.
#[derive(Clone)]
pub struct DatabaseConfigStore {
    db: Arc<DatabaseConnection>,
}

impl DatabaseConfigStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// Every column except the key and `created_at` is overwritten on conflict.
pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::column(Column::Id)
        .update_columns([
            Column::Name,
            Column::Enabled,
            Column::SyncMode,
            Column::Priority,
            Column::AccountIds,
            Column::Settings,
            Column::History,
            Column::UpdatedAt,
            Column::LastSync,
            Column::NextSync,
        ])
        .to_owned()
}

pub(crate) fn build_upsert(config: &BatchSyncConfig) -> Result<Insert<ActiveModel>> {
    let model = to_active_model(config)?;
    Ok(BatchSyncConfigEntity::insert(model).on_conflict(build_upsert_on_conflict()))
}

#[async_trait]
impl ConfigStore for DatabaseConfigStore {
    async fn save(&self, config: &BatchSyncConfig) -> Result<()> {
        build_upsert(config)?
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        BatchSyncConfigEntity::delete_by_id(id)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<BatchSyncConfig>> {
        let models = BatchSyncConfigEntity::find()
            .order_by_asc(Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        models
            .into_iter()
            .map(from_model)
            .collect::<std::result::Result<Vec<_>, StoreError>>()
    }
}
