//! Create the `batch_sync_configs` table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BatchSyncConfigs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BatchSyncConfigs::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BatchSyncConfigs::Name).string().not_null())
                    .col(
                        ColumnDef::new(BatchSyncConfigs::Enabled)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    // Policy
                    .col(
                        ColumnDef::new(BatchSyncConfigs::SyncMode)
                            .string()
                            .not_null()
                            .default("sequential"),
                    )
                    .col(
                        ColumnDef::new(BatchSyncConfigs::Priority)
                            .string()
                            .not_null()
                            .default("medium"),
                    )
                    .col(
                        ColumnDef::new(BatchSyncConfigs::AccountIds)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    .col(
                        ColumnDef::new(BatchSyncConfigs::Settings)
                            .json()
                            .not_null()
                            .default(Expr::cust("'{}'")),
                    )
                    // History
                    .col(
                        ColumnDef::new(BatchSyncConfigs::History)
                            .json()
                            .not_null()
                            .default(Expr::cust("'[]'")),
                    )
                    // Timestamps
                    .col(
                        ColumnDef::new(BatchSyncConfigs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BatchSyncConfigs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(BatchSyncConfigs::LastSync)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(BatchSyncConfigs::NextSync)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_batch_sync_configs_name")
                    .table(BatchSyncConfigs::Table)
                    .col(BatchSyncConfigs::Name)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BatchSyncConfigs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BatchSyncConfigs {
    Table,
    Id,
    Name,
    Enabled,
    SyncMode,
    Priority,
    AccountIds,
    Settings,
    History,
    CreatedAt,
    UpdatedAt,
    LastSync,
    NextSync,
}
