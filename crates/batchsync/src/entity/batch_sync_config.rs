//! BatchSyncConfig entity - persisted sync configurations with their run history.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::priority::Priority;
use crate::entity::sync_mode::SyncMode;

/// Stored form of a [`BatchSyncConfig`](crate::sync::BatchSyncConfig).
///
/// Mode and priority get their own columns so they can be filtered on; the
/// rest of the policy and the bounded history are kept as JSON.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batch_sync_configs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    #[sea_orm(default_value = true)]
    pub enabled: bool,

    // ─── Policy ──────────────────────────────────────────────────────────────
    pub sync_mode: SyncMode,
    pub priority: Priority,
    /// Ordered account ids (JSON array of strings).
    #[sea_orm(column_type = "Json")]
    pub account_ids: serde_json::Value,
    /// Retry, timeout, pacing and conditions (JSON object).
    #[sea_orm(column_type = "Json")]
    pub settings: serde_json::Value,

    // ─── History ─────────────────────────────────────────────────────────────
    /// Most recent results, oldest first (JSON array).
    #[sea_orm(column_type = "Json")]
    pub history: serde_json::Value,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
    pub last_sync: Option<DateTimeWithTimeZone>,
    pub next_sync: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
