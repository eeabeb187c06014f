//! Conversion between [`BatchSyncConfig`] and its stored row.

use chrono::Utc;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use super::Result;
use crate::entity::batch_sync_config::{ActiveModel, Model};
use crate::sync::{BatchSyncConfig, SyncConditions, SyncPolicy};

/// Policy fields without a column of their own, stored in `settings`.
///
/// Missing keys fall back to the policy defaults, so rows written by older
/// versions keep loading.
#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
struct StoredSettings {
    max_concurrent_accounts: usize,
    max_retries: u32,
    retry_delay_ms: u64,
    timeout_ms: u64,
    rate_limit_delay_ms: u64,
    conditions: SyncConditions,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self::from(&SyncPolicy::default())
    }
}

impl From<&SyncPolicy> for StoredSettings {
    fn from(policy: &SyncPolicy) -> Self {
        Self {
            max_concurrent_accounts: policy.max_concurrent_accounts,
            max_retries: policy.max_retries,
            retry_delay_ms: policy.retry_delay_ms,
            timeout_ms: policy.timeout_ms,
            rate_limit_delay_ms: policy.rate_limit_delay_ms,
            conditions: policy.conditions.clone(),
        }
    }
}

/// Convert a configuration to a fully-set active model.
pub fn to_active_model(config: &BatchSyncConfig) -> Result<ActiveModel> {
    Ok(ActiveModel {
        id: Set(config.id),
        name: Set(config.name.clone()),
        enabled: Set(config.enabled),
        sync_mode: Set(config.policy.sync_mode),
        priority: Set(config.policy.priority),
        account_ids: Set(serde_json::to_value(&config.account_ids)?),
        settings: Set(serde_json::to_value(StoredSettings::from(&config.policy))?),
        history: Set(serde_json::to_value(&config.sync_history)?),
        created_at: Set(config.created_at.fixed_offset()),
        updated_at: Set(config.updated_at.fixed_offset()),
        last_sync: Set(config.last_sync.map(|t| t.fixed_offset())),
        next_sync: Set(config.next_sync.map(|t| t.fixed_offset())),
    })
}

/// Rebuild a configuration from its stored row.
pub fn from_model(model: Model) -> Result<BatchSyncConfig> {
    let settings: StoredSettings = serde_json::from_value(model.settings)?;
    let policy = SyncPolicy {
        sync_mode: model.sync_mode,
        max_concurrent_accounts: settings.max_concurrent_accounts,
        max_retries: settings.max_retries,
        retry_delay_ms: settings.retry_delay_ms,
        timeout_ms: settings.timeout_ms,
        rate_limit_delay_ms: settings.rate_limit_delay_ms,
        priority: model.priority,
        conditions: settings.conditions,
    };

    Ok(BatchSyncConfig {
        id: model.id,
        name: model.name,
        account_ids: serde_json::from_value(model.account_ids)?,
        enabled: model.enabled,
        policy,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        last_sync: model.last_sync.map(|t| t.with_timezone(&Utc)),
        next_sync: model.next_sync.map(|t| t.with_timezone(&Utc)),
        sync_history: serde_json::from_value(model.history)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{BatchSyncResult, ConfigSpec, HISTORY_LIMIT, Priority, RunStatus, SyncMode};
    use sea_orm::ActiveValue;
    use serde_json::json;
    use std::time::Duration;

    fn unwrap_set<T: Clone + Into<sea_orm::Value>>(value: ActiveValue<T>) -> T {
        match value {
            ActiveValue::Set(v) | ActiveValue::Unchanged(v) => v,
            ActiveValue::NotSet => panic!("value not set"),
        }
    }

    fn model_of(config: &BatchSyncConfig) -> Model {
        let active = to_active_model(config).expect("encodes");
        Model {
            id: unwrap_set(active.id),
            name: unwrap_set(active.name),
            enabled: unwrap_set(active.enabled),
            sync_mode: unwrap_set(active.sync_mode),
            priority: unwrap_set(active.priority),
            account_ids: unwrap_set(active.account_ids),
            settings: unwrap_set(active.settings),
            history: unwrap_set(active.history),
            created_at: unwrap_set(active.created_at),
            updated_at: unwrap_set(active.updated_at),
            last_sync: unwrap_set(active.last_sync),
            next_sync: unwrap_set(active.next_sync),
        }
    }

    #[test]
    fn test_config_survives_a_trip_through_the_row() {
        let now = Utc::now();
        let mut conditions = SyncConditions {
            min_confidence: Some(0.5),
            ..SyncConditions::default()
        };
        conditions.extra.insert("region".into(), json!("eu"));
        let policy = SyncPolicy {
            sync_mode: SyncMode::Adaptive,
            max_concurrent_accounts: 8,
            priority: Priority::High,
            timeout_ms: 0,
            conditions,
            ..SyncPolicy::default()
        };
        let spec = ConfigSpec::new("nightly", ["b", "a", "b"]).with_policy(policy);
        let mut config = BatchSyncConfig::from_spec(spec, now);
        let mut result = BatchSyncResult::running(config.id, 3, false, now);
        result.terminate(RunStatus::Partial, now, Duration::from_millis(1_200));
        config.push_history(result, HISTORY_LIMIT);
        config.last_sync = Some(now);

        let restored = from_model(model_of(&config)).expect("decodes");

        assert_eq!(restored, config);
    }

    #[test]
    fn test_mode_and_priority_use_their_columns() {
        let config = BatchSyncConfig::from_spec(
            ConfigSpec::new("c", ["x"]).with_policy(SyncPolicy {
                sync_mode: SyncMode::Parallel,
                priority: Priority::Low,
                ..SyncPolicy::default()
            }),
            Utc::now(),
        );
        let model = model_of(&config);

        assert_eq!(model.sync_mode, SyncMode::Parallel);
        assert_eq!(model.priority, Priority::Low);
        assert!(model.settings.get("sync_mode").is_none());
        assert_eq!(model.account_ids, json!(["x"]));
    }

    #[test]
    fn test_missing_settings_fall_back_to_defaults() {
        let config = BatchSyncConfig::from_spec(ConfigSpec::new("c", ["x"]), Utc::now());
        let mut model = model_of(&config);
        model.settings = json!({ "max_retries": 7 });

        let restored = from_model(model).expect("decodes");

        assert_eq!(restored.policy.max_retries, 7);
        assert_eq!(
            restored.policy.max_concurrent_accounts,
            SyncPolicy::default().max_concurrent_accounts
        );
    }

    #[test]
    fn test_malformed_history_is_a_serialization_error() {
        let config = BatchSyncConfig::from_spec(ConfigSpec::new("c", ["x"]), Utc::now());
        let mut model = model_of(&config);
        model.history = json!({ "not": "an array" });

        let err = from_model(model).unwrap_err();
        assert!(matches!(err, super::super::StoreError::Serialization(_)));
    }
}
