use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{ConfigStore, Result};
use crate::sync::BatchSyncConfig;

/// Mutex-guarded in-process store.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    configs: Mutex<HashMap<Uuid, BatchSyncConfig>>,
}

impl MemoryConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store, as if each configuration had been saved.
    pub fn with_configs(configs: impl IntoIterator<Item = BatchSyncConfig>) -> Self {
        let store = Self::new();
        {
            let mut map = store.configs.lock().unwrap_or_else(|e| e.into_inner());
            for config in configs {
                map.insert(config.id, config);
            }
        }
        store
    }

    /// Current stored copy of a configuration.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<BatchSyncConfig> {
        let map = self.configs.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.configs.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn save(&self, config: &BatchSyncConfig) -> Result<()> {
        let mut map = self.configs.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(config.id, config.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut map = self.configs.lock().unwrap_or_else(|e| e.into_inner());
        map.remove(&id);
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<BatchSyncConfig>> {
        let map = self.configs.lock().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<_> = map.values().cloned().collect();
        all.sort_by_key(|c| c.created_at);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::ConfigSpec;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn save_replaces_and_delete_removes() {
        let store = MemoryConfigStore::new();
        let mut config = BatchSyncConfig::from_spec(ConfigSpec::new("a", ["x"]), Utc::now());

        store.save(&config).await.unwrap();
        config.name = "renamed".to_string();
        store.save(&config).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.get(config.id).unwrap().name, "renamed");

        store.delete(config.id).await.unwrap();
        store.delete(config.id).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn load_all_is_ordered_by_creation() {
        let now = Utc::now();
        let newer = BatchSyncConfig::from_spec(ConfigSpec::new("newer", ["x"]), now);
        let older = BatchSyncConfig::from_spec(
            ConfigSpec::new("older", ["y"]),
            now - Duration::minutes(5),
        );
        let store = MemoryConfigStore::with_configs([newer, older]);

        let names: Vec<_> = store
            .load_all()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["older", "newer"]);
    }
}
