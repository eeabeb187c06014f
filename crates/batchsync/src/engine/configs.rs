//! Configuration CRUD and read-only accessors.

use uuid::Uuid;

use super::BatchSyncEngine;
use crate::error::{EngineError, Result};
use crate::sync::{
    BatchSyncConfig, BatchSyncResult, ConfigPatch, ConfigSpec, ConfigStats, EngineStats,
    QueuedSync, SyncEvent, SyncPolicy, SyncProgress, stats,
};

fn validate(name: &str, policy: &SyncPolicy) -> Result<()> {
    if name.trim().is_empty() {
        return Err(EngineError::invalid("name must not be empty"));
    }
    if policy.max_concurrent_accounts == 0 {
        return Err(EngineError::invalid(
            "max_concurrent_accounts must be at least 1",
        ));
    }
    Ok(())
}

impl BatchSyncEngine {
    // ─── CRUD ────────────────────────────────────────────────────────────────

    /// Register a new configuration and persist it.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::InvalidConfig` for an empty name or a zero
    /// concurrency bound.
    pub async fn create_config(&self, spec: ConfigSpec) -> Result<BatchSyncConfig> {
        validate(&spec.name, &spec.policy)?;
        let config = BatchSyncConfig::from_spec(spec, self.inner.clock.now());

        self.state().configs.insert(config.id, config.clone());
        tracing::info!(
            config_id = %config.id,
            name = %config.name,
            accounts = config.account_ids.len(),
            mode = %config.policy.sync_mode,
            "Created configuration"
        );

        self.persist(config.id).await;
        Ok(config)
    }

    /// Merge a partial update into a configuration.
    ///
    /// A run already in progress keeps the settings it started with.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` for an unknown id and
    /// `EngineError::InvalidConfig` if the merged configuration is invalid.
    pub async fn update_config(&self, id: Uuid, patch: ConfigPatch) -> Result<BatchSyncConfig> {
        let now = self.inner.clock.now();
        let updated = {
            let mut state = self.state();
            let config = state
                .configs
                .get_mut(&id)
                .ok_or(EngineError::NotFound { id })?;

            let mut candidate = config.clone();
            patch.apply_to(&mut candidate);
            validate(&candidate.name, &candidate.policy)?;
            candidate.updated_at = now;

            *config = candidate.clone();
            candidate
        };

        tracing::info!(config_id = %id, "Updated configuration");
        self.persist(id).await;
        Ok(updated)
    }

    /// Remove a configuration, cancelling its active run first.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` for an unknown id.
    pub async fn delete_config(&self, id: Uuid) -> Result<()> {
        let cancelled_run = {
            let mut state = self.state();
            if state.configs.remove(&id).is_none() {
                return Err(EngineError::NotFound { id });
            }
            state.queue.remove(id);
            state.active.remove(&id).map(|run| {
                run.cancel.cancel();
                run.result.id
            })
        };
        self.inner.progress.remove(id);

        if let Some(run_id) = cancelled_run {
            tracing::info!(config_id = %id, %run_id, "Cancelled run of deleted configuration");
            self.emit(SyncEvent::RunCancelled {
                config_id: id,
                run_id,
            });
        }
        tracing::info!(config_id = %id, "Deleted configuration");

        self.persist_delete(id).await;
        Ok(())
    }

    /// Populate the registry from the attached store.
    ///
    /// Stored configurations replace in-memory ones with the same id.
    /// Returns the number loaded; zero without a store.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Store` if the store cannot be read.
    pub async fn load_from_store(&self) -> Result<usize> {
        let Some(store) = &self.inner.store else {
            return Ok(0);
        };
        let configs = store.load_all().await?;
        let count = configs.len();

        let mut state = self.state();
        for config in configs {
            state.configs.insert(config.id, config);
        }
        drop(state);

        tracing::debug!(count, "Loaded configurations from store");
        Ok(count)
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn get_config(&self, id: Uuid) -> Option<BatchSyncConfig> {
        self.state().configs.get(&id).cloned()
    }

    /// All configurations, oldest first.
    #[must_use]
    pub fn get_configs(&self) -> Vec<BatchSyncConfig> {
        let mut configs: Vec<_> = self.state().configs.values().cloned().collect();
        configs.sort_by_key(|c| (c.created_at, c.id));
        configs
    }

    /// Results of the runs currently in progress, oldest first.
    #[must_use]
    pub fn get_running_results(&self) -> Vec<BatchSyncResult> {
        let mut results: Vec<_> = self
            .state()
            .active
            .values()
            .map(|run| run.result.clone())
            .collect();
        results.sort_by_key(|r| r.start_time);
        results
    }

    #[must_use]
    pub fn is_running(&self, id: Uuid) -> bool {
        self.state().active.contains_key(&id)
    }

    /// Pending queue entries in dispatch order, with 1-based positions.
    #[must_use]
    pub fn get_queue_snapshot(&self) -> Vec<QueuedSync> {
        self.state().queue.snapshot()
    }

    #[must_use]
    pub fn get_progress(&self, id: Uuid) -> Option<SyncProgress> {
        self.inner.progress.get(id)
    }

    #[must_use]
    pub fn get_all_progress(&self) -> Vec<SyncProgress> {
        self.inner.progress.all()
    }

    /// Drop progress records older than `progress_max_age_secs`.
    ///
    /// The dispatcher does this on every iteration; callers that never
    /// enqueue can call it themselves.
    pub fn sweep_stale_progress(&self) -> Vec<Uuid> {
        let purged = self
            .inner
            .progress
            .purge_stale(self.inner.clock.now(), self.inner.options.progress_max_age());
        if !purged.is_empty() {
            tracing::warn!(count = purged.len(), "Purged stale progress records");
        }
        purged
    }

    // ─── Statistics ──────────────────────────────────────────────────────────

    #[must_use]
    pub fn get_stats(&self) -> EngineStats {
        let now = self.inner.clock.now();
        let state = self.state();
        stats::engine_stats(
            state.configs.values(),
            state.active.len(),
            state.queue.len(),
            now,
        )
    }

    /// Run history statistics for one configuration.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` for an unknown id.
    pub fn get_config_stats(&self, id: Uuid) -> Result<ConfigStats> {
        let state = self.state();
        let config = state.configs.get(&id).ok_or(EngineError::NotFound { id })?;
        let position = state
            .queue
            .snapshot()
            .into_iter()
            .find(|q| q.config_id == id)
            .map(|q| q.position);
        Ok(stats::config_stats(
            config,
            state.active.contains_key(&id),
            position,
        ))
    }
}
