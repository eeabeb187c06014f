//! Engine-wide and per-configuration statistics computed from history.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::types::{BatchSyncConfig, BatchSyncResult, RunStatus};

/// Aggregate statistics across every configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineStats {
    pub total_configs: usize,
    pub enabled_configs: usize,
    /// Results recorded in all histories.
    pub total_syncs: usize,
    /// Results whose start time falls on the current UTC day.
    pub syncs_today: usize,
    /// Completed results / all results × 100.
    pub success_rate: f64,
    pub average_processing_time_ms: f64,
    /// Sum of successful accounts over all results.
    pub total_accounts_synced: usize,
    pub total_items_updated: u64,
    pub running_syncs: usize,
    pub queued_syncs: usize,
}

/// Statistics for one configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigStats {
    pub config_id: Uuid,
    pub name: String,
    pub total_runs: usize,
    pub completed: usize,
    pub partial: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub success_rate: f64,
    pub average_processing_time_ms: f64,
    pub average_accounts_per_minute: f64,
    pub last_status: Option<RunStatus>,
    pub last_sync: Option<DateTime<Utc>>,
    pub running: bool,
    /// 1-based queue position, if queued.
    pub queue_position: Option<usize>,
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn average_processing_time_ms<'a>(results: impl Iterator<Item = &'a BatchSyncResult>) -> f64 {
    let (sum, count) = results
        .filter_map(|r| r.processing_time_ms)
        .fold((0u64, 0usize), |(sum, count), ms| (sum + ms, count + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Compute engine-wide statistics.
///
/// `running` and `queued` come from live engine state, everything else from
/// the configurations' histories.
pub fn engine_stats<'a>(
    configs: impl IntoIterator<Item = &'a BatchSyncConfig>,
    running: usize,
    queued: usize,
    now: DateTime<Utc>,
) -> EngineStats {
    let today = now.date_naive();
    let mut stats = EngineStats {
        running_syncs: running,
        queued_syncs: queued,
        ..EngineStats::default()
    };
    let mut completed = 0usize;
    let mut results: Vec<&BatchSyncResult> = Vec::new();

    for config in configs {
        stats.total_configs += 1;
        if config.enabled {
            stats.enabled_configs += 1;
        }
        for result in &config.sync_history {
            if result.start_time.date_naive() == today {
                stats.syncs_today += 1;
            }
            if result.status == RunStatus::Completed {
                completed += 1;
            }
            stats.total_accounts_synced += result.successful_accounts;
            stats.total_items_updated += result.items.updated;
            results.push(result);
        }
    }

    stats.total_syncs = results.len();
    stats.success_rate = percent(completed, results.len());
    stats.average_processing_time_ms = average_processing_time_ms(results.into_iter());
    stats
}

/// Compute statistics for one configuration.
pub fn config_stats(
    config: &BatchSyncConfig,
    running: bool,
    queue_position: Option<usize>,
) -> ConfigStats {
    let history = &config.sync_history;
    let count = |status: RunStatus| history.iter().filter(|r| r.status == status).count();
    let completed = count(RunStatus::Completed);

    let rates: Vec<f64> = history
        .iter()
        .filter(|r| r.processed_accounts > 0)
        .map(|r| r.summary.accounts_per_minute)
        .collect();
    let average_accounts_per_minute = if rates.is_empty() {
        0.0
    } else {
        rates.iter().sum::<f64>() / rates.len() as f64
    };

    ConfigStats {
        config_id: config.id,
        name: config.name.clone(),
        total_runs: history.len(),
        completed,
        partial: count(RunStatus::Partial),
        failed: count(RunStatus::Failed),
        cancelled: count(RunStatus::Cancelled),
        success_rate: percent(completed, history.len()),
        average_processing_time_ms: average_processing_time_ms(history.iter()),
        average_accounts_per_minute,
        last_status: config.last_result().map(|r| r.status),
        last_sync: config.last_sync,
        running,
        queue_position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{ConfigSpec, HISTORY_LIMIT};
    use std::time::Duration;

    fn result_with(
        config: &BatchSyncConfig,
        status: RunStatus,
        start: DateTime<Utc>,
        ms: u64,
    ) -> BatchSyncResult {
        let mut result = BatchSyncResult::running(config.id, 2, false, start);
        result.terminate(status, start, Duration::from_millis(ms));
        result.processed_accounts = 2;
        result.successful_accounts = if status == RunStatus::Completed { 2 } else { 1 };
        result.items.updated = 5;
        result.summary.accounts_per_minute = 10.0;
        result
    }

    #[test]
    fn engine_stats_aggregates_histories_and_live_counts() {
        let now = Utc::now();
        let mut a = BatchSyncConfig::from_spec(ConfigSpec::new("a", ["x"]), now);
        let b = BatchSyncConfig::from_spec(ConfigSpec::new("b", ["y"]).disabled(), now);

        let completed = result_with(&a, RunStatus::Completed, now, 100);
        let partial = result_with(&a, RunStatus::Partial, now - chrono::Duration::days(2), 300);
        a.push_history(completed, HISTORY_LIMIT);
        a.push_history(partial, HISTORY_LIMIT);

        let stats = engine_stats([&a, &b], 1, 3, now);

        assert_eq!(stats.total_configs, 2);
        assert_eq!(stats.enabled_configs, 1);
        assert_eq!(stats.total_syncs, 2);
        assert_eq!(stats.syncs_today, 1);
        assert!((stats.success_rate - 50.0).abs() < 1e-9);
        assert!((stats.average_processing_time_ms - 200.0).abs() < 1e-9);
        assert_eq!(stats.total_accounts_synced, 3);
        assert_eq!(stats.total_items_updated, 10);
        assert_eq!(stats.running_syncs, 1);
        assert_eq!(stats.queued_syncs, 3);
    }

    #[test]
    fn engine_stats_without_history_has_zero_rates() {
        let stats = engine_stats(std::iter::empty(), 0, 0, Utc::now());
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.average_processing_time_ms, 0.0);
    }

    #[test]
    fn config_stats_counts_by_status() {
        let now = Utc::now();
        let mut config = BatchSyncConfig::from_spec(ConfigSpec::new("c", ["x"]), now);
        for status in [
            RunStatus::Completed,
            RunStatus::Failed,
            RunStatus::Cancelled,
            RunStatus::Completed,
        ] {
            let result = result_with(&config, status, now, 50);
            config.push_history(result, HISTORY_LIMIT);
        }

        let stats = config_stats(&config, true, Some(2));

        assert_eq!(stats.total_runs, 4);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.cancelled, 1);
        assert_eq!(stats.partial, 0);
        assert!((stats.success_rate - 50.0).abs() < 1e-9);
        assert!((stats.average_accounts_per_minute - 10.0).abs() < 1e-9);
        assert_eq!(stats.last_status, Some(RunStatus::Completed));
        assert!(stats.running);
        assert_eq!(stats.queue_position, Some(2));
    }
}
