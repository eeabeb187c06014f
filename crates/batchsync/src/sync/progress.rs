//! Live progress records for running configurations.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

use super::types::RunStatus;

/// Snapshot of one running configuration. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncProgress {
    pub batch_config_id: Uuid,
    pub run_id: Uuid,
    pub status: RunStatus,
    /// Percent complete, 0 to 100.
    pub progress: u8,
    pub current_account: Option<String>,
    pub processed_accounts: usize,
    pub total_accounts: usize,
    /// Present once at least one account has been processed.
    pub estimated_time_remaining_ms: Option<u64>,
    pub start_time: DateTime<Utc>,
}

struct Entry {
    snapshot: SyncProgress,
    started: Instant,
}

/// Progress records keyed by configuration id.
///
/// Each record belongs to one run; updates carrying another run's id are
/// ignored, so a cancelled run still draining its last chunk cannot
/// overwrite the record of a newer run of the same configuration.
#[derive(Default)]
pub struct ProgressTracker {
    entries: Mutex<HashMap<Uuid, Entry>>,
}

impl ProgressTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) the record for a starting run.
    pub fn start(
        &self,
        config_id: Uuid,
        run_id: Uuid,
        total_accounts: usize,
        start_time: DateTime<Utc>,
        started: Instant,
    ) {
        let snapshot = SyncProgress {
            batch_config_id: config_id,
            run_id,
            status: RunStatus::Running,
            progress: 0,
            current_account: None,
            processed_accounts: 0,
            total_accounts,
            estimated_time_remaining_ms: None,
            start_time,
        };
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(config_id, Entry { snapshot, started });
    }

    /// Note the account a run is working on.
    pub fn set_current(&self, config_id: Uuid, run_id: Uuid, account_id: Option<&str>) {
        self.with_entry(config_id, run_id, |entry| {
            entry.snapshot.current_account = account_id.map(str::to_string);
        });
    }

    /// Record a chunk boundary: recompute percent complete and ETA.
    pub fn record(&self, config_id: Uuid, run_id: Uuid, processed: usize, now: Instant) {
        self.with_entry(config_id, run_id, |entry| {
            let total = entry.snapshot.total_accounts;
            let elapsed = now.saturating_duration_since(entry.started);

            entry.snapshot.processed_accounts = processed;
            entry.snapshot.progress = percent(processed, total);
            entry.snapshot.estimated_time_remaining_ms = eta(processed, total, elapsed)
                .map(|remaining| remaining.as_millis() as u64);
        });
    }

    /// Remove a run's record. Returns the final snapshot if it was present.
    pub fn finish(&self, config_id: Uuid, run_id: Uuid) -> Option<SyncProgress> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(&config_id) {
            Some(entry) if entry.snapshot.run_id == run_id => {
                entries.remove(&config_id).map(|e| e.snapshot)
            }
            _ => None,
        }
    }

    /// Remove a configuration's record whatever run owns it.
    pub fn remove(&self, config_id: Uuid) -> Option<SyncProgress> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&config_id).map(|e| e.snapshot)
    }

    #[must_use]
    pub fn get(&self, config_id: Uuid) -> Option<SyncProgress> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&config_id).map(|e| e.snapshot.clone())
    }

    /// All records, oldest start first.
    #[must_use]
    pub fn all(&self) -> Vec<SyncProgress> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut all: Vec<_> = entries.values().map(|e| e.snapshot.clone()).collect();
        all.sort_by_key(|p| p.start_time);
        all
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop records whose start time is older than `max_age`.
    ///
    /// Returns the ids of purged configurations.
    pub fn purge_stale(&self, now: DateTime<Utc>, max_age: Duration) -> Vec<Uuid> {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let stale: Vec<Uuid> = entries
            .iter()
            .filter(|(_, e)| now.signed_duration_since(e.snapshot.start_time) > max_age)
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            entries.remove(id);
        }
        stale
    }

    fn with_entry(&self, config_id: Uuid, run_id: Uuid, update: impl FnOnce(&mut Entry)) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get_mut(&config_id)
            && entry.snapshot.run_id == run_id
        {
            update(entry);
        }
    }
}

/// `round(processed / total × 100)`, zero for an empty run.
fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (processed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

/// `(total - processed) × (elapsed / processed)`, once anything is processed.
fn eta(processed: usize, total: usize, elapsed: Duration) -> Option<Duration> {
    if processed == 0 {
        return None;
    }
    let remaining = total.saturating_sub(processed) as f64;
    let per_account = elapsed.as_secs_f64() / processed as f64;
    Some(Duration::from_secs_f64(remaining * per_account))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_and_handles_empty_runs() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(3, 3), 100);
    }

    #[test]
    fn eta_is_linear_in_remaining_accounts() {
        assert_eq!(eta(0, 10, Duration::from_secs(5)), None);
        assert_eq!(
            eta(2, 10, Duration::from_secs(4)),
            Some(Duration::from_secs(16))
        );
        assert_eq!(eta(10, 10, Duration::from_secs(4)), Some(Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn record_updates_percent_and_eta() {
        let tracker = ProgressTracker::new();
        let (config_id, run_id) = (Uuid::new_v4(), Uuid::new_v4());
        let started = Instant::now();
        tracker.start(config_id, run_id, 4, Utc::now(), started);

        tracker.set_current(config_id, run_id, Some("acct-1"));
        tracker.record(config_id, run_id, 1, started + Duration::from_secs(3));

        let snapshot = tracker.get(config_id).expect("record exists");
        assert_eq!(snapshot.progress, 25);
        assert_eq!(snapshot.processed_accounts, 1);
        assert_eq!(snapshot.current_account.as_deref(), Some("acct-1"));
        assert_eq!(snapshot.estimated_time_remaining_ms, Some(9_000));
    }

    #[test]
    fn updates_from_another_run_are_ignored() {
        let tracker = ProgressTracker::new();
        let config_id = Uuid::new_v4();
        let (old_run, new_run) = (Uuid::new_v4(), Uuid::new_v4());
        tracker.start(config_id, new_run, 2, Utc::now(), Instant::now());

        tracker.record(config_id, old_run, 2, Instant::now());
        assert!(tracker.finish(config_id, old_run).is_none());

        let snapshot = tracker.get(config_id).expect("newer run still tracked");
        assert_eq!(snapshot.processed_accounts, 0);
        assert!(tracker.finish(config_id, new_run).is_some());
        assert!(tracker.is_empty());
    }

    #[test]
    fn purge_stale_removes_only_old_records() {
        let tracker = ProgressTracker::new();
        let now = Utc::now();
        let (old, fresh) = (Uuid::new_v4(), Uuid::new_v4());
        tracker.start(
            old,
            Uuid::new_v4(),
            1,
            now - chrono::Duration::minutes(61),
            Instant::now(),
        );
        tracker.start(
            fresh,
            Uuid::new_v4(),
            1,
            now - chrono::Duration::minutes(59),
            Instant::now(),
        );

        let purged = tracker.purge_stale(now, Duration::from_secs(3_600));

        assert_eq!(purged, vec![old]);
        assert!(tracker.get(old).is_none());
        assert!(tracker.get(fresh).is_some());
    }

    #[test]
    fn all_is_ordered_by_start_time() {
        let tracker = ProgressTracker::new();
        let now = Utc::now();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        tracker.start(b, Uuid::new_v4(), 1, now, Instant::now());
        tracker.start(a, Uuid::new_v4(), 1, now - chrono::Duration::seconds(5), Instant::now());

        let ids: Vec<_> = tracker.all().iter().map(|p| p.batch_config_id).collect();
        assert_eq!(ids, vec![a, b]);
    }
}
