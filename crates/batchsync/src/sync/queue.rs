//! Priority queue of pending sync requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::Priority;

/// What the dispatcher does with an entry whose configuration is already running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusyPolicy {
    /// Discard the entry.
    #[default]
    Drop,
    /// Put the entry back at the tail of its priority band.
    Requeue,
}

impl std::str::FromStr for BusyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "drop" => Ok(BusyPolicy::Drop),
            "requeue" => Ok(BusyPolicy::Requeue),
            _ => Err(format!("Unknown busy policy: {}", s)),
        }
    }
}

/// One pending request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueEntry {
    pub config_id: Uuid,
    pub priority: Priority,
    pub enqueued_at: DateTime<Utc>,
    /// Insertion counter, breaks ties between identical timestamps.
    #[serde(skip)]
    seq: u64,
}

/// Queue entry as reported to callers, with its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedSync {
    pub position: usize,
    pub config_id: Uuid,
    pub priority: Priority,
    pub enqueued_at: DateTime<Utc>,
}

/// Ordered by `(priority desc, enqueued_at asc)`, at most one entry per configuration.
#[derive(Debug, Default)]
pub struct SyncQueue {
    entries: Vec<QueueEntry>,
    next_seq: u64,
}

impl SyncQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a request, or re-prioritize and re-stamp an existing one.
    ///
    /// Returns `true` if the configuration was not queued before.
    pub fn upsert(&mut self, config_id: Uuid, priority: Priority, now: DateTime<Utc>) -> bool {
        let seq = self.next_seq;
        self.next_seq += 1;

        let inserted = match self.entries.iter_mut().find(|e| e.config_id == config_id) {
            Some(entry) => {
                entry.priority = priority;
                entry.enqueued_at = now;
                entry.seq = seq;
                false
            }
            None => {
                self.entries.push(QueueEntry {
                    config_id,
                    priority,
                    enqueued_at: now,
                    seq,
                });
                true
            }
        };

        self.sort();
        inserted
    }

    /// Head of the queue without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&QueueEntry> {
        self.entries.first()
    }

    pub fn pop(&mut self) -> Option<QueueEntry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Remove a configuration's entry. Returns `true` if one was queued.
    pub fn remove(&mut self, config_id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.config_id != config_id);
        self.entries.len() != before
    }

    #[must_use]
    pub fn contains(&self, config_id: Uuid) -> bool {
        self.entries.iter().any(|e| e.config_id == config_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in dispatch order with 1-based positions.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QueuedSync> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| QueuedSync {
                position: i + 1,
                config_id: e.config_id,
                priority: e.priority,
                enqueued_at: e.enqueued_at,
            })
            .collect()
    }

    fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            b.priority
                .weight()
                .cmp(&a.priority.weight())
                .then(a.enqueued_at.cmp(&b.enqueued_at))
                .then(a.seq.cmp(&b.seq))
        });
    }
}
