use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use batchsync::sync::{AccountStatus, RunStatus, SyncEvent};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use uuid::Uuid;

/// Consolidated progress state to avoid multiple mutex locks.
#[derive(Default)]
struct ProgressState {
    /// Display names by configuration id.
    names: HashMap<Uuid, String>,
    /// One bar per running configuration.
    bars: HashMap<Uuid, ProgressBar>,
}

/// Interactive progress reporter using indicatif.
pub(crate) struct InteractiveReporter {
    multi: MultiProgress,
    state: Mutex<ProgressState>,
}

impl InteractiveReporter {
    pub(crate) fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            state: Mutex::new(ProgressState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn register_names(&self, names: HashMap<Uuid, String>) {
        self.state().names.extend(names);
    }

    pub(crate) fn println(&self, line: &str) {
        self.multi.println(line).ok();
    }

    pub(crate) fn handle(&self, event: SyncEvent) {
        let mut state = self.state();

        match event {
            SyncEvent::RunStarted {
                config_id,
                total_accounts,
                mode,
                ..
            } => {
                let label = state
                    .names
                    .get(&config_id)
                    .cloned()
                    .unwrap_or_else(|| short_id(config_id));
                let pb = self.multi.add(ProgressBar::new(total_accounts as u64));
                pb.set_style(Self::bar_style());
                pb.set_prefix(format!("{:16}", truncate(&label, 16)));
                pb.set_message(format!("Starting ({})...", mode));
                state.bars.insert(config_id, pb);
            }

            SyncEvent::ChunkStarted {
                config_id,
                size,
                concurrent,
                ..
            } => {
                if let Some(pb) = state.bars.get(&config_id)
                    && concurrent
                {
                    pb.set_message(format!("{} accounts in parallel", size));
                }
            }

            SyncEvent::AccountRetry {
                config_id,
                account_id,
                attempt,
                retry_in_ms,
                ..
            } => {
                if let Some(pb) = state.bars.get(&config_id) {
                    pb.set_message(format!(
                        "⏳ {} failed attempt {}, retry in {:.1}s",
                        account_id,
                        attempt,
                        retry_in_ms as f64 / 1000.0
                    ));
                }
            }

            SyncEvent::AccountFinished {
                config_id,
                account_id,
                status,
                ..
            } => {
                if let Some(pb) = state.bars.get(&config_id) {
                    pb.inc(1);
                    let symbol = match status {
                        AccountStatus::Completed => "✓",
                        AccountStatus::Skipped => "·",
                        _ => "✗",
                    };
                    pb.set_message(format!("{} {}", symbol, account_id));
                }
            }

            SyncEvent::AdaptiveResized {
                config_id,
                from,
                to,
                accounts_per_minute,
                ..
            } => {
                if let Some(pb) = state.bars.get(&config_id) {
                    pb.set_message(format!(
                        "chunk {} → {} ({:.1}/min)",
                        from, to, accounts_per_minute
                    ));
                }
            }

            SyncEvent::RunFinished {
                config_id,
                status,
                successful,
                failed,
                skipped,
                ..
            } => {
                if let Some(pb) = state.bars.remove(&config_id) {
                    let symbol = if status == RunStatus::Completed {
                        "✓"
                    } else {
                        "✗"
                    };
                    let msg = if skipped > 0 {
                        format!(
                            "{} {}: {} ok, {} failed, {} skipped",
                            symbol, status, successful, failed, skipped
                        )
                    } else {
                        format!("{} {}: {} ok, {} failed", symbol, status, successful, failed)
                    };
                    pb.finish_with_message(msg);
                }
            }

            SyncEvent::RunCancelled { config_id, .. } => {
                if let Some(pb) = state.bars.remove(&config_id) {
                    pb.abandon_with_message("✗ cancelled");
                }
            }

            SyncEvent::StrategyFailed {
                config_id, error, ..
            } => {
                if let Some(pb) = state.bars.remove(&config_id) {
                    pb.abandon_with_message(format!("✗ {}", error));
                }
            }

            SyncEvent::QueueDropped { config_id, reason } => {
                let label = state
                    .names
                    .get(&config_id)
                    .cloned()
                    .unwrap_or_else(|| short_id(config_id));
                // Release lock before printing to avoid holding it during I/O
                drop(state);
                self.multi
                    .println(format!("⚠ Skipped queued sync '{}': {}", label, reason))
                    .ok();
            }

            _ => {}
        }
    }

    /// Finish all progress bars.
    pub(crate) fn finish(&self) {
        let mut state = self.state();
        for (_, pb) in state.bars.drain() {
            if !pb.is_finished() {
                pb.finish();
            }
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos:>3}/{len:3} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░")
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}

fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

fn truncate(label: &str, width: usize) -> String {
    if label.chars().count() <= width {
        label.to_string()
    } else {
        let mut out: String = label.chars().take(width - 1).collect();
        out.push('…');
        out
    }
}
