//! Progress reporting for sync runs.
//!
//! This module provides two modes of progress reporting:
//! - Interactive mode (TTY): Animated progress bars using indicatif
//! - Logging mode (non-TTY): Structured logging using tracing
//!
//! Both consume the engine's [`SyncEvent`] stream. Interactive mode keeps one
//! bar per running configuration.

mod interactive;
mod logging;

use std::collections::HashMap;
use std::sync::Arc;

use batchsync::sync::{BatchSyncConfig, SyncEvent};
use console::Term;
use uuid::Uuid;

pub(crate) use interactive::InteractiveReporter;
pub(crate) use logging::LoggingReporter;

/// Progress reporter that handles both interactive and logging modes.
pub(crate) enum ProgressReporter {
    /// Interactive progress bars for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub(crate) fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    /// Handle a sync event.
    pub(crate) fn handle(&self, event: SyncEvent) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Register display names for configurations that may run.
    pub(crate) fn register_configs<'a>(&self, configs: impl IntoIterator<Item = &'a BatchSyncConfig>) {
        if let Self::Interactive(r) = self {
            r.register_names(
                configs
                    .into_iter()
                    .map(|c| (c.id, c.name.clone()))
                    .collect::<HashMap<Uuid, String>>(),
            );
        }
    }

    /// Build an event callback for the engine builder.
    pub(crate) fn as_callback(self: &Arc<Self>) -> impl Fn(SyncEvent) + Send + Sync + 'static {
        let reporter = Arc::clone(self);
        move |event| reporter.handle(event)
    }

    /// Print a line without tearing progress bars.
    pub(crate) fn println(&self, line: impl AsRef<str>) {
        match self {
            Self::Interactive(r) => r.println(line.as_ref()),
            Self::Logging(_) => println!("{}", line.as_ref()),
        }
    }

    /// Finish all progress bars (interactive mode only).
    pub(crate) fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
