//! Background loop draining the sync queue.
//!
//! At most one loop runs per engine. It starts on the first enqueue into an
//! idle engine and exits once the queue is empty. Each iteration sweeps stale
//! progress, then looks at the head entry:
//!
//! - missing or disabled configuration: the entry is dropped;
//! - configuration already running: dropped or requeued per [`BusyPolicy`];
//! - otherwise the entry is popped and executed to completion.
//!
//! Iterations are separated by `dispatch_interval_ms`.

use std::sync::atomic::Ordering;

use uuid::Uuid;

use super::BatchSyncEngine;
use crate::sync::{BusyPolicy, DropReason, ExecuteOptions, SyncEvent};

/// The dispatcher's decision for the head of the queue.
enum Dispatch {
    Run(Uuid),
    Dropped(Uuid, DropReason),
    Requeued(Uuid),
    Idle,
}

impl BatchSyncEngine {
    /// Whether a dispatcher loop is alive.
    #[must_use]
    pub fn is_dispatching(&self) -> bool {
        self.inner.dispatching.load(Ordering::Acquire)
    }

    /// Wait until the queue is empty and no dispatcher loop is running.
    ///
    /// Runs started directly through [`execute_now`](Self::execute_now) are
    /// not waited for.
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if !self.is_dispatching() && self.state().queue.is_empty() {
                return;
            }
            notified.await;
        }
    }

    /// Spawn the dispatcher unless one is already running.
    pub(crate) fn ensure_dispatcher(&self) {
        if self
            .inner
            .dispatching
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let engine = self.clone();
                handle.spawn(async move { engine.dispatch_loop().await });
            }
            Err(e) => {
                self.inner.dispatching.store(false, Ordering::Release);
                tracing::warn!(error = %e, "No async runtime; queued syncs wait for the next enqueue");
            }
        }
    }

    async fn dispatch_loop(self) {
        tracing::debug!("Dispatcher started");
        loop {
            self.sweep_stale_progress();

            match self.next_dispatch() {
                Dispatch::Run(id) => {
                    if let Err(e) = self.execute_now(id, ExecuteOptions::default()).await {
                        tracing::warn!(config_id = %id, error = %e, "Queued sync failed to start");
                    }
                }
                Dispatch::Dropped(id, reason) => {
                    tracing::info!(config_id = %id, %reason, "Dropped queued sync");
                    self.emit(SyncEvent::QueueDropped {
                        config_id: id,
                        reason,
                    });
                }
                Dispatch::Requeued(id) => {
                    tracing::debug!(config_id = %id, "Requeued busy configuration");
                }
                Dispatch::Idle => {
                    self.inner.dispatching.store(false, Ordering::Release);
                    // An enqueue may have slipped in between the empty check and the flag reset.
                    let pending = !self.state().queue.is_empty();
                    if pending
                        && self
                            .inner
                            .dispatching
                            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                            .is_ok()
                    {
                        continue;
                    }
                    self.inner.idle.notify_waiters();
                    tracing::debug!("Dispatcher idle");
                    return;
                }
            }

            self.inner
                .clock
                .sleep(self.inner.options.dispatch_interval())
                .await;
        }
    }

    fn next_dispatch(&self) -> Dispatch {
        let now = self.inner.clock.now();
        let mut state = self.state();
        let Some(head) = state.queue.peek().cloned() else {
            return Dispatch::Idle;
        };
        let id = head.config_id;
        let enabled = state.configs.get(&id).map(|c| c.enabled);
        let busy = state.active.contains_key(&id);

        let reason = match enabled {
            None => Some(DropReason::Missing),
            Some(false) => Some(DropReason::Disabled),
            Some(true) if busy => {
                if self.inner.options.busy_policy == BusyPolicy::Requeue {
                    state.queue.pop();
                    state.queue.upsert(id, head.priority, now);
                    return Dispatch::Requeued(id);
                }
                Some(DropReason::Busy)
            }
            Some(true) => None,
        };

        state.queue.pop();
        match reason {
            Some(reason) => Dispatch::Dropped(id, reason),
            None => Dispatch::Run(id),
        }
    }
}
