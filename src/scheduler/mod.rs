//! Background reminder delivery.
//!
//! The scheduler wakes every `interval`, asks the store for due reminders and
//! hands each one to a [`Deliver`] implementation. Before delivering, the
//! task is claimed with [`TaskStore::claim_reminder`], which re-checks it
//! under the file lock and sets `notified` in the same transaction. Only the
//! claimant delivers, so a reminder fires at most once even when several
//! processes poll the same file. Whether delivery then succeeds does not
//! matter. If the claim fails with a store error nothing is delivered and the
//! task is retried on the next poll.

pub mod delivery;

pub use delivery::{Deliver, DeliveryOutcome, Notifier, TerminalTarget};

use crate::error::ErrorCode;
use crate::store::TaskStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default time between polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// What a single poll did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Tasks found due.
    pub due: usize,
    pub delivered: usize,
    pub delivery_failures: usize,
    /// Tasks whose `notified` flag could not be persisted; they stay due.
    pub mark_failures: usize,
    /// Tasks that stopped being due between the query and the claim.
    pub skipped: usize,
}

pub struct ReminderScheduler {
    store: Arc<TaskStore>,
    delivery: Arc<dyn Deliver>,
    interval: Duration,
}

impl ReminderScheduler {
    pub fn new(store: Arc<TaskStore>, delivery: Arc<dyn Deliver>) -> Self {
        Self {
            store,
            delivery,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run one poll against the current time.
    pub fn poll_once(&self) -> PollReport {
        self.poll_at(Utc::now())
    }

    /// Run one poll as if the clock read `now`.
    pub fn poll_at(&self, now: DateTime<Utc>) -> PollReport {
        let started = Instant::now();
        let due = match self.store.due_reminders(now) {
            Ok(due) => due,
            Err(e) => {
                warn!(error_code = %e.code, error = %e.message, "Reminder query failed, will retry");
                return PollReport::default();
            }
        };

        let mut report = PollReport {
            due: due.len(),
            ..PollReport::default()
        };

        for candidate in &due {
            let task = match self.store.claim_reminder(&candidate.id, now) {
                Ok(Some(task)) => task,
                Ok(None) => {
                    report.skipped += 1;
                    debug!(task_id = %candidate.id, "Reminder no longer due, skipping");
                    continue;
                }
                // Deleted since the query.
                Err(e) if e.code == ErrorCode::NotFound => {
                    report.skipped += 1;
                    debug!(task_id = %candidate.id, "Task vanished before its reminder was claimed");
                    continue;
                }
                Err(e) => {
                    report.mark_failures += 1;
                    warn!(
                        task_id = %candidate.id,
                        error_code = %e.code,
                        error = %e.message,
                        "Failed to mark task notified, will retry next poll"
                    );
                    continue;
                }
            };

            match self.delivery.deliver(&task) {
                DeliveryOutcome::Delivered => {
                    report.delivered += 1;
                    info!(task_id = %task.id, title = %task.title, "Reminder delivered");
                }
                DeliveryOutcome::Failed(reason) => {
                    report.delivery_failures += 1;
                    warn!(task_id = %task.id, reason = %reason, "Reminder delivery failed");
                }
            }
        }

        if report.due > 0 {
            debug!(
                due = report.due,
                delivered = report.delivered,
                delivery_failures = report.delivery_failures,
                mark_failures = report.mark_failures,
                skipped = report.skipped,
                duration_ms = started.elapsed().as_millis() as u64,
                "Reminder poll finished"
            );
        }
        report
    }

    /// Spawn the poll loop on the current tokio runtime.
    ///
    /// Must be called from within a runtime. The loop sleeps first, then
    /// polls, until the returned handle is stopped or dropped.
    pub fn start(self) -> SchedulerHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let interval = self.interval;
        let scheduler = Arc::new(self);

        info!(interval_secs = interval.as_secs_f64(), "Reminder scheduler started");
        let join = tokio::spawn(run_loop(scheduler, stop_rx));

        SchedulerHandle {
            stop_tx,
            join: Some(join),
        }
    }
}

impl std::fmt::Debug for ReminderScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReminderScheduler")
            .field("store", &self.store.path())
            .field("interval", &self.interval)
            .finish()
    }
}

async fn run_loop(scheduler: Arc<ReminderScheduler>, mut stop_rx: watch::Receiver<bool>) {
    loop {
        // Only the sleep is interruptible; a running poll always completes.
        tokio::select! {
            _ = tokio::time::sleep(scheduler.interval) => {}
            _ = stop_rx.changed() => break,
        }
        if *stop_rx.borrow() {
            break;
        }

        let poller = Arc::clone(&scheduler);
        if let Err(e) = tokio::task::spawn_blocking(move || poller.poll_once()).await {
            error!(error = %e, "Reminder poll aborted");
        }
    }
    info!("Reminder scheduler stopped");
}

/// Control handle for a running scheduler. Dropping it stops the loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    stop_tx: watch::Sender<bool>,
    join: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|join| !join.is_finished())
    }

    /// Signal the loop and wait for it to exit, including any in-flight poll.
    pub async fn stop(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(join) = self.join.take()
            && let Err(e) = join.await
        {
            error!(error = %e, "Reminder scheduler task failed");
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}
