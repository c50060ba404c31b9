use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dispatcher::Dispatcher;
use crate::error::{ReminderBotError, Result};
use crate::interfaces::scheduler::ScheduledJob;
use crate::reminders::{Reminder, ReminderStore};

const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Tally of one scan.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub due: usize,
    pub delivered: usize,
    pub rescheduled: usize,
    pub deleted: usize,
    /// Deliveries that failed; those reminders stay due for the next scan.
    pub failed: usize,
    /// Delivered, but the follow-up reschedule or delete did not go through.
    pub persist_failed: usize,
}

enum Settled {
    Rescheduled,
    Deleted,
    Gone,
}

/// Scans for due reminders, delivers them in due order, then advances recurring
/// ones and retires one-shots.
///
/// A reminder whose delivery fails is left exactly as it was and comes up again on
/// the next scan. There is no backoff and no attempt cap.
pub struct ReminderDeliveryJob {
    store: Arc<ReminderStore>,
    dispatcher: Arc<Dispatcher>,
    interval: Duration,
    store_timeout: Duration,
    batch_limit: usize,
}

impl ReminderDeliveryJob {
    pub fn new(store: Arc<ReminderStore>, dispatcher: Arc<Dispatcher>, interval: Duration) -> Self {
        Self {
            store,
            dispatcher,
            interval,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            batch_limit: 0,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn with_batch_limit(mut self, limit: usize) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Processes everything due at `now`. Only a failed due-query fails the scan;
    /// per-reminder problems are counted in the report.
    pub async fn scan(&self, now: DateTime<Utc>) -> Result<ScanReport> {
        let mut batch = bounded(
            self.store_timeout,
            "due query",
            self.store.due_limited(now, self.batch_limit),
        )
        .await?;
        let mut seen = HashSet::new();
        batch.retain(|reminder| seen.insert(reminder.id));

        let mut report = ScanReport {
            due: batch.len(),
            ..ScanReport::default()
        };

        for reminder in &batch {
            if let Err(err) = self.dispatcher.send(reminder).await {
                report.failed += 1;
                tracing::warn!(
                    reminder_id = reminder.id,
                    user_id = reminder.user_id,
                    channel = self.dispatcher.channel(),
                    error = %err,
                    "Reminder delivery failed; it stays due"
                );
                continue;
            }
            report.delivered += 1;

            match self.settle(reminder).await {
                Ok(Settled::Rescheduled) => report.rescheduled += 1,
                Ok(Settled::Deleted) => report.deleted += 1,
                Ok(Settled::Gone) => {
                    tracing::debug!(
                        reminder_id = reminder.id,
                        "Reminder removed while it was being delivered"
                    );
                }
                Err(err) => {
                    report.persist_failed += 1;
                    tracing::error!(
                        reminder_id = reminder.id,
                        error = %err,
                        "Delivered reminder could not be updated; it may fire again"
                    );
                }
            }
        }

        if report.due > 0 {
            tracing::info!(
                due = report.due,
                delivered = report.delivered,
                rescheduled = report.rescheduled,
                deleted = report.deleted,
                failed = report.failed,
                persist_failed = report.persist_failed,
                "Reminder scan finished"
            );
        } else {
            tracing::debug!("Reminder scan found nothing due");
        }
        Ok(report)
    }

    async fn settle(&self, reminder: &Reminder) -> Result<Settled> {
        if reminder.is_recurring() {
            let next = reminder.next_due_at().ok_or_else(|| {
                ReminderBotError::Store(format!(
                    "reminder {} cannot be advanced past {}",
                    reminder.id, reminder.due_at
                ))
            })?;
            let updated = bounded(
                self.store_timeout,
                "reschedule",
                self.store.reschedule(reminder.id, next),
            )
            .await?;
            Ok(if updated { Settled::Rescheduled } else { Settled::Gone })
        } else {
            let deleted =
                bounded(self.store_timeout, "delete", self.store.delete(reminder.id)).await?;
            Ok(if deleted { Settled::Deleted } else { Settled::Gone })
        }
    }
}

#[async_trait]
impl ScheduledJob for ReminderDeliveryJob {
    fn name(&self) -> &str {
        "reminder_delivery"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn run(&self) -> Result<()> {
        self.scan(Utc::now()).await.map(|_| ())
    }
}

async fn bounded<T>(
    timeout: Duration,
    operation: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        ReminderBotError::Store(format!("{operation} timed out after {timeout:?}"))
    })?
}
