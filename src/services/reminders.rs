use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{ReminderBotError, Result};
use crate::reminders::{Reminder, ReminderStore};

/// Front-end facing operations: create, list and delete reminders for one user.
#[derive(Clone)]
pub struct ReminderService {
    store: Arc<ReminderStore>,
}

impl ReminderService {
    pub fn new(store: Arc<ReminderStore>) -> Self {
        Self { store }
    }

    /// Schedules `message` for `due_offset_seconds` from now.
    pub async fn create_reminder(
        &self,
        user_id: i64,
        message: &str,
        due_offset_seconds: i64,
        repeat_seconds: Option<i64>,
    ) -> Result<Reminder> {
        let due_at = offset_from(Utc::now(), due_offset_seconds)?;
        self.create_reminder_at(user_id, message, due_at, repeat_seconds)
            .await
    }

    pub async fn create_reminder_at(
        &self,
        user_id: i64,
        message: &str,
        due_at: DateTime<Utc>,
        repeat_seconds: Option<i64>,
    ) -> Result<Reminder> {
        let reminder = self
            .store
            .insert(user_id, message, due_at, repeat_seconds)
            .await?;
        tracing::info!(
            reminder_id = reminder.id,
            user_id,
            due_at = %reminder.due_at,
            repeat_interval = ?reminder.repeat_interval,
            "Reminder created"
        );
        Ok(reminder)
    }

    pub async fn list_reminders(&self, user_id: i64) -> Result<Vec<Reminder>> {
        self.store.list_by_user(user_id).await
    }

    pub async fn delete_reminder(&self, user_id: i64, id: i64) -> Result<()> {
        self.store.delete_owned(id, user_id).await?;
        tracing::info!(reminder_id = id, user_id, "Reminder deleted");
        Ok(())
    }

    pub async fn delete_all_reminders(&self, user_id: i64) -> Result<usize> {
        let deleted = self.store.delete_all(user_id).await?;
        tracing::info!(user_id, deleted, "Reminders cleared");
        Ok(deleted)
    }
}

pub fn offset_from(now: DateTime<Utc>, offset_seconds: i64) -> Result<DateTime<Utc>> {
    if offset_seconds < 0 {
        return Err(ReminderBotError::Validation(format!(
            "due offset must not be negative, got {offset_seconds}"
        )));
    }
    TimeDelta::try_seconds(offset_seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| {
            ReminderBotError::Validation(format!("due offset {offset_seconds}s is out of range"))
        })
}
