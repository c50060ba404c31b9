#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use diesel::connection::SimpleConnection;
use diesel::sqlite::SqliteConnection;
use diesel::Connection;
use tempfile::TempDir;

use reminder_bot::error::{ReminderBotError, Result};
use reminder_bot::interfaces::notifier::Notifier;
use reminder_bot::reminders::ReminderStore;

pub struct TestDb {
    pub dir: TempDir,
    pub path: String,
    pub store: Arc<ReminderStore>,
}

impl TestDb {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir
            .path()
            .join("reminders.db")
            .to_string_lossy()
            .to_string();
        let store = Arc::new(ReminderStore::new(&path).await.expect("store"));
        Self { dir, path, store }
    }

    /// Runs raw SQL against the database behind the store's back.
    pub fn execute_raw(&self, sql: &str) {
        let mut conn = SqliteConnection::establish(&self.path).expect("raw connection");
        conn.batch_execute(sql).expect("raw sql");
    }

    /// Opens a raw connection holding an exclusive lock until it is dropped.
    pub fn lock_exclusive(&self) -> SqliteConnection {
        let mut conn = SqliteConnection::establish(&self.path).expect("raw connection");
        conn.batch_execute("BEGIN EXCLUSIVE;").expect("exclusive lock");
        conn
    }
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
}

pub fn secs(n: i64) -> chrono::TimeDelta {
    chrono::TimeDelta::seconds(n)
}

/// Records every notification and fails for the listed users.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    attempts: Mutex<usize>,
    failing_users: Mutex<HashSet<i64>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_for(users: &[i64]) -> Arc<Self> {
        let notifier = Self::default();
        notifier
            .failing_users
            .lock()
            .unwrap()
            .extend(users.iter().copied());
        Arc::new(notifier)
    }

    pub fn recover(&self) {
        self.failing_users.lock().unwrap().clear();
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|(_, text)| text).collect()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, user_id: i64, text: &str) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if self.failing_users.lock().unwrap().contains(&user_id) {
            return Err(ReminderBotError::Delivery(format!(
                "user {user_id} blocked the bot"
            )));
        }
        self.sent.lock().unwrap().push((user_id, text.to_string()));
        Ok(())
    }
}
