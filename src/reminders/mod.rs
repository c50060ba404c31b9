use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::pooled_connection::bb8::{Pool, PooledConnection};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::RunQueryDsl;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use serde::Serialize;

use crate::error::{ReminderBotError, Result};

mod schema;
use schema::reminders;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

type SqliteAsyncConn = SyncConnectionWrapper<SqliteConnection>;
type SqlitePool = Pool<SqliteAsyncConn>;
type SqlitePooledConn<'a> = PooledConnection<'a, SqliteAsyncConn>;

const POOL_MAX_SIZE: u32 = 4;
const POOL_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const BUSY_TIMEOUT_MS: u32 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub message: String,
    pub due_at: DateTime<Utc>,
    pub repeat_interval: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Reminder {
    pub fn is_recurring(&self) -> bool {
        self.repeat_interval.is_some()
    }

    /// Where the reminder moves after a successful recurring delivery.
    pub fn next_due_at(&self) -> Option<DateTime<Utc>> {
        let interval = chrono::TimeDelta::try_seconds(self.repeat_interval?)?;
        self.due_at.checked_add_signed(interval)
    }
}

#[derive(Queryable)]
struct ReminderRow {
    id: i64,
    user_id: i64,
    message: String,
    due_at: i64,
    repeat_interval: Option<i64>,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = reminders)]
struct NewReminder<'a> {
    user_id: i64,
    message: &'a str,
    due_at: i64,
    repeat_interval: Option<i64>,
    created_at: i64,
}

/// Durable reminder table. Instants are stored as UTC unix microseconds.
///
/// Every call checks a connection out of the pool, runs a
/// single statement and hands the connection back.
pub struct ReminderStore {
    pool: SqlitePool,
}

impl ReminderStore {
    pub async fn new(sqlite_path: impl AsRef<str>) -> Result<Self> {
        let sqlite_path = sqlite_path.as_ref();
        ensure_parent_dir(sqlite_path)?;
        run_migrations(sqlite_path).await?;

        let manager = AsyncDieselConnectionManager::<SqliteAsyncConn>::new(sqlite_path);
        let pool: SqlitePool = Pool::builder()
            .max_size(POOL_MAX_SIZE)
            .connection_timeout(POOL_ACQUIRE_TIMEOUT)
            .build(manager)
            .await
            .map_err(store_error)?;
        Ok(Self { pool })
    }

    pub async fn insert(
        &self,
        user_id: i64,
        message: &str,
        due_at: DateTime<Utc>,
        repeat_interval: Option<i64>,
    ) -> Result<Reminder> {
        validate_message(message)?;
        validate_repeat_interval(repeat_interval)?;

        let new = NewReminder {
            user_id,
            message,
            due_at: due_at.timestamp_micros(),
            repeat_interval,
            created_at: Utc::now().timestamp_micros(),
        };

        let mut conn = self.conn().await?;
        let row: ReminderRow = diesel::insert_into(reminders::table)
            .values(&new)
            .get_result(&mut conn)
            .await
            .map_err(store_error)?;
        map_row(row)
    }

    /// Inserts with a textual RFC 3339 due time.
    pub async fn insert_raw(
        &self,
        user_id: i64,
        message: &str,
        due_at: &str,
        repeat_interval: Option<i64>,
    ) -> Result<Reminder> {
        let due_at = parse_due_at(due_at)?;
        self.insert(user_id, message, due_at, repeat_interval).await
    }

    pub async fn get(&self, id: i64) -> Result<Option<Reminder>> {
        let mut conn = self.conn().await?;
        let row = reminders::table
            .find(id)
            .first::<ReminderRow>(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;
        row.map(map_row).transpose()
    }

    /// Every reminder with `due_at <= now`, earliest first.
    pub async fn due(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>> {
        self.due_limited(now, 0).await
    }

    /// [`Self::due`] capped at `limit` rows; zero means no cap.
    pub async fn due_limited(&self, now: DateTime<Utc>, limit: usize) -> Result<Vec<Reminder>> {
        let mut conn = self.conn().await?;
        let mut query = reminders::table
            .filter(reminders::due_at.le(now.timestamp_micros()))
            .into_boxed();
        if limit > 0 {
            query = query.limit(limit as i64);
        }
        let rows: Vec<ReminderRow> = query
            .order((reminders::due_at.asc(), reminders::id.asc()))
            .load(&mut conn)
            .await
            .map_err(store_error)?;
        rows.into_iter().map(map_row).collect()
    }

    /// Moves a reminder to `new_due_at`. Returns `false` when the row is already gone.
    pub async fn reschedule(&self, id: i64, new_due_at: DateTime<Utc>) -> Result<bool> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(reminders::table.find(id))
            .set(reminders::due_at.eq(new_due_at.timestamp_micros()))
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(updated > 0)
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(reminders::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(deleted > 0)
    }

    /// Deletes `id` only if `user_id` owns it.
    pub async fn delete_owned(&self, id: i64, user_id: i64) -> Result<()> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(
            reminders::table
                .filter(reminders::id.eq(id))
                .filter(reminders::user_id.eq(user_id)),
        )
        .execute(&mut conn)
        .await
        .map_err(store_error)?;
        if deleted == 0 {
            return Err(ReminderBotError::NotFound(format!(
                "reminder {id} for user {user_id}"
            )));
        }
        Ok(())
    }

    pub async fn delete_all(&self, user_id: i64) -> Result<usize> {
        let mut conn = self.conn().await?;
        diesel::delete(reminders::table.filter(reminders::user_id.eq(user_id)))
            .execute(&mut conn)
            .await
            .map_err(store_error)
    }

    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Reminder>> {
        let mut conn = self.conn().await?;
        let rows: Vec<ReminderRow> = reminders::table
            .filter(reminders::user_id.eq(user_id))
            .order((reminders::due_at.asc(), reminders::id.asc()))
            .load(&mut conn)
            .await
            .map_err(store_error)?;
        rows.into_iter().map(map_row).collect()
    }

    async fn conn(&self) -> Result<SqlitePooledConn<'_>> {
        let mut conn = self.pool.get().await.map_err(store_error)?;
        diesel::sql_query(format!("PRAGMA busy_timeout = {BUSY_TIMEOUT_MS}"))
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(conn)
    }
}

pub fn parse_due_at(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|value| value.with_timezone(&Utc))
        .map_err(|e| ReminderBotError::Validation(format!("unparseable due time '{raw}': {e}")))
}

fn validate_message(message: &str) -> Result<()> {
    if message.trim().is_empty() {
        return Err(ReminderBotError::Validation(
            "message must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_repeat_interval(repeat_interval: Option<i64>) -> Result<()> {
    match repeat_interval {
        Some(seconds) if seconds <= 0 => Err(ReminderBotError::Validation(format!(
            "repeat interval must be positive, got {seconds}"
        ))),
        _ => Ok(()),
    }
}

fn map_row(row: ReminderRow) -> Result<Reminder> {
    Ok(Reminder {
        id: row.id,
        user_id: row.user_id,
        message: row.message,
        due_at: instant(row.due_at)?,
        repeat_interval: row.repeat_interval,
        created_at: instant(row.created_at)?,
    })
}

fn instant(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| ReminderBotError::Store(format!("timestamp {micros}us is out of range")))
}

fn store_error(err: impl std::fmt::Display) -> ReminderBotError {
    ReminderBotError::Store(err.to_string())
}

fn ensure_parent_dir(path: &str) -> Result<()> {
    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(store_error)?;
        }
    }
    Ok(())
}

async fn run_migrations(database_url: &str) -> Result<()> {
    let database_url = database_url.to_string();
    tokio::task::spawn_blocking(move || {
        let mut conn = SqliteConnection::establish(&database_url).map_err(store_error)?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(store_error)?;
        Ok::<_, ReminderBotError>(())
    })
    .await
    .map_err(|e| ReminderBotError::Runtime(e.to_string()))??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_store() -> (tempfile::TempDir, ReminderStore) {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_path = dir.path().join("reminders.db");
        let db_path = db_path.to_string_lossy().to_string();
        let store = ReminderStore::new(&db_path).await.expect("store");
        (dir, store)
    }

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_771_147_543 + seconds, 0).unwrap()
    }

    #[tokio::test]
    async fn inserted_reminder_comes_back_from_due() {
        let (_dir, store) = test_store().await;
        let created = store
            .insert(42, "call mom", at(0), None)
            .await
            .expect("insert");

        let due = store.due(at(0)).await.expect("due");
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, created.id);
        assert_eq!(due[0].message, "call mom");
        assert_eq!(due[0].due_at, at(0));
        assert_eq!(due[0].repeat_interval, None);
    }

    #[tokio::test]
    async fn future_reminders_are_not_due() {
        let (_dir, store) = test_store().await;
        store.insert(1, "later", at(60), None).await.expect("insert");

        assert!(store.due(at(59)).await.expect("due").is_empty());
        assert_eq!(store.due(at(60)).await.expect("due").len(), 1);
    }

    #[tokio::test]
    async fn due_orders_by_due_time() {
        let (_dir, store) = test_store().await;
        let third = store.insert(1, "third", at(30), None).await.unwrap();
        let first = store.insert(2, "first", at(10), None).await.unwrap();
        let second = store.insert(1, "second", at(20), Some(60)).await.unwrap();

        let due = store.due(at(30)).await.expect("due");
        let ids: Vec<i64> = due.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![first.id, second.id, third.id]);

        let limited = store.due_limited(at(30), 2).await.expect("limited");
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].id, first.id);
    }

    #[tokio::test]
    async fn insert_rejects_bad_input() {
        let (_dir, store) = test_store().await;

        let empty = store.insert(1, "   ", at(0), None).await.unwrap_err();
        assert!(matches!(empty, ReminderBotError::Validation(_)));

        for interval in [0, -60] {
            let err = store
                .insert(1, "standup", at(0), Some(interval))
                .await
                .unwrap_err();
            assert!(matches!(err, ReminderBotError::Validation(_)));
        }

        let unparseable = store
            .insert_raw(1, "standup", "tomorrow-ish", None)
            .await
            .unwrap_err();
        assert!(matches!(unparseable, ReminderBotError::Validation(_)));

        assert!(store.list_by_user(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn raw_due_times_are_normalised_to_utc() {
        let (_dir, store) = test_store().await;
        let created = store
            .insert_raw(1, "coffee", "2026-03-01T10:00:00+02:00", None)
            .await
            .expect("insert raw");
        assert_eq!(
            created.due_at,
            Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn reschedule_moves_due_time_and_ignores_missing_rows() {
        let (_dir, store) = test_store().await;
        let created = store.insert(1, "standup", at(0), Some(3_600)).await.unwrap();

        assert!(store.reschedule(created.id, at(3_600)).await.unwrap());
        let moved = store.get(created.id).await.unwrap().expect("row");
        assert_eq!(moved.due_at, at(3_600));
        assert_eq!(moved.repeat_interval, Some(3_600));

        assert!(store.delete(created.id).await.unwrap());
        assert!(!store.reschedule(created.id, at(7_200)).await.unwrap());
        assert!(store.get(created.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn owned_delete_respects_ownership() {
        let (_dir, store) = test_store().await;
        let mine = store.insert(1, "mine", at(0), None).await.unwrap();

        let err = store.delete_owned(mine.id, 2).await.unwrap_err();
        assert!(matches!(err, ReminderBotError::NotFound(_)));
        assert_eq!(store.list_by_user(1).await.unwrap().len(), 1);

        store.delete_owned(mine.id, 1).await.expect("owner delete");
        assert!(store.list_by_user(1).await.unwrap().is_empty());

        let again = store.delete_owned(mine.id, 1).await.unwrap_err();
        assert!(matches!(again, ReminderBotError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_all_only_touches_one_user() {
        let (_dir, store) = test_store().await;
        store.insert(1, "a", at(0), None).await.unwrap();
        store.insert(1, "b", at(5), Some(60)).await.unwrap();
        store.insert(2, "c", at(0), None).await.unwrap();

        assert_eq!(store.delete_all(1).await.unwrap(), 2);
        assert!(store.list_by_user(1).await.unwrap().is_empty());
        assert_eq!(store.list_by_user(2).await.unwrap().len(), 1);

        assert_eq!(store.delete_all(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_deletion() {
        let (_dir, store) = test_store().await;
        let first = store.insert(1, "a", at(0), None).await.unwrap();
        let second = store.insert(1, "b", at(0), None).await.unwrap();
        store.delete(second.id).await.unwrap();

        let third = store.insert(1, "c", at(0), None).await.unwrap();
        assert!(second.id > first.id);
        assert!(third.id > second.id);
    }

    #[tokio::test]
    async fn list_by_user_is_ordered_for_display() {
        let (_dir, store) = test_store().await;
        store.insert(7, "late", at(500), None).await.unwrap();
        store.insert(7, "early", at(-500), None).await.unwrap();
        store.insert(8, "other", at(0), None).await.unwrap();

        let listed = store.list_by_user(7).await.unwrap();
        let messages: Vec<&str> = listed.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["early", "late"]);
    }

    #[tokio::test]
    async fn reopening_the_database_keeps_rows() {
        let dir = tempfile::tempdir().expect("temp dir");
        let db_path = dir.path().join("nested").join("reminders.db");
        let db_path = db_path.to_string_lossy().to_string();

        let created = {
            let store = ReminderStore::new(&db_path).await.expect("first open");
            store.insert(3, "persist me", at(0), None).await.unwrap()
        };

        let store = ReminderStore::new(&db_path).await.expect("second open");
        let listed = store.list_by_user(3).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, created.id);
    }

    #[tokio::test]
    async fn sub_second_due_times_survive_the_round_trip() {
        let (_dir, store) = test_store().await;
        let due_at = at(0) + chrono::TimeDelta::milliseconds(750);
        let created = store.insert(1, "m", due_at, None).await.unwrap();
        assert_eq!(created.due_at, due_at);

        assert!(store.due(at(0)).await.unwrap().is_empty());
        let due = store.due(due_at).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].due_at, due_at);

        let later = due_at + chrono::TimeDelta::microseconds(1);
        assert!(store.reschedule(created.id, later).await.unwrap());
        assert_eq!(store.get(created.id).await.unwrap().unwrap().due_at, later);
    }

    #[tokio::test]
    async fn due_orders_within_the_same_second() {
        let (_dir, store) = test_store().await;
        let ms = chrono::TimeDelta::milliseconds;
        store.insert(1, "T3", at(0) + ms(900), None).await.unwrap();
        store.insert(1, "T1", at(0) + ms(100), None).await.unwrap();
        store.insert(1, "T2", at(0) + ms(500), None).await.unwrap();

        let due = store.due(at(1)).await.unwrap();
        let messages: Vec<&str> = due.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["T1", "T2", "T3"]);
    }

    #[test]
    fn next_due_at_adds_the_interval() {
        let reminder = Reminder {
            id: 1,
            user_id: 1,
            message: "standup".to_string(),
            due_at: at(0),
            repeat_interval: Some(3_600),
            created_at: at(0),
        };
        assert!(reminder.is_recurring());
        assert_eq!(reminder.next_due_at(), Some(at(3_600)));

        let once = Reminder {
            repeat_interval: None,
            ..reminder
        };
        assert_eq!(once.next_due_at(), None);
    }
}
