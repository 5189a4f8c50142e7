use crate::features::reminders::models::{Frequency, Reminder, ReminderFilter, ReminderType};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::storage::JsonCollection;
use crate::shared::utils::dates::{format_timestamp, parse_timestamp_column};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// リマインダーの永続化
pub trait ReminderRepository: Send + Sync {
    fn create(&self, reminder: &Reminder) -> AppResult<()>;

    fn find_by_id(&self, id: &str) -> AppResult<Option<Reminder>>;

    /// ユーザーのリマインダーを取得する（通知日時の早い順）
    fn find_all(&self, user_id: &str, filter: &ReminderFilter) -> AppResult<Vec<Reminder>>;

    /// 通知時刻に達した有効なリマインダーを全ユーザー分取得する（通知日時の早い順）
    fn find_due(&self, now: DateTime<Utc>) -> AppResult<Vec<Reminder>>;

    fn update(&self, reminder: &Reminder) -> AppResult<()>;

    fn delete(&self, id: &str) -> AppResult<()>;
}

/// SQLiteによるリマインダーリポジトリ
pub struct SqliteReminderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReminderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースロック取得失敗: {e}")))
    }
}

const SELECT_REMINDER: &str =
    "SELECT id, user_id, type, message, date_time, frequency, is_active, created_at FROM reminders";

fn text_conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, message.into())
}

fn map_reminder_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    let kind: String = row.get(2)?;
    let date_time: String = row.get(4)?;
    let frequency: String = row.get(5)?;
    let created_at: String = row.get(7)?;

    Ok(Reminder {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: kind
            .parse::<ReminderType>()
            .map_err(|e| text_conversion_error(2, e))?,
        message: row.get(3)?,
        date_time: parse_timestamp_column(&date_time, 4)?,
        frequency: frequency
            .parse::<Frequency>()
            .map_err(|e| text_conversion_error(5, e))?,
        is_active: row.get(6)?,
        created_at: parse_timestamp_column(&created_at, 7)?,
    })
}

impl ReminderRepository for SqliteReminderRepository {
    fn create(&self, reminder: &Reminder) -> AppResult<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO reminders (id, user_id, type, message, date_time, frequency, is_active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                reminder.id,
                reminder.user_id,
                reminder.kind.as_str(),
                reminder.message,
                format_timestamp(&reminder.date_time),
                reminder.frequency.as_str(),
                reminder.is_active,
                format_timestamp(&reminder.created_at)
            ],
        )?;

        Ok(())
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<Reminder>> {
        let conn = self.lock()?;
        let reminder = conn
            .query_row(
                &format!("{SELECT_REMINDER} WHERE id = ?1"),
                params![id],
                map_reminder_row,
            )
            .optional()?;
        Ok(reminder)
    }

    fn find_all(&self, user_id: &str, filter: &ReminderFilter) -> AppResult<Vec<Reminder>> {
        let mut query = format!("{SELECT_REMINDER} WHERE user_id = ?");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(active) = filter.active {
            query.push_str(" AND is_active = ?");
            params.push(Box::new(active));
        }
        if let Some(kind) = filter.kind {
            query.push_str(" AND type = ?");
            params.push(Box::new(kind.as_str()));
        }

        query.push_str(" ORDER BY date_time ASC");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&query)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let reminders = stmt
            .query_map(param_refs.as_slice(), map_reminder_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reminders)
    }

    fn find_due(&self, now: DateTime<Utc>) -> AppResult<Vec<Reminder>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_REMINDER} WHERE is_active = 1 AND date_time <= ?1 ORDER BY date_time ASC"
        ))?;

        let reminders = stmt
            .query_map(params![format_timestamp(&now)], map_reminder_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(reminders)
    }

    fn update(&self, reminder: &Reminder) -> AppResult<()> {
        let conn = self.lock()?;

        let affected_rows = conn.execute(
            "UPDATE reminders SET type = ?1, message = ?2, date_time = ?3, frequency = ?4, is_active = ?5
             WHERE id = ?6",
            params![
                reminder.kind.as_str(),
                reminder.message,
                format_timestamp(&reminder.date_time),
                reminder.frequency.as_str(),
                reminder.is_active,
                reminder.id
            ],
        )?;

        if affected_rows == 0 {
            return Err(AppError::not_found("リマインダー"));
        }

        Ok(())
    }

    fn delete(&self, id: &str) -> AppResult<()> {
        let conn = self.lock()?;
        let affected_rows = conn.execute("DELETE FROM reminders WHERE id = ?1", params![id])?;

        if affected_rows == 0 {
            return Err(AppError::not_found("リマインダー"));
        }

        Ok(())
    }
}

/// JSONファイルによるリマインダーリポジトリ
pub struct FileReminderRepository {
    collection: JsonCollection<Reminder>,
}

impl FileReminderRepository {
    pub fn open(data_dir: &Path) -> AppResult<Self> {
        Ok(Self {
            collection: JsonCollection::open(data_dir, "reminders")?,
        })
    }
}

impl ReminderRepository for FileReminderRepository {
    fn create(&self, reminder: &Reminder) -> AppResult<()> {
        self.collection.insert(reminder.clone(), |_| None)
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<Reminder>> {
        self.collection.get(id)
    }

    fn find_all(&self, user_id: &str, filter: &ReminderFilter) -> AppResult<Vec<Reminder>> {
        let mut reminders = self
            .collection
            .filter(|r| r.user_id == user_id && filter.matches(r))?;
        reminders.sort_by(|a, b| a.date_time.cmp(&b.date_time));
        Ok(reminders)
    }

    fn find_due(&self, now: DateTime<Utc>) -> AppResult<Vec<Reminder>> {
        let mut reminders = self
            .collection
            .filter(|r| r.is_active && r.date_time <= now)?;
        reminders.sort_by(|a, b| a.date_time.cmp(&b.date_time));
        Ok(reminders)
    }

    fn update(&self, reminder: &Reminder) -> AppResult<()> {
        if self.collection.replace(reminder.clone(), |_| None)? {
            Ok(())
        } else {
            Err(AppError::not_found("リマインダー"))
        }
    }

    fn delete(&self, id: &str) -> AppResult<()> {
        if self.collection.remove(id)? {
            Ok(())
        } else {
            Err(AppError::not_found("リマインダー"))
        }
    }
}
