use crate::features::auth::models::{User, UserRecord};
use crate::shared::currency::Currency;
use crate::shared::database::is_unique_violation;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::storage::JsonCollection;
use crate::shared::utils::dates::{format_timestamp, parse_timestamp_column};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// ユーザーの永続化
pub trait UserRepository: Send + Sync {
    /// ユーザーを作成する（メールアドレスが重複する場合はバリデーションエラー）
    fn create(&self, record: &UserRecord) -> AppResult<()>;

    /// IDでユーザーを取得する
    fn find_by_id(&self, id: &str) -> AppResult<Option<UserRecord>>;

    /// メールアドレスでユーザーを取得する（大文字小文字を区別しない）
    fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    /// ユーザーを更新する
    fn update(&self, record: &UserRecord) -> AppResult<()>;
}

const EMAIL_TAKEN: &str = "このメールアドレスは既に登録されています";

/// SQLiteによるユーザーリポジトリ
pub struct SqliteUserRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースロック取得失敗: {e}")))
    }
}

const SELECT_USER: &str =
    "SELECT id, name, email, default_currency, created_at, password_hash FROM users";

fn map_user_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
    let currency: String = row.get(3)?;
    let created_at: String = row.get(4)?;

    Ok(UserRecord {
        user: User {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            default_currency: currency.parse::<Currency>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
            })?,
            created_at: parse_timestamp_column(&created_at, 4)?,
        },
        password_hash: row.get(5)?,
    })
}

impl UserRepository for SqliteUserRepository {
    fn create(&self, record: &UserRecord) -> AppResult<()> {
        let conn = self.lock()?;
        let user = &record.user;

        conn.execute(
            "INSERT INTO users (id, name, email, default_currency, created_at, password_hash)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.id,
                user.name,
                user.email,
                user.default_currency.code(),
                format_timestamp(&user.created_at),
                record.password_hash
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                AppError::validation(EMAIL_TAKEN)
            } else {
                AppError::from(e)
            }
        })?;

        Ok(())
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<UserRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(&format!("{SELECT_USER} WHERE id = ?1"), params![id], map_user_row)
            .optional()?;
        Ok(record)
    }

    fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                &format!("{SELECT_USER} WHERE lower(email) = lower(?1)"),
                params![email.trim()],
                map_user_row,
            )
            .optional()?;
        Ok(record)
    }

    fn update(&self, record: &UserRecord) -> AppResult<()> {
        let conn = self.lock()?;
        let user = &record.user;

        let affected_rows = conn
            .execute(
                "UPDATE users SET name = ?1, email = ?2, default_currency = ?3, password_hash = ?4
                 WHERE id = ?5",
                params![
                    user.name,
                    user.email,
                    user.default_currency.code(),
                    record.password_hash,
                    user.id
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AppError::validation(EMAIL_TAKEN)
                } else {
                    AppError::from(e)
                }
            })?;

        if affected_rows == 0 {
            return Err(AppError::not_found("ユーザー"));
        }

        Ok(())
    }
}

/// JSONファイルによるユーザーリポジトリ
pub struct FileUserRepository {
    collection: JsonCollection<UserRecord>,
}

impl FileUserRepository {
    pub fn open(data_dir: &Path) -> AppResult<Self> {
        Ok(Self {
            collection: JsonCollection::open(data_dir, "users")?,
        })
    }
}

fn email_conflict(new: &UserRecord) -> impl Fn(&UserRecord) -> Option<String> + '_ {
    move |existing| {
        existing
            .user
            .email
            .eq_ignore_ascii_case(&new.user.email)
            .then(|| EMAIL_TAKEN.to_string())
    }
}

impl UserRepository for FileUserRepository {
    fn create(&self, record: &UserRecord) -> AppResult<()> {
        self.collection.insert(record.clone(), email_conflict(record))
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<UserRecord>> {
        self.collection.get(id)
    }

    fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let email = email.trim();
        self.collection
            .find(|r| r.user.email.eq_ignore_ascii_case(email))
    }

    fn update(&self, record: &UserRecord) -> AppResult<()> {
        if self.collection.replace(record.clone(), email_conflict(record))? {
            Ok(())
        } else {
            Err(AppError::not_found("ユーザー"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::create_in_memory_connection;
    use chrono::Utc;
    use tempfile::TempDir;

    fn record(id: &str, email: &str) -> UserRecord {
        UserRecord {
            user: User {
                id: id.to_string(),
                name: "テストユーザー".to_string(),
                email: email.to_string(),
                default_currency: Currency::Usd,
                created_at: Utc::now(),
            },
            password_hash: "hash".to_string(),
        }
    }

    fn repositories(temp_dir: &TempDir) -> Vec<Box<dyn UserRepository>> {
        let conn = Arc::new(Mutex::new(create_in_memory_connection().unwrap()));
        vec![
            Box::new(SqliteUserRepository::new(conn)),
            Box::new(FileUserRepository::open(temp_dir.path()).unwrap()),
        ]
    }

    #[test]
    fn test_create_and_find() {
        let temp_dir = TempDir::new().unwrap();
        for repo in repositories(&temp_dir) {
            repo.create(&record("u1", "taro@example.com")).unwrap();

            let by_id = repo.find_by_id("u1").unwrap().unwrap();
            assert_eq!(by_id.user.email, "taro@example.com");

            let by_email = repo.find_by_email("TARO@example.com").unwrap().unwrap();
            assert_eq!(by_email.user.id, "u1");

            assert!(repo.find_by_id("missing").unwrap().is_none());
        }
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let temp_dir = TempDir::new().unwrap();
        for repo in repositories(&temp_dir) {
            repo.create(&record("u1", "dup@example.com")).unwrap();
            let result = repo.create(&record("u2", "dup@example.com"));
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_update() {
        let temp_dir = TempDir::new().unwrap();
        for repo in repositories(&temp_dir) {
            let mut user = record("u1", "before@example.com");
            repo.create(&user).unwrap();

            user.user.email = "after@example.com".to_string();
            user.user.default_currency = Currency::Eur;
            repo.update(&user).unwrap();

            let stored = repo.find_by_id("u1").unwrap().unwrap();
            assert_eq!(stored.user.email, "after@example.com");
            assert_eq!(stored.user.default_currency, Currency::Eur);

            let missing = repo.update(&record("nobody", "x@example.com"));
            assert!(matches!(missing, Err(AppError::NotFound(_))));
        }
    }
}
