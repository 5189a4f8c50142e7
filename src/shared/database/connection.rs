use crate::shared::errors::{AppError, AppResult};
use rusqlite::Connection;
use std::path::Path;

/// データベース接続を初期化し、テーブルを作成する
///
/// # 引数
/// * `database_path` - データベースファイルのパス
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
///
/// # 処理内容
/// 1. 親ディレクトリの確保
/// 2. データベース接続の開設
/// 3. テーブルとインデックスの作成
pub fn initialize_database(database_path: &Path) -> AppResult<Connection> {
    if let Some(parent) = database_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::configuration(format!("データベースディレクトリの作成に失敗: {e}"))
            })?;
            log::info!("データベースディレクトリを作成: {parent:?}");
        }
    }

    let conn = Connection::open(database_path)?;
    create_tables(&conn)?;

    log::info!("データベースを初期化しました: {database_path:?}");

    Ok(conn)
}

/// テスト用のインメモリデータベースを作成する
pub fn create_in_memory_connection() -> AppResult<Connection> {
    let conn = Connection::open_in_memory()?;
    create_tables(&conn)?;
    Ok(conn)
}

/// データベーステーブルを作成する
///
/// # 引数
/// * `conn` - データベース接続
///
/// # 戻り値
/// 成功時はOk(())、失敗時はエラー
pub fn create_tables(conn: &Connection) -> AppResult<()> {
    create_users_table(conn)?;
    create_transactions_table(conn)?;
    create_budgets_table(conn)?;
    create_goals_table(conn)?;
    create_reminders_table(conn)?;

    Ok(())
}

/// ユーザーテーブルを作成する
fn create_users_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            default_currency TEXT NOT NULL CHECK(default_currency IN ('USD', 'EUR', 'INR')),
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

/// 取引テーブルを作成する
fn create_transactions_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS transactions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            type TEXT NOT NULL CHECK(type IN ('income', 'expense')),
            category TEXT NOT NULL,
            amount REAL NOT NULL,
            currency TEXT NOT NULL CHECK(currency IN ('USD', 'EUR', 'INR')),
            date TEXT NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_transactions_user_type_category
         ON transactions(user_id, type, category)",
        [],
    )?;

    Ok(())
}

/// 予算テーブルを作成する（ユーザー・カテゴリ・月の組み合わせで一意）
fn create_budgets_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS budgets (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            category TEXT NOT NULL,
            budget_limit REAL NOT NULL,
            month TEXT NOT NULL,
            currency TEXT NOT NULL CHECK(currency IN ('USD', 'EUR', 'INR')),
            created_at TEXT NOT NULL,
            UNIQUE(user_id, category, month)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_budgets_user_month ON budgets(user_id, month)",
        [],
    )?;

    Ok(())
}

/// 目標テーブルを作成する
fn create_goals_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS goals (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            target_amount REAL NOT NULL,
            current_amount REAL NOT NULL DEFAULT 0,
            deadline TEXT NOT NULL,
            currency TEXT NOT NULL CHECK(currency IN ('USD', 'EUR', 'INR')),
            completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_goals_user_completed ON goals(user_id, completed)",
        [],
    )?;

    Ok(())
}

/// リマインダーテーブルを作成する
fn create_reminders_table(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS reminders (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            type TEXT NOT NULL
                CHECK(type IN ('budget-check', 'log-expense', 'goal-update', 'custom')),
            message TEXT NOT NULL,
            date_time TEXT NOT NULL,
            frequency TEXT NOT NULL CHECK(frequency IN ('once', 'daily', 'weekly', 'monthly')),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ポーリング時の期限到来検索用
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reminders_active_date ON reminders(is_active, date_time)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_reminders_user ON reminders(user_id)",
        [],
    )?;

    Ok(())
}

/// UNIQUE制約違反かどうかを判定する
pub fn is_unique_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_tables() {
        let conn = Connection::open_in_memory().unwrap();

        let result = create_tables(&conn);
        assert!(result.is_ok());

        let tables = ["users", "transactions", "budgets", "goals", "reminders"];
        for table in &tables {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    [table],
                    |row| row.get(0),
                )
                .unwrap();
            assert_eq!(count, 1, "テーブル {table} が作成されていません");
        }
    }

    #[test]
    fn test_create_tables_is_idempotent() {
        let conn = create_in_memory_connection().unwrap();
        assert!(create_tables(&conn).is_ok());
    }

    #[test]
    fn test_budget_unique_constraint() {
        let conn = create_in_memory_connection().unwrap();
        let insert = "INSERT INTO budgets (id, user_id, category, budget_limit, month, currency, created_at)
                      VALUES (?1, 'user-1', 'Food', 100.0, '2024-03', 'USD', '2024-03-01T00:00:00.000Z')";

        conn.execute(insert, ["budget-1"]).unwrap();
        let error = conn.execute(insert, ["budget-2"]).unwrap_err();

        assert!(is_unique_violation(&error));
    }

    #[test]
    fn test_initialize_database_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("kakeibo.db");

        let conn = initialize_database(&path).unwrap();

        assert!(path.exists());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
