use crate::features::auth::repository::{FileUserRepository, SqliteUserRepository, UserRepository};
use crate::features::budgets::repository::{
    BudgetRepository, FileBudgetRepository, SqliteBudgetRepository,
};
use crate::features::goals::repository::{FileGoalRepository, GoalRepository, SqliteGoalRepository};
use crate::features::reminders::repository::{
    FileReminderRepository, ReminderRepository, SqliteReminderRepository,
};
use crate::features::transactions::repository::{
    FileTransactionRepository, SqliteTransactionRepository, TransactionRepository,
};
use crate::shared::config::{ServerConfig, StorageBackend};
use crate::shared::database::{create_in_memory_connection, initialize_database};
use crate::shared::errors::AppResult;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// エンティティごとのリポジトリをまとめた永続化層
///
/// 起動時にSQLiteかJSONファイルストアのどちらかを選び、以降は切り替えない。
#[derive(Clone)]
pub struct Storage {
    pub users: Arc<dyn UserRepository>,
    pub transactions: Arc<dyn TransactionRepository>,
    pub budgets: Arc<dyn BudgetRepository>,
    pub goals: Arc<dyn GoalRepository>,
    pub reminders: Arc<dyn ReminderRepository>,
    /// 選択されたバックエンド
    pub backend: StorageBackend,
}

impl Storage {
    /// 設定に従って永続化層を初期化する
    ///
    /// # 処理内容
    /// 1. `STORAGE_BACKEND=file` の場合はJSONファイルストアを使う
    /// 2. それ以外はSQLiteを開き、失敗した場合はJSONファイルストアにフォールバックする
    pub fn initialize(config: &ServerConfig) -> AppResult<Self> {
        if config.storage_backend == StorageBackend::File {
            log::info!("JSONファイルストアを使用します: data_dir={:?}", config.data_dir);
            return Self::file(&config.data_dir);
        }

        match initialize_database(&config.database_path) {
            Ok(conn) => {
                log::info!("SQLiteストアを使用します: path={:?}", config.database_path);
                Ok(Self::sqlite(conn))
            }
            Err(e) => {
                log::error!(
                    "SQLiteの初期化に失敗したため、JSONファイルストアにフォールバックします: {}",
                    e.details()
                );
                Self::file(&config.data_dir)
            }
        }
    }

    /// SQLite接続から作成する
    pub fn sqlite(conn: Connection) -> Self {
        let conn = Arc::new(Mutex::new(conn));
        Self {
            users: Arc::new(SqliteUserRepository::new(Arc::clone(&conn))),
            transactions: Arc::new(SqliteTransactionRepository::new(Arc::clone(&conn))),
            budgets: Arc::new(SqliteBudgetRepository::new(Arc::clone(&conn))),
            goals: Arc::new(SqliteGoalRepository::new(Arc::clone(&conn))),
            reminders: Arc::new(SqliteReminderRepository::new(conn)),
            backend: StorageBackend::Sqlite,
        }
    }

    /// JSONファイルストアを開く
    pub fn file(data_dir: &Path) -> AppResult<Self> {
        Ok(Self {
            users: Arc::new(FileUserRepository::open(data_dir)?),
            transactions: Arc::new(FileTransactionRepository::open(data_dir)?),
            budgets: Arc::new(FileBudgetRepository::open(data_dir)?),
            goals: Arc::new(FileGoalRepository::open(data_dir)?),
            reminders: Arc::new(FileReminderRepository::open(data_dir)?),
            backend: StorageBackend::File,
        })
    }

    /// インメモリSQLiteで作成する（テスト用）
    pub fn in_memory() -> AppResult<Self> {
        Ok(Self::sqlite(create_in_memory_connection()?))
    }
}
