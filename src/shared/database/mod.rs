/// SQLite接続の初期化とスキーマ管理
pub mod connection;

pub use connection::{
    create_in_memory_connection, create_tables, initialize_database, is_unique_violation,
};
