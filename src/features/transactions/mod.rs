/// 取引機能モジュール
///
/// 収入・支出の記録、一覧の絞り込み、通貨換算付きの集計を提供する。
pub mod handlers;
pub mod models;
pub mod repository;
pub mod summary;

pub use models::{Transaction, TransactionFilter, TransactionType};
pub use repository::{FileTransactionRepository, SqliteTransactionRepository, TransactionRepository};
pub use summary::{summarize, TransactionSummary};
