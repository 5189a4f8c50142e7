/// 予算機能モジュール
///
/// 月別・カテゴリ別の予算管理と、支出に対する消化状況の集計を提供する。
pub mod handlers;
pub mod models;
pub mod repository;
pub mod status;

pub use models::{Budget, BudgetFilter, BudgetState, BudgetStatus};
pub use repository::{BudgetRepository, FileBudgetRepository, SqliteBudgetRepository};
pub use status::aggregate_status;
