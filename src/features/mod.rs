/// 機能別モジュール
///
/// 各機能モジュールは、その機能に関連するコード（モデル、リポジトリ、ハンドラー）を含む自己完結型のユニットです。
pub mod auth;
pub mod budgets;
pub mod goals;
pub mod insights;
pub mod reminders;
pub mod transactions;
