/// リマインダー機能モジュール
///
/// リマインダーのCRUDに加えて、期限の来たリマインダーを定期的に巡回し
/// 通知後に次回日時へ進める（一度きりのものは無効化する）エンジンを提供する。
pub mod engine;
pub mod handlers;
pub mod models;
pub mod recurrence;
pub mod repository;
pub mod scheduler;

pub use engine::{CycleReport, LogNotifier, ReminderEngine, ReminderNotifier};
pub use models::{Frequency, Reminder, ReminderFilter, ReminderType};
pub use repository::{FileReminderRepository, ReminderRepository, SqliteReminderRepository};
pub use scheduler::start_reminder_scheduler;
