use crate::features::reminders::models::Reminder;
use crate::features::reminders::recurrence::advance;
use crate::features::reminders::repository::ReminderRepository;
use crate::shared::errors::AppResult;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

/// リマインダーの通知先
pub trait ReminderNotifier: Send + Sync {
    fn notify(&self, reminder: &Reminder) -> AppResult<()>;
}

/// ログに出力するだけの通知先
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl ReminderNotifier for LogNotifier {
    fn notify(&self, reminder: &Reminder) -> AppResult<()> {
        log::info!(
            "リマインダー通知: user_id={}, reminder_id={}, type={}, message={}",
            reminder.user_id,
            reminder.id,
            reminder.kind,
            reminder.message
        );
        Ok(())
    }
}

/// 1回の巡回結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// 通知して状態を更新できた件数
    pub fired: usize,
    /// 通知または更新に失敗した件数
    pub failed: usize,
}

/// 期限の来たリマインダーを通知し、次回日時へ進める
#[derive(Clone)]
pub struct ReminderEngine {
    reminders: Arc<dyn ReminderRepository>,
    notifier: Arc<dyn ReminderNotifier>,
    timezone: Tz,
}

impl ReminderEngine {
    pub fn new(
        reminders: Arc<dyn ReminderRepository>,
        notifier: Arc<dyn ReminderNotifier>,
        timezone: Tz,
    ) -> Self {
        Self {
            reminders,
            notifier,
            timezone,
        }
    }

    /// 1回分の巡回を実行する
    ///
    /// # 引数
    /// * `now` - 判定に使う現在時刻
    ///
    /// # 戻り値
    /// 巡回結果。期限到来の検索自体に失敗した場合のみエラー
    ///
    /// 個々のリマインダーの失敗はログに記録して次へ進む。
    pub fn run_cycle(&self, now: DateTime<Utc>) -> AppResult<CycleReport> {
        let due = self.reminders.find_due(now)?;
        let mut report = CycleReport::default();

        for mut reminder in due {
            match self.fire(&mut reminder) {
                Ok(()) => report.fired += 1,
                Err(e) => {
                    report.failed += 1;
                    log::error!(
                        "リマインダーの処理に失敗しました: reminder_id={}, error={}",
                        reminder.id,
                        e.details()
                    );
                }
            }
        }

        if report.fired > 0 || report.failed > 0 {
            log::info!(
                "リマインダー巡回完了: fired={}, failed={}",
                report.fired,
                report.failed
            );
        }

        Ok(report)
    }

    fn fire(&self, reminder: &mut Reminder) -> AppResult<()> {
        self.notifier.notify(reminder)?;
        advance(reminder, self.timezone);
        self.reminders.update(reminder)?;

        log::debug!(
            "リマインダーを更新しました: reminder_id={}, is_active={}, next={}",
            reminder.id,
            reminder.is_active,
            reminder.date_time
        );
        Ok(())
    }
}
