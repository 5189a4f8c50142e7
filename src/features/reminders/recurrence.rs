use crate::features::reminders::models::{Frequency, Reminder, ReminderType};
use crate::shared::utils::dates::{current_timestamp, local_time_on, resolve_local};
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use chrono_tz::Tz;

/// 予算確認リマインダーの日（毎月25日）
const BUDGET_CHECK_DAY: u32 = 25;
const BUDGET_CHECK_HOUR: u32 = 10;
const LOG_EXPENSE_HOUR: u32 = 20;

pub const BUDGET_CHECK_MESSAGE: &str = "今月の予算を確認しましょう。月末までの支出を見直す時期です。";
pub const LOG_EXPENSE_MESSAGE: &str = "今日の支出を記録しましょう！";

/// 通知時刻に達しているかどうか
pub fn is_due(reminder: &Reminder, now: DateTime<Utc>) -> bool {
    reminder.is_active && reminder.date_time <= now
}

/// 次回の通知日時を計算する
///
/// 繰り返しは `timezone` の現地時刻で数えるため、夏時間をまたいでも通知時刻は変わらない。
/// 月次で翌月に同じ日がない場合は月末日に丸める（1月31日 → 2月29日）。
///
/// # 戻り値
/// 次回の日時、一度きり（once）の場合は None
pub fn next_occurrence(
    date_time: DateTime<Utc>,
    frequency: Frequency,
    timezone: Tz,
) -> Option<DateTime<Utc>> {
    let local = date_time.with_timezone(&timezone).naive_local();

    let next = match frequency {
        Frequency::Once => return None,
        Frequency::Daily => local.checked_add_days(Days::new(1)),
        Frequency::Weekly => local.checked_add_days(Days::new(7)),
        Frequency::Monthly => local.checked_add_months(Months::new(1)),
    }?;

    Some(resolve_local(next, timezone))
}

/// 通知後の状態に進める
///
/// 一度きりのリマインダーは無効化し、繰り返しのリマインダーは次回日時に進める。
pub fn advance(reminder: &mut Reminder, timezone: Tz) {
    match next_occurrence(reminder.date_time, reminder.frequency, timezone) {
        Some(next) => reminder.date_time = next,
        None => reminder.is_active = false,
    }
}

/// 予算確認リマインダーの初回日時
///
/// 今月25日の10:00（現地時刻）。今日が25日を過ぎていれば翌月25日。
pub fn budget_check_schedule(now: DateTime<Utc>, timezone: Tz) -> DateTime<Utc> {
    let today = now.with_timezone(&timezone).date_naive();
    let first_of_month = today.with_day(1).unwrap_or(today);

    let month_start = if today.day() > BUDGET_CHECK_DAY {
        first_of_month
            .checked_add_months(Months::new(1))
            .unwrap_or(first_of_month)
    } else {
        first_of_month
    };
    let target = NaiveDate::from_ymd_opt(month_start.year(), month_start.month(), BUDGET_CHECK_DAY)
        .unwrap_or(month_start);

    local_time_on(target, BUDGET_CHECK_HOUR, 0, timezone)
}

/// 支出記録リマインダーの初回日時（今日の20:00、現地時刻）
pub fn log_expense_schedule(now: DateTime<Utc>, timezone: Tz) -> DateTime<Utc> {
    let today = now.with_timezone(&timezone).date_naive();
    local_time_on(today, LOG_EXPENSE_HOUR, 0, timezone)
}

/// 毎月の予算確認リマインダーを作成する
pub fn budget_check_reminder(user_id: &str, now: DateTime<Utc>, timezone: Tz) -> Reminder {
    Reminder {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind: ReminderType::BudgetCheck,
        message: BUDGET_CHECK_MESSAGE.to_string(),
        date_time: budget_check_schedule(now, timezone),
        frequency: Frequency::Monthly,
        is_active: true,
        created_at: current_timestamp(),
    }
}

/// 毎日の支出記録リマインダーを作成する
pub fn log_expense_reminder(user_id: &str, now: DateTime<Utc>, timezone: Tz) -> Reminder {
    Reminder {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind: ReminderType::LogExpense,
        message: LOG_EXPENSE_MESSAGE.to_string(),
        date_time: log_expense_schedule(now, timezone),
        frequency: Frequency::Daily,
        is_active: true,
        created_at: current_timestamp(),
    }
}
