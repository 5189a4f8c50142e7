use crate::api::{ApiRequest, ApiResponse};
use crate::features::auth::models::User;
use crate::features::reminders::models::{
    CreateReminderDto, Frequency, Reminder, ReminderFilter, ReminderType, UpdateReminderDto,
    MAX_MESSAGE_LENGTH,
};
use crate::features::reminders::recurrence::{budget_check_reminder, log_expense_reminder};
use crate::features::reminders::repository::ReminderRepository;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::storage::ensure_owned;
use crate::shared::utils::dates::{current_timestamp, parse_datetime_input};
use crate::shared::utils::validation::{trimmed, Validator};
use crate::AppState;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

const RESOURCE: &str = "リマインダー";

/// リマインダー一覧を取得する（active, type で絞り込み）
pub fn list_reminders(state: &AppState, user: &User, req: &ApiRequest) -> AppResult<ApiResponse> {
    let kind = req
        .query("type")
        .map(|value| value.parse::<ReminderType>().map_err(AppError::Validation))
        .transpose()?;
    let filter = ReminderFilter {
        active: req.query_bool("active"),
        kind,
    };

    let reminders = state.storage.reminders.find_all(&user.id, &filter)?;
    ApiResponse::list(&reminders)
}

/// リマインダーを作成する
pub fn create_reminder(state: &AppState, user: &User, req: &ApiRequest) -> AppResult<ApiResponse> {
    let dto: CreateReminderDto = req.json()?;
    let timezone = state.config.timezone;

    let mut validator = Validator::new();
    validator.required(dto.kind.as_ref(), "リマインダーの種類を指定してください");
    let kind = parse_field::<ReminderType>(&mut validator, dto.kind.as_deref());
    validator.required_text(dto.message.as_deref(), "メッセージを入力してください");
    validator.max_chars(
        dto.message.as_deref(),
        MAX_MESSAGE_LENGTH,
        "メッセージは200文字以内で入力してください",
    );
    validator.required_text(dto.date_time.as_deref(), "日時を指定してください");
    let date_time = parse_date_time(&mut validator, dto.date_time.as_deref(), timezone);
    let frequency = parse_field::<Frequency>(&mut validator, dto.frequency.as_deref());
    validator.finish()?;

    let (Some(kind), Some(message), Some(date_time)) = (kind, trimmed(dto.message), date_time)
    else {
        return Err(AppError::validation("type, message, dateTime は必須です"));
    };

    let reminder = Reminder {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        kind,
        message,
        date_time,
        frequency: frequency.unwrap_or_default(),
        is_active: dto.is_active.unwrap_or(true),
        created_at: current_timestamp(),
    };

    state.storage.reminders.create(&reminder)?;
    log::info!(
        "リマインダーを作成しました: user_id={}, reminder_id={}, type={}",
        user.id,
        reminder.id,
        reminder.kind
    );

    ApiResponse::created(&reminder)
}

/// リマインダーを1件取得する
pub fn get_reminder(state: &AppState, user: &User, id: &str) -> AppResult<ApiResponse> {
    let reminder = ensure_owned(state.storage.reminders.find_by_id(id)?, &user.id, RESOURCE)?;
    ApiResponse::ok(&reminder)
}

/// リマインダーを更新する
pub fn update_reminder(
    state: &AppState,
    user: &User,
    id: &str,
    req: &ApiRequest,
) -> AppResult<ApiResponse> {
    let mut reminder = ensure_owned(state.storage.reminders.find_by_id(id)?, &user.id, RESOURCE)?;
    let dto: UpdateReminderDto = req.json()?;

    let mut validator = Validator::new();
    let kind = parse_field::<ReminderType>(&mut validator, dto.kind.as_deref());
    if dto.message.is_some() {
        validator.required_text(dto.message.as_deref(), "メッセージを入力してください");
    }
    validator.max_chars(
        dto.message.as_deref(),
        MAX_MESSAGE_LENGTH,
        "メッセージは200文字以内で入力してください",
    );
    let date_time =
        parse_date_time(&mut validator, dto.date_time.as_deref(), state.config.timezone);
    let frequency = parse_field::<Frequency>(&mut validator, dto.frequency.as_deref());
    validator.finish()?;

    if let Some(kind) = kind {
        reminder.kind = kind;
    }
    if let Some(message) = trimmed(dto.message) {
        reminder.message = message;
    }
    if let Some(date_time) = date_time {
        reminder.date_time = date_time;
    }
    if let Some(frequency) = frequency {
        reminder.frequency = frequency;
    }
    if let Some(is_active) = dto.is_active {
        reminder.is_active = is_active;
    }

    state.storage.reminders.update(&reminder)?;
    log::info!("リマインダーを更新しました: user_id={}, reminder_id={id}", user.id);

    ApiResponse::ok(&reminder)
}

/// リマインダーを削除する
pub fn delete_reminder(state: &AppState, user: &User, id: &str) -> AppResult<ApiResponse> {
    ensure_owned(state.storage.reminders.find_by_id(id)?, &user.id, RESOURCE)?;

    state.storage.reminders.delete(id)?;
    log::info!("リマインダーを削除しました: user_id={}, reminder_id={id}", user.id);

    Ok(ApiResponse::deleted())
}

/// 既定のリマインダーを作成する
///
/// 毎月の予算確認（25日 10:00）と毎日の支出記録（20:00）の2件。
pub fn create_default_reminders(state: &AppState, user: &User) -> AppResult<ApiResponse> {
    let now = Utc::now();
    let timezone = state.config.timezone;

    let reminders = [
        budget_check_reminder(&user.id, now, timezone),
        log_expense_reminder(&user.id, now, timezone),
    ];
    create_all(state.storage.reminders.as_ref(), &reminders)?;

    log::info!("既定のリマインダーを作成しました: user_id={}", user.id);

    ApiResponse::created(&reminders)
}

/// リマインダーをまとめて保存する（途中で失敗した場合は作成済みの分を削除する）
fn create_all(repo: &dyn ReminderRepository, reminders: &[Reminder]) -> AppResult<()> {
    for (index, reminder) in reminders.iter().enumerate() {
        if let Err(e) = repo.create(reminder) {
            for created in &reminders[..index] {
                if let Err(rollback) = repo.delete(&created.id) {
                    log::error!(
                        "作成済みリマインダーの削除に失敗しました: reminder_id={}, error={}",
                        created.id,
                        rollback.details()
                    );
                }
            }
            return Err(e);
        }
    }
    Ok(())
}

fn parse_field<T>(validator: &mut Validator, value: Option<&str>) -> Option<T>
where
    T: FromStr<Err = String>,
{
    match value?.parse::<T>() {
        Ok(parsed) => Some(parsed),
        Err(message) => {
            validator.push(message);
            None
        }
    }
}

fn parse_date_time(
    validator: &mut Validator,
    value: Option<&str>,
    timezone: Tz,
) -> Option<DateTime<Utc>> {
    let value = value.filter(|v| !v.trim().is_empty())?;
    match parse_datetime_input(value, timezone) {
        Ok(date_time) => Some(date_time),
        Err(e) => {
            validator.push(e.user_message());
            None
        }
    }
}
