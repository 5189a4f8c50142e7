use crate::api::{ApiRequest, ApiResponse};
use crate::features::auth::models::User;
use crate::features::goals::models::{
    CreateGoalDto, Goal, GoalProgressDto, UpdateGoalDto, MAX_DESCRIPTION_LENGTH, MAX_TITLE_LENGTH,
};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::storage::ensure_owned;
use crate::shared::utils::dates::{current_timestamp, parse_datetime_input};
use crate::shared::utils::validation::{trimmed, Validator};
use crate::AppState;

const RESOURCE: &str = "目標";

/// 目標一覧を取得する（completed=true/false で絞り込み）
pub fn list_goals(state: &AppState, user: &User, req: &ApiRequest) -> AppResult<ApiResponse> {
    let goals = state
        .storage
        .goals
        .find_all(&user.id, req.query_bool("completed"))?;
    ApiResponse::list(&goals)
}

/// 目標を作成する
pub fn create_goal(state: &AppState, user: &User, req: &ApiRequest) -> AppResult<ApiResponse> {
    let dto: CreateGoalDto = req.json()?;
    let timezone = state.config.timezone;

    let mut validator = Validator::new();
    validator.required_text(dto.title.as_deref(), "タイトルを入力してください");
    validator.max_chars(
        dto.title.as_deref(),
        MAX_TITLE_LENGTH,
        "タイトルは100文字以内で入力してください",
    );
    validator.max_chars(
        dto.description.as_deref(),
        MAX_DESCRIPTION_LENGTH,
        "説明は500文字以内で入力してください",
    );
    validator.required(dto.target_amount.as_ref(), "目標金額を入力してください");
    validator.positive_amount(dto.target_amount, "目標金額は正の数値である必要があります");
    validator.non_negative_amount(dto.current_amount, "現在の金額は0以上である必要があります");
    validator.required_text(dto.deadline.as_deref(), "期限を指定してください");
    let deadline = dto
        .deadline
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| match parse_datetime_input(value, timezone) {
            Ok(deadline) => Some(deadline),
            Err(e) => {
                validator.push(e.user_message());
                None
            }
        });
    validator.required(dto.currency.as_ref(), "通貨を指定してください");
    let currency = validator.currency(dto.currency.as_deref());
    validator.finish()?;

    let (Some(title), Some(target_amount), Some(deadline), Some(currency)) =
        (trimmed(dto.title), dto.target_amount, deadline, currency)
    else {
        return Err(AppError::validation(
            "title, targetAmount, deadline, currency は必須です",
        ));
    };

    let mut goal = Goal {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        title,
        description: trimmed(dto.description),
        target_amount,
        current_amount: dto.current_amount.unwrap_or(0.0),
        deadline,
        currency,
        completed: dto.completed.unwrap_or(false),
        created_at: current_timestamp(),
    };
    goal.refresh_completion();

    state.storage.goals.create(&goal)?;
    log::info!(
        "目標を作成しました: user_id={}, goal_id={}",
        user.id,
        goal.id
    );

    ApiResponse::created(&goal)
}

/// 目標を1件取得する
pub fn get_goal(state: &AppState, user: &User, id: &str) -> AppResult<ApiResponse> {
    let goal = ensure_owned(state.storage.goals.find_by_id(id)?, &user.id, RESOURCE)?;
    ApiResponse::ok(&goal)
}

/// 目標を更新する
///
/// 積立額が目標金額に達した場合は自動的に達成済みになる。
pub fn update_goal(
    state: &AppState,
    user: &User,
    id: &str,
    req: &ApiRequest,
) -> AppResult<ApiResponse> {
    let mut goal = ensure_owned(state.storage.goals.find_by_id(id)?, &user.id, RESOURCE)?;
    let dto: UpdateGoalDto = req.json()?;

    let mut validator = Validator::new();
    if dto.title.is_some() {
        validator.required_text(dto.title.as_deref(), "タイトルを入力してください");
    }
    validator.max_chars(
        dto.title.as_deref(),
        MAX_TITLE_LENGTH,
        "タイトルは100文字以内で入力してください",
    );
    validator.max_chars(
        dto.description.as_deref(),
        MAX_DESCRIPTION_LENGTH,
        "説明は500文字以内で入力してください",
    );
    validator.positive_amount(dto.target_amount, "目標金額は正の数値である必要があります");
    validator.non_negative_amount(dto.current_amount, "現在の金額は0以上である必要があります");
    let deadline = dto
        .deadline
        .as_deref()
        .and_then(|value| match parse_datetime_input(value, state.config.timezone) {
            Ok(deadline) => Some(deadline),
            Err(e) => {
                validator.push(e.user_message());
                None
            }
        });
    let currency = validator.currency(dto.currency.as_deref());
    validator.finish()?;

    if let Some(title) = trimmed(dto.title) {
        goal.title = title;
    }
    if let Some(description) = dto.description {
        goal.description = trimmed(Some(description));
    }
    if let Some(target_amount) = dto.target_amount {
        goal.target_amount = target_amount;
    }
    if let Some(current_amount) = dto.current_amount {
        goal.current_amount = current_amount;
    }
    if let Some(deadline) = deadline {
        goal.deadline = deadline;
    }
    if let Some(currency) = currency {
        goal.currency = currency;
    }
    if let Some(completed) = dto.completed {
        goal.completed = completed;
    }
    goal.refresh_completion();

    state.storage.goals.update(&goal)?;
    log::info!("目標を更新しました: user_id={}, goal_id={id}", user.id);

    ApiResponse::ok(&goal)
}

/// 目標を削除する
pub fn delete_goal(state: &AppState, user: &User, id: &str) -> AppResult<ApiResponse> {
    ensure_owned(state.storage.goals.find_by_id(id)?, &user.id, RESOURCE)?;

    state.storage.goals.delete(id)?;
    log::info!("目標を削除しました: user_id={}, goal_id={id}", user.id);

    Ok(ApiResponse::deleted())
}

/// 目標に積立額を追加する
///
/// # 処理内容
/// 1. 金額の検証（0は不可）
/// 2. 通貨が異なる場合は目標の通貨に換算
/// 3. 積立額に加算し、目標金額に達していれば達成済みにする
pub fn add_goal_progress(
    state: &AppState,
    user: &User,
    id: &str,
    req: &ApiRequest,
) -> AppResult<ApiResponse> {
    let dto: GoalProgressDto = req.json()?;

    let mut validator = Validator::new();
    match dto.amount {
        Some(amount) if amount.is_finite() && amount != 0.0 => {}
        _ => validator.push("金額を入力してください"),
    }
    let currency = validator.currency(dto.currency.as_deref());
    validator.finish()?;

    let amount = dto
        .amount
        .ok_or_else(|| AppError::validation("金額を入力してください"))?;

    let mut goal = ensure_owned(state.storage.goals.find_by_id(id)?, &user.id, RESOURCE)?;

    let converted = match currency {
        Some(currency) => state.rates.convert(amount, currency, goal.currency),
        None => amount,
    };
    goal.current_amount += converted;
    goal.refresh_completion();

    state.storage.goals.update(&goal)?;
    log::info!(
        "目標の積立額を更新しました: user_id={}, goal_id={id}, added={converted}, current={}",
        user.id,
        goal.current_amount
    );

    ApiResponse::ok(&goal)
}
