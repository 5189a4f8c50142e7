use crate::api::{ApiRequest, ApiResponse};
use crate::features::auth::models::User;
use crate::features::budgets::models::{Budget, BudgetFilter, CreateBudgetDto, UpdateBudgetDto};
use crate::features::budgets::status::aggregate_status;
use crate::features::transactions::models::{TransactionFilter, TransactionType};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::storage::ensure_owned;
use crate::shared::utils::dates::{canonical_month, current_timestamp, month_range};
use crate::shared::utils::validation::{trimmed, Validator};
use crate::AppState;

const RESOURCE: &str = "予算";

/// 予算一覧を取得する（month, category で絞り込み）
pub fn list_budgets(state: &AppState, user: &User, req: &ApiRequest) -> AppResult<ApiResponse> {
    let filter = BudgetFilter {
        month: req.query("month").map(canonical_month).transpose()?,
        category: req.query("category").map(str::to_string),
    };

    let budgets = state.storage.budgets.find_all(&user.id, &filter)?;
    ApiResponse::list(&budgets)
}

/// 予算を作成する
pub fn create_budget(state: &AppState, user: &User, req: &ApiRequest) -> AppResult<ApiResponse> {
    let dto: CreateBudgetDto = req.json()?;

    let mut validator = Validator::new();
    validator.required_text(dto.category.as_deref(), "カテゴリを入力してください");
    validator.required(dto.limit.as_ref(), "予算額を入力してください");
    validator.positive_amount(dto.limit, "予算額は正の数値である必要があります");
    validator.required_text(dto.month.as_deref(), "対象月をYYYY-MM形式で指定してください");
    let month = validate_month(&mut validator, dto.month.as_deref());
    validator.required(dto.currency.as_ref(), "通貨を指定してください");
    let currency = validator.currency(dto.currency.as_deref());
    validator.finish()?;

    let (Some(category), Some(limit), Some(month), Some(currency)) = (
        trimmed(dto.category),
        dto.limit,
        month,
        currency,
    ) else {
        return Err(AppError::validation("category, limit, month, currency は必須です"));
    };

    let budget = Budget {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user.id.clone(),
        category,
        limit,
        month,
        currency,
        created_at: current_timestamp(),
    };

    state.storage.budgets.create(&budget)?;
    log::info!(
        "予算を作成しました: user_id={}, budget_id={}, category={}, month={}",
        user.id,
        budget.id,
        budget.category,
        budget.month
    );

    ApiResponse::created(&budget)
}

/// 予算を1件取得する
pub fn get_budget(state: &AppState, user: &User, id: &str) -> AppResult<ApiResponse> {
    let budget = ensure_owned(state.storage.budgets.find_by_id(id)?, &user.id, RESOURCE)?;
    ApiResponse::ok(&budget)
}

/// 予算を更新する
pub fn update_budget(
    state: &AppState,
    user: &User,
    id: &str,
    req: &ApiRequest,
) -> AppResult<ApiResponse> {
    let mut budget = ensure_owned(state.storage.budgets.find_by_id(id)?, &user.id, RESOURCE)?;
    let dto: UpdateBudgetDto = req.json()?;

    let mut validator = Validator::new();
    if dto.category.is_some() {
        validator.required_text(dto.category.as_deref(), "カテゴリを入力してください");
    }
    validator.positive_amount(dto.limit, "予算額は正の数値である必要があります");
    let month = validate_month(&mut validator, dto.month.as_deref());
    let currency = validator.currency(dto.currency.as_deref());
    validator.finish()?;

    if let Some(category) = trimmed(dto.category) {
        budget.category = category;
    }
    if let Some(limit) = dto.limit {
        budget.limit = limit;
    }
    if let Some(month) = month {
        budget.month = month;
    }
    if let Some(currency) = currency {
        budget.currency = currency;
    }

    // 同じカテゴリ・月の予算があればバリデーションエラー
    state.storage.budgets.update(&budget)?;
    log::info!("予算を更新しました: user_id={}, budget_id={id}", user.id);

    ApiResponse::ok(&budget)
}

/// 予算を削除する
pub fn delete_budget(state: &AppState, user: &User, id: &str) -> AppResult<ApiResponse> {
    ensure_owned(state.storage.budgets.find_by_id(id)?, &user.id, RESOURCE)?;

    state.storage.budgets.delete(id)?;
    log::info!("予算を削除しました: user_id={}, budget_id={id}", user.id);

    Ok(ApiResponse::deleted())
}

/// 月の予算消化状況を取得する
///
/// クエリ: month（必須）、currency（指定時はすべての行を換算）
pub fn budget_status(state: &AppState, user: &User, req: &ApiRequest) -> AppResult<ApiResponse> {
    let month = req
        .query("month")
        .ok_or_else(|| AppError::validation("month パラメータは必須です（YYYY-MM形式）"))?;
    let month = canonical_month(month)?;
    let range = month_range(&month, state.config.timezone)?;
    let output_currency = req.query_currency("currency")?;

    let budgets = state.storage.budgets.find_all(
        &user.id,
        &BudgetFilter {
            month: Some(month.clone()),
            category: None,
        },
    )?;
    let expenses = state.storage.transactions.find_all(
        &user.id,
        &TransactionFilter {
            kind: Some(TransactionType::Expense),
            category: None,
            range,
        },
    )?;

    let rows = aggregate_status(
        &budgets,
        &expenses,
        user.default_currency,
        output_currency,
        &state.rates,
    );
    log::debug!(
        "予算状況を集計しました: user_id={}, month={month}, rows={}",
        user.id,
        rows.len()
    );

    Ok(ApiResponse::ok(&rows)?.with_field("month", month))
}

/// 月を検証し、正規形（YYYY-MM）で返す
fn validate_month(validator: &mut Validator, month: Option<&str>) -> Option<String> {
    let month = month.map(str::trim).filter(|m| !m.is_empty())?;
    match canonical_month(month) {
        Ok(month) => Some(month),
        Err(e) => {
            validator.push(e.user_message());
            None
        }
    }
}
