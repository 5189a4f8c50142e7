use crate::api::{ApiRequest, ApiResponse};
use crate::features::auth::models::User;
use crate::features::transactions::models::{
    CreateTransactionDto, Transaction, TransactionFilter, TransactionType, UpdateTransactionDto,
    MAX_NOTES_LENGTH,
};
use crate::features::transactions::summary::summarize;
use crate::shared::currency::normalize_amounts;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::storage::ensure_owned;
use crate::shared::utils::dates::{
    current_timestamp, date_range, month_range, parse_datetime_input, DateRange,
};
use crate::shared::utils::validation::{trimmed, Validator};
use crate::AppState;
use chrono_tz::Tz;

const RESOURCE: &str = "取引";

/// 取引一覧を取得する
///
/// クエリ: type, category, startDate, endDate, month, normalize, currency
pub fn list_transactions(
    state: &AppState,
    user: &User,
    req: &ApiRequest,
) -> AppResult<ApiResponse> {
    let kind = req
        .query("type")
        .map(|value| value.parse::<TransactionType>().map_err(AppError::Validation))
        .transpose()?;

    let filter = TransactionFilter {
        kind,
        category: req.query("category").map(str::to_string),
        range: requested_range(req, state.config.timezone)?,
    };

    let transactions = state.storage.transactions.find_all(&user.id, &filter)?;
    log::debug!(
        "取引一覧を取得しました: user_id={}, count={}",
        user.id,
        transactions.len()
    );

    // 基準通貨への正規化（normalize=true かつ通貨指定時のみ）
    if req.query_bool("normalize") == Some(true) {
        if let Some(currency) = req.query_currency("currency")? {
            let normalized = normalize_amounts(&transactions, currency, &state.rates);
            return ApiResponse::list(&normalized);
        }
    }

    ApiResponse::list(&transactions)
}

/// 取引を作成する
pub fn create_transaction(
    state: &AppState,
    user: &User,
    req: &ApiRequest,
) -> AppResult<ApiResponse> {
    let dto: CreateTransactionDto = req.json()?;
    let transaction = build_transaction(dto, &user.id, state.config.timezone)?;

    state.storage.transactions.create(&transaction)?;
    log::info!(
        "取引を作成しました: user_id={}, transaction_id={}",
        user.id,
        transaction.id
    );

    ApiResponse::created(&transaction)
}

/// 取引を1件取得する
pub fn get_transaction(state: &AppState, user: &User, id: &str) -> AppResult<ApiResponse> {
    let transaction = ensure_owned(state.storage.transactions.find_by_id(id)?, &user.id, RESOURCE)?;
    ApiResponse::ok(&transaction)
}

/// 取引を更新する
pub fn update_transaction(
    state: &AppState,
    user: &User,
    id: &str,
    req: &ApiRequest,
) -> AppResult<ApiResponse> {
    let mut transaction =
        ensure_owned(state.storage.transactions.find_by_id(id)?, &user.id, RESOURCE)?;

    let dto: UpdateTransactionDto = req.json()?;
    apply_update(&mut transaction, dto, state.config.timezone)?;

    state.storage.transactions.update(&transaction)?;
    log::info!("取引を更新しました: user_id={}, transaction_id={id}", user.id);

    ApiResponse::ok(&transaction)
}

/// 取引を削除する
pub fn delete_transaction(state: &AppState, user: &User, id: &str) -> AppResult<ApiResponse> {
    ensure_owned(state.storage.transactions.find_by_id(id)?, &user.id, RESOURCE)?;

    state.storage.transactions.delete(id)?;
    log::info!("取引を削除しました: user_id={}, transaction_id={id}", user.id);

    Ok(ApiResponse::deleted())
}

/// 取引の集計を取得する
///
/// クエリ: month または startDate/endDate、currency（未指定時はユーザーの既定通貨）
pub fn transaction_summary(
    state: &AppState,
    user: &User,
    req: &ApiRequest,
) -> AppResult<ApiResponse> {
    let filter = TransactionFilter {
        range: requested_range(req, state.config.timezone)?,
        ..Default::default()
    };
    let currency = req
        .query_currency("currency")?
        .unwrap_or(user.default_currency);

    let transactions = state.storage.transactions.find_all(&user.id, &filter)?;
    let summary = summarize(&transactions, currency, &state.rates);

    ApiResponse::ok(&summary)
}

/// month 指定を優先し、なければ startDate/endDate から期間を決める
fn requested_range(req: &ApiRequest, timezone: Tz) -> AppResult<DateRange> {
    match req.query("month") {
        Some(month) => month_range(month, timezone),
        None => date_range(req.query("startDate"), req.query("endDate"), timezone),
    }
}

/// 取引作成DTOを検証して取引を作成する
fn build_transaction(
    dto: CreateTransactionDto,
    user_id: &str,
    timezone: Tz,
) -> AppResult<Transaction> {
    let mut validator = Validator::new();

    validator.required(dto.kind.as_ref(), "取引の種類を指定してください");
    let kind = dto.kind.as_deref().and_then(|value| match value.parse::<TransactionType>() {
        Ok(kind) => Some(kind),
        Err(message) => {
            validator.push(message);
            None
        }
    });
    validator.required_text(dto.category.as_deref(), "カテゴリを入力してください");
    validator.required(dto.amount.as_ref(), "金額を入力してください");
    validator.positive_amount(dto.amount, "金額は正の数値である必要があります");
    validator.required(dto.currency.as_ref(), "通貨を指定してください");
    let currency = validator.currency(dto.currency.as_deref());
    validator.max_chars(
        dto.notes.as_deref(),
        MAX_NOTES_LENGTH,
        "メモは500文字以内で入力してください",
    );
    let date = dto
        .date
        .as_deref()
        .and_then(|value| match parse_datetime_input(value, timezone) {
            Ok(date) => Some(date),
            Err(e) => {
                validator.push(e.user_message());
                None
            }
        });
    validator.finish()?;

    let (Some(kind), Some(amount), Some(currency), Some(category)) =
        (kind, dto.amount, currency, trimmed(dto.category))
    else {
        return Err(AppError::validation(
            "type, category, amount, currency は必須です",
        ));
    };

    let now = current_timestamp();
    Ok(Transaction {
        id: uuid::Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        kind,
        category,
        amount,
        currency,
        date: date.unwrap_or(now),
        notes: trimmed(dto.notes),
        created_at: now,
    })
}

/// 更新DTOを検証して取引に適用する
fn apply_update(
    transaction: &mut Transaction,
    dto: UpdateTransactionDto,
    timezone: Tz,
) -> AppResult<()> {
    let mut validator = Validator::new();

    let kind = dto.kind.as_deref().and_then(|value| match value.parse::<TransactionType>() {
        Ok(kind) => Some(kind),
        Err(message) => {
            validator.push(message);
            None
        }
    });
    if dto.category.is_some() {
        validator.required_text(dto.category.as_deref(), "カテゴリを入力してください");
    }
    validator.positive_amount(dto.amount, "金額は正の数値である必要があります");
    let currency = validator.currency(dto.currency.as_deref());
    validator.max_chars(
        dto.notes.as_deref(),
        MAX_NOTES_LENGTH,
        "メモは500文字以内で入力してください",
    );
    let date = dto
        .date
        .as_deref()
        .and_then(|value| match parse_datetime_input(value, timezone) {
            Ok(date) => Some(date),
            Err(e) => {
                validator.push(e.user_message());
                None
            }
        });
    validator.finish()?;

    if let Some(kind) = kind {
        transaction.kind = kind;
    }
    if let Some(category) = trimmed(dto.category) {
        transaction.category = category;
    }
    if let Some(amount) = dto.amount {
        transaction.amount = amount;
    }
    if let Some(currency) = currency {
        transaction.currency = currency;
    }
    if let Some(date) = date {
        transaction.date = date;
    }
    if let Some(notes) = dto.notes {
        // 空文字列はメモの削除
        transaction.notes = trimmed(Some(notes));
    }

    Ok(())
}
