use crate::api::ApiResponse;
use crate::features::auth::models::User;
use crate::features::insights::categories::suggested_categories;
use crate::features::insights::prompt::build_advice_prompt;
use crate::features::insights::provider::fallback_message;
use crate::features::transactions::models::TransactionFilter;
use crate::shared::currency::normalize_amounts;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::dates::DateRange;
use crate::AppState;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// アドバイスの対象期間（日数）
const ADVICE_PERIOD_DAYS: i64 = 30;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AdviceResponse {
    insights: String,
    transaction_count: usize,
    date_range: AdviceDateRange,
}

#[derive(Debug, Serialize)]
struct AdviceDateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// 直近30日の取引からAIアドバイスを生成する
///
/// # 処理内容
/// 1. 直近30日の取引を取得（0件の場合はバリデーションエラー）
/// 2. ユーザーの既定通貨に換算
/// 3. プロバイダーでアドバイス文を生成（失敗時は説明文を返す）
pub async fn financial_advice(state: &AppState, user: &User) -> AppResult<ApiResponse> {
    let end = Utc::now();
    let start = end - Duration::days(ADVICE_PERIOD_DAYS);

    // 期間の終端を含める
    let filter = TransactionFilter {
        range: DateRange {
            start: Some(start),
            end: Some(end + Duration::milliseconds(1)),
        },
        ..Default::default()
    };
    let transactions = state.storage.transactions.find_all(&user.id, &filter)?;

    if transactions.is_empty() {
        return Err(AppError::validation(
            "直近30日間の取引がありません。先に取引を追加してください。",
        ));
    }

    let normalized = normalize_amounts(&transactions, user.default_currency, &state.rates);
    let prompt = build_advice_prompt(&normalized, user.default_currency);

    let insights = match state.insights.generate(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            log::warn!(
                "AIアドバイスの生成に失敗しました: user_id={}, error={}",
                user.id,
                e.details()
            );
            fallback_message(&e).to_string()
        }
    };

    log::info!(
        "AIアドバイスを生成しました: user_id={}, transaction_count={}",
        user.id,
        transactions.len()
    );

    ApiResponse::ok(&AdviceResponse {
        insights,
        transaction_count: transactions.len(),
        date_range: AdviceDateRange { start, end },
    })
}

/// 推奨カテゴリ一覧を取得する
pub fn categories() -> AppResult<ApiResponse> {
    ApiResponse::ok(&suggested_categories())
}
