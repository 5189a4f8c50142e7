use crate::features::transactions::models::Transaction;
use crate::features::transactions::summary::summarize;
use crate::shared::currency::{Currency, ExchangeRates, Normalized};
use serde::Serialize;
use std::fmt::Write;

/// プロンプトに埋め込む取引1件分
#[derive(Debug, Serialize)]
struct PromptTransaction<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    category: &'a str,
    amount: f64,
    currency: Currency,
    date: String,
    notes: &'a str,
}

/// AIアドバイス用のプロンプトを作成する
///
/// # 引数
/// * `transactions` - 基準通貨に換算済みの取引
/// * `currency` - 基準通貨（ユーザーの既定通貨）
///
/// # 戻り値
/// 集計値と取引履歴を含むプロンプト文字列
pub fn build_advice_prompt(transactions: &[Normalized<Transaction>], currency: Currency) -> String {
    let records: Vec<Transaction> = transactions
        .iter()
        .map(|n| Transaction {
            amount: n.normalized_amount,
            currency: n.normalized_currency,
            ..n.record.clone()
        })
        .collect();
    // 換算済みの金額で集計する
    let summary = summarize(&records, currency, &ExchangeRates::default());

    let history: Vec<PromptTransaction<'_>> = records
        .iter()
        .map(|t| PromptTransaction {
            kind: t.kind.as_str(),
            category: &t.category,
            amount: t.amount,
            currency: t.currency,
            date: t.date.format("%Y-%m-%d").to_string(),
            notes: t.notes.as_deref().unwrap_or(""),
        })
        .collect();
    let history = serde_json::to_string_pretty(&history).unwrap_or_else(|_| "[]".to_string());

    let mut categories = String::new();
    for (category, amount) in &summary.expense.by_category {
        let _ = writeln!(categories, "- {category}: {amount:.2}");
    }

    format!(
        "あなたは個人の家計アドバイザーです。ユーザーの最近の収支を分析してください。\n\
         以下の取引データ（金額の単位: {currency}）に基づいて回答してください。\n\
         \n\
         総収入: {income:.2}\n\
         総支出: {expense:.2}\n\
         収支: {net:.2}\n\
         \n\
         支出カテゴリ:\n\
         {categories}\n\
         取引履歴:\n\
         {history}\n\
         \n\
         次の4点を含む、具体的で実行しやすいアドバイスを作成してください。\n\
         1. 支出傾向の分析: 取引から読み取れる主な傾向を1〜2点挙げる\n\
         2. 予算の提案: 支出に基づいて見直すべき予算を1つ提案する\n\
         3. 貯蓄の機会: 貯蓄を増やす具体的な方法を1つ挙げる\n\
         4. 家計の健全度: 収支の比率、支出傾向、カテゴリの偏りから1〜10で評価する\n\
         \n\
         回答全体は800文字以内とし、実際のデータに即した内容にしてください。",
        income = summary.income.total,
        expense = summary.expense.total,
        net = summary.net_cashflow,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::transactions::models::TransactionType;
    use crate::shared::currency::normalize_amounts;
    use chrono::Utc;

    fn transaction(
        kind: TransactionType,
        category: &str,
        amount: f64,
        currency: Currency,
    ) -> Transaction {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            kind,
            category: category.to_string(),
            amount,
            currency,
            date: Utc::now(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_prompt_contains_normalized_totals() {
        let transactions = vec![
            transaction(TransactionType::Income, "Salary", 100.0, Currency::Usd),
            transaction(TransactionType::Expense, "Groceries", 40.0, Currency::Usd),
            transaction(TransactionType::Expense, "Travel", 10.0, Currency::Eur),
        ];
        let normalized = normalize_amounts(&transactions, Currency::Usd, &ExchangeRates::default());

        let prompt = build_advice_prompt(&normalized, Currency::Usd);

        assert!(prompt.contains("金額の単位: USD"));
        assert!(prompt.contains("総収入: 100.00"));
        assert!(prompt.contains("総支出: 50.90"));
        assert!(prompt.contains("- Groceries: 40.00"));
        assert!(prompt.contains("- Travel: 10.90"));
        assert!(prompt.contains("\"category\": \"Salary\""));
    }
}
