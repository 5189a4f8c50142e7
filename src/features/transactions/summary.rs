use crate::features::transactions::models::{Transaction, TransactionType};
use crate::shared::currency::{normalize_amounts, Currency, ExchangeRates};
use serde::Serialize;
use std::collections::BTreeMap;

/// 種類ごとの合計
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotals {
    pub total: f64,
    pub by_category: BTreeMap<String, f64>,
}

impl CategoryTotals {
    fn add(&mut self, category: &str, amount: f64) {
        self.total += amount;
        *self.by_category.entry(category.to_string()).or_insert(0.0) += amount;
    }
}

/// 取引の集計結果
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub income: CategoryTotals,
    pub expense: CategoryTotals,
    pub net_cashflow: f64,
    pub currency: Currency,
}

/// 取引を集計する
///
/// # 引数
/// * `transactions` - 集計対象の取引
/// * `currency` - 集計に使う通貨（すべての取引をこの通貨に換算する）
/// * `rates` - 為替レート表
///
/// # 戻り値
/// 収入・支出それぞれの合計とカテゴリ別小計、および収支
pub fn summarize(
    transactions: &[Transaction],
    currency: Currency,
    rates: &ExchangeRates,
) -> TransactionSummary {
    let mut income = CategoryTotals::default();
    let mut expense = CategoryTotals::default();

    for normalized in normalize_amounts(transactions, currency, rates) {
        let transaction = &normalized.record;
        match transaction.kind {
            TransactionType::Income => {
                income.add(&transaction.category, normalized.normalized_amount)
            }
            TransactionType::Expense => {
                expense.add(&transaction.category, normalized.normalized_amount)
            }
        }
    }

    let net_cashflow = income.total - expense.total;

    TransactionSummary {
        income,
        expense,
        net_cashflow,
        currency,
    }
}
