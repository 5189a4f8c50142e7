use crate::features::budgets::models::{Budget, BudgetState, BudgetStatus};
use crate::features::transactions::models::{Transaction, TransactionType};
use crate::shared::currency::{Currency, ExchangeRates};
use std::collections::BTreeMap;

/// 予算ごとの消化状況を集計する
///
/// # 引数
/// * `budgets` - 対象月の予算
/// * `transactions` - 対象月の取引（支出以外は無視する）
/// * `default_currency` - 予算未設定カテゴリの集計に使う通貨
/// * `output_currency` - 指定時はすべての行をこの通貨に換算する
/// * `rates` - 為替レート表
///
/// # 戻り値
/// 予算のある行（予算の順）に続いて、予算未設定で支出のあるカテゴリの行（カテゴリ名順）
pub fn aggregate_status(
    budgets: &[Budget],
    transactions: &[Transaction],
    default_currency: Currency,
    output_currency: Option<Currency>,
    rates: &ExchangeRates,
) -> Vec<BudgetStatus> {
    // カテゴリ別の支出（予算があればその通貨、なければ既定通貨）
    let mut spent_by_category: BTreeMap<&str, f64> = BTreeMap::new();

    for expense in transactions
        .iter()
        .filter(|t| t.kind == TransactionType::Expense)
    {
        let currency = budgets
            .iter()
            .find(|b| b.category == expense.category)
            .map_or(default_currency, |b| b.currency);
        let amount = rates.convert(expense.amount, expense.currency, currency);

        *spent_by_category.entry(expense.category.as_str()).or_insert(0.0) += amount;
    }

    let mut rows: Vec<BudgetStatus> = budgets
        .iter()
        .map(|budget| {
            let spent = spent_by_category
                .get(budget.category.as_str())
                .copied()
                .unwrap_or(0.0);
            budget_row(budget, spent)
        })
        .collect();

    rows.extend(
        spent_by_category
            .iter()
            .filter(|(category, _)| !budgets.iter().any(|b| b.category == **category))
            .map(|(category, spent)| BudgetStatus {
                budget_id: None,
                category: category.to_string(),
                limit: 0.0,
                spent: *spent,
                remaining: -spent,
                percentage: None,
                status: BudgetState::NoBudget,
                currency: default_currency,
            }),
    );

    match output_currency {
        Some(target) => rows
            .into_iter()
            .map(|row| convert_row(row, target, rates))
            .collect(),
        None => rows,
    }
}

fn budget_row(budget: &Budget, spent: f64) -> BudgetStatus {
    let (percentage, status) = if budget.limit > 0.0 {
        let percentage = round_to_cents(spent / budget.limit * 100.0);
        (Some(percentage), BudgetState::from_percentage(percentage))
    } else if spent > 0.0 {
        (None, BudgetState::Exceeded)
    } else {
        (None, BudgetState::Good)
    };

    BudgetStatus {
        budget_id: Some(budget.id.clone()),
        category: budget.category.clone(),
        limit: budget.limit,
        spent,
        remaining: budget.limit - spent,
        percentage,
        status,
        currency: budget.currency,
    }
}

/// 行の金額を換算する（消化率と状況は通貨に依存しない）
fn convert_row(row: BudgetStatus, target: Currency, rates: &ExchangeRates) -> BudgetStatus {
    if row.currency == target {
        return row;
    }

    BudgetStatus {
        limit: rates.convert(row.limit, row.currency, target),
        spent: rates.convert(row.spent, row.currency, target),
        remaining: rates.convert(row.remaining, row.currency, target),
        currency: target,
        ..row
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn budget(category: &str, limit: f64, currency: Currency) -> Budget {
        Budget {
            id: format!("budget-{category}"),
            user_id: "u1".to_string(),
            category: category.to_string(),
            limit,
            month: "2024-03".to_string(),
            currency,
            created_at: Utc::now(),
        }
    }

    fn expense(category: &str, amount: f64, currency: Currency) -> Transaction {
        Transaction {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            kind: TransactionType::Expense,
            category: category.to_string(),
            amount,
            currency,
            date: Utc::now(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_warning_at_eighty_percent() {
        let rows = aggregate_status(
            &[budget("Food", 100.0, Currency::Usd)],
            &[expense("Food", 50.0, Currency::Usd), expense("Food", 30.0, Currency::Usd)],
            Currency::Usd,
            None,
            &ExchangeRates::default(),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].spent, 80.0);
        assert_eq!(rows[0].remaining, 20.0);
        assert_eq!(rows[0].percentage, Some(80.0));
        assert_eq!(rows[0].status, BudgetState::Warning);
    }

    #[test]
    fn test_exceeded_at_limit() {
        let rows = aggregate_status(
            &[budget("Food", 100.0, Currency::Usd)],
            &[expense("Food", 100.0, Currency::Usd)],
            Currency::Usd,
            None,
            &ExchangeRates::default(),
        );

        assert_eq!(rows[0].percentage, Some(100.0));
        assert_eq!(rows[0].status, BudgetState::Exceeded);
    }

    #[test]
    fn test_expense_converted_into_budget_currency() {
        let rows = aggregate_status(
            &[budget("Food", 100.0, Currency::Eur)],
            &[expense("Food", 10.0, Currency::Usd)],
            Currency::Usd,
            None,
            &ExchangeRates::default(),
        );

        assert!((rows[0].spent - 9.2).abs() < 1e-9);
        assert_eq!(rows[0].percentage, Some(9.2));
        assert_eq!(rows[0].status, BudgetState::Good);
        assert_eq!(rows[0].currency, Currency::Eur);
    }

    #[test]
    fn test_spending_without_budget() {
        let mut income = expense("Salary", 500.0, Currency::Usd);
        income.kind = TransactionType::Income;

        let rows = aggregate_status(
            &[budget("Food", 100.0, Currency::Usd)],
            &[expense("Travel", 10.0, Currency::Eur), income],
            Currency::Usd,
            None,
            &ExchangeRates::default(),
        );

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].spent, 0.0);
        assert_eq!(rows[0].status, BudgetState::Good);

        let travel = &rows[1];
        assert_eq!(travel.category, "Travel");
        assert_eq!(travel.status, BudgetState::NoBudget);
        assert_eq!(travel.percentage, None);
        assert_eq!(travel.limit, 0.0);
        assert_eq!(travel.currency, Currency::Usd);
        assert!((travel.spent - 10.9).abs() < 1e-9);
        assert!((travel.remaining + 10.9).abs() < 1e-9);

        let json = serde_json::to_value(travel).unwrap();
        assert!(json["percentage"].is_null());
        assert!(json["budgetId"].is_null());
    }

    #[test]
    fn test_output_currency_converts_rows() {
        let rows = aggregate_status(
            &[budget("Food", 100.0, Currency::Usd)],
            &[expense("Food", 90.0, Currency::Usd)],
            Currency::Usd,
            Some(Currency::Eur),
            &ExchangeRates::default(),
        );

        let row = &rows[0];
        assert_eq!(row.currency, Currency::Eur);
        assert!((row.limit - 92.0).abs() < 1e-9);
        assert!((row.spent - 82.8).abs() < 1e-9);
        assert_eq!(row.percentage, Some(90.0));
        assert_eq!(row.status, BudgetState::Warning);
    }
}
