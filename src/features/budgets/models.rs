use crate::shared::currency::Currency;
use crate::shared::storage::{Owned, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 月別・カテゴリ別の予算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub user_id: String,
    pub category: String,
    /// 予算上限
    pub limit: f64,
    /// 対象月（YYYY-MM）
    pub month: String,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
}

impl Budget {
    /// 同じユーザー・カテゴリ・月の予算かどうか
    pub fn conflicts_with(&self, other: &Budget) -> bool {
        self.id != other.id
            && self.user_id == other.user_id
            && self.category == other.category
            && self.month == other.month
    }
}

impl Record for Budget {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Owned for Budget {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

/// 予算作成用DTO
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBudgetDto {
    pub category: Option<String>,
    pub limit: Option<f64>,
    pub month: Option<String>,
    pub currency: Option<String>,
}

/// 予算更新用DTO
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBudgetDto {
    pub category: Option<String>,
    pub limit: Option<f64>,
    pub month: Option<String>,
    pub currency: Option<String>,
}

/// 予算一覧の絞り込み条件
#[derive(Debug, Clone, Default)]
pub struct BudgetFilter {
    pub month: Option<String>,
    pub category: Option<String>,
}

impl BudgetFilter {
    pub fn matches(&self, budget: &Budget) -> bool {
        self.month.as_deref().map_or(true, |m| budget.month == m)
            && self
                .category
                .as_deref()
                .map_or(true, |c| budget.category == c)
    }
}

/// 予算の消化状況
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BudgetState {
    Good,
    Warning,
    Exceeded,
    NoBudget,
}

impl BudgetState {
    /// 消化率から状況を判定する
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 100.0 {
            BudgetState::Exceeded
        } else if percentage >= 80.0 {
            BudgetState::Warning
        } else {
            BudgetState::Good
        }
    }
}

/// カテゴリ1件分の予算状況
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatus {
    /// 予算ID（予算未設定のカテゴリは None）
    pub budget_id: Option<String>,
    pub category: String,
    pub limit: f64,
    pub spent: f64,
    pub remaining: f64,
    /// 消化率（予算未設定の場合は null）
    pub percentage: Option<f64>,
    pub status: BudgetState,
    pub currency: Currency,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(id: &str, category: &str, month: &str) -> Budget {
        Budget {
            id: id.to_string(),
            user_id: "u1".to_string(),
            category: category.to_string(),
            limit: 100.0,
            month: month.to_string(),
            currency: Currency::Usd,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_conflicts_with() {
        let a = budget("a", "Food", "2024-03");
        assert!(a.conflicts_with(&budget("b", "Food", "2024-03")));
        assert!(!a.conflicts_with(&budget("a", "Food", "2024-03")));
        assert!(!a.conflicts_with(&budget("c", "Food", "2024-04")));
        assert!(!a.conflicts_with(&budget("d", "Rent", "2024-03")));
    }

    #[test]
    fn test_budget_state_thresholds() {
        assert_eq!(BudgetState::from_percentage(79.99), BudgetState::Good);
        assert_eq!(BudgetState::from_percentage(80.0), BudgetState::Warning);
        assert_eq!(BudgetState::from_percentage(100.0), BudgetState::Exceeded);
    }

    #[test]
    fn test_budget_serialization() {
        let json = serde_json::to_value(budget("a", "Food", "2024-03")).unwrap();
        assert_eq!(json["limit"], 100.0);
        assert_eq!(json["userId"], "u1");
        assert_eq!(
            serde_json::to_value(BudgetState::NoBudget).unwrap(),
            "no-budget"
        );
    }
}
