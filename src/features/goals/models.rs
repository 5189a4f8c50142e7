use crate::shared::currency::Currency;
use crate::shared::storage::{Owned, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// タイトルの最大文字数
pub const MAX_TITLE_LENGTH: usize = 100;

/// 説明の最大文字数
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// 貯蓄目標
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    /// 目標金額
    pub target_amount: f64,
    /// 現在の積立額
    pub current_amount: f64,
    /// 期限
    pub deadline: DateTime<Utc>,
    pub currency: Currency,
    /// 達成済みかどうか（一度達成すると戻らない）
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    /// 積立額が目標に達していれば達成済みにする
    pub fn refresh_completion(&mut self) {
        if self.current_amount >= self.target_amount {
            self.completed = true;
        }
    }
}

impl Record for Goal {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Owned for Goal {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

/// 目標作成用DTO
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoalDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_amount: Option<f64>,
    pub current_amount: Option<f64>,
    pub deadline: Option<String>,
    pub currency: Option<String>,
    pub completed: Option<bool>,
}

/// 目標更新用DTO
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoalDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_amount: Option<f64>,
    pub current_amount: Option<f64>,
    pub deadline: Option<String>,
    pub currency: Option<String>,
    pub completed: Option<bool>,
}

/// 積立額の追加用DTO
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalProgressDto {
    pub amount: Option<f64>,
    pub currency: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal(target: f64, current: f64) -> Goal {
        Goal {
            id: "g1".to_string(),
            user_id: "u1".to_string(),
            title: "旅行".to_string(),
            description: None,
            target_amount: target,
            current_amount: current,
            deadline: Utc::now(),
            currency: Currency::Usd,
            completed: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_refresh_completion() {
        let mut g = goal(1000.0, 999.0);
        g.refresh_completion();
        assert!(!g.completed);

        g.current_amount = 1000.0;
        g.refresh_completion();
        assert!(g.completed);

        // 達成後に積立額が減っても達成済みのまま
        g.current_amount = 10.0;
        g.refresh_completion();
        assert!(g.completed);
    }

    #[test]
    fn test_goal_serialization() {
        let json = serde_json::to_value(goal(500.0, 0.0)).unwrap();
        assert_eq!(json["targetAmount"], 500.0);
        assert_eq!(json["currentAmount"], 0.0);
        assert_eq!(json["completed"], false);
    }
}
