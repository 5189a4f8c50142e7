use crate::shared::storage::{Owned, Record};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// メッセージの最大文字数
pub const MAX_MESSAGE_LENGTH: usize = 200;

/// リマインダーの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderType {
    BudgetCheck,
    LogExpense,
    GoalUpdate,
    Custom,
}

impl ReminderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderType::BudgetCheck => "budget-check",
            ReminderType::LogExpense => "log-expense",
            ReminderType::GoalUpdate => "goal-update",
            ReminderType::Custom => "custom",
        }
    }
}

impl fmt::Display for ReminderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReminderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "budget-check" => Ok(ReminderType::BudgetCheck),
            "log-expense" => Ok(ReminderType::LogExpense),
            "goal-update" => Ok(ReminderType::GoalUpdate),
            "custom" => Ok(ReminderType::Custom),
            other => Err(format!(
                "リマインダーの種類は budget-check, log-expense, goal-update, custom のいずれかです: {other}"
            )),
        }
    }
}

/// 繰り返し頻度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Once,
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "once" => Ok(Frequency::Once),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!(
                "頻度は once, daily, weekly, monthly のいずれかです: {other}"
            )),
        }
    }
}

/// リマインダー
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: ReminderType,
    pub message: String,
    /// 次回の通知日時
    pub date_time: DateTime<Utc>,
    pub frequency: Frequency,
    /// 有効かどうか（once は通知後に無効化される）
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Record for Reminder {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Owned for Reminder {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

/// リマインダー作成用DTO
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReminderDto {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub date_time: Option<String>,
    pub frequency: Option<String>,
    pub is_active: Option<bool>,
}

/// リマインダー更新用DTO
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateReminderDto {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub message: Option<String>,
    pub date_time: Option<String>,
    pub frequency: Option<String>,
    pub is_active: Option<bool>,
}

/// リマインダー一覧の絞り込み条件
#[derive(Debug, Clone, Default)]
pub struct ReminderFilter {
    pub active: Option<bool>,
    pub kind: Option<ReminderType>,
}

impl ReminderFilter {
    pub fn matches(&self, reminder: &Reminder) -> bool {
        self.active.map_or(true, |active| reminder.is_active == active)
            && self.kind.map_or(true, |kind| reminder.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_type_serialization() {
        assert_eq!(
            serde_json::to_value(ReminderType::BudgetCheck).unwrap(),
            "budget-check"
        );
        assert_eq!(
            "log-expense".parse::<ReminderType>().unwrap(),
            ReminderType::LogExpense
        );
        assert!("weekly-review".parse::<ReminderType>().is_err());
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!("monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
        assert_eq!(Frequency::default(), Frequency::Once);
        assert!("yearly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_reminder_serialization() {
        let reminder = Reminder {
            id: "r1".to_string(),
            user_id: "u1".to_string(),
            kind: ReminderType::Custom,
            message: "家賃を払う".to_string(),
            date_time: Utc::now(),
            frequency: Frequency::Weekly,
            is_active: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&reminder).unwrap();

        assert_eq!(json["type"], "custom");
        assert_eq!(json["frequency"], "weekly");
        assert_eq!(json["isActive"], true);
        assert!(json.get("dateTime").is_some());
    }
}
