use crate::shared::currency::{Currency, Monetary};
use crate::shared::storage::{Owned, Record};
use crate::shared::utils::dates::DateRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// メモの最大文字数
pub const MAX_NOTES_LENGTH: usize = 500;

/// 取引の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(format!(
                "取引の種類は income または expense である必要があります: {other}"
            )),
        }
    }
}

/// 取引を表す構造体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// 取引ID
    pub id: String,
    /// 所有ユーザーID
    pub user_id: String,
    /// 収入または支出
    #[serde(rename = "type")]
    pub kind: TransactionType,
    /// カテゴリ
    pub category: String,
    /// 金額（正の数）
    pub amount: f64,
    /// 通貨
    pub currency: Currency,
    /// 取引日時
    pub date: DateTime<Utc>,
    /// メモ
    pub notes: Option<String>,
    /// 作成日時
    pub created_at: DateTime<Utc>,
}

impl Record for Transaction {
    fn record_id(&self) -> &str {
        &self.id
    }
}

impl Owned for Transaction {
    fn owner_id(&self) -> &str {
        &self.user_id
    }
}

impl Monetary for Transaction {
    fn amount(&self) -> f64 {
        self.amount
    }

    fn currency(&self) -> Currency {
        self.currency
    }
}

/// 取引作成用DTO
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTransactionDto {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub date: Option<String>,
    pub notes: Option<String>,
}

/// 取引更新用DTO（指定されたフィールドのみ更新）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTransactionDto {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub date: Option<String>,
    pub notes: Option<String>,
}

/// 取引一覧の絞り込み条件
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub kind: Option<TransactionType>,
    pub category: Option<String>,
    pub range: DateRange,
}

impl TransactionFilter {
    /// 取引が条件に一致するかどうか
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.kind.map_or(true, |kind| transaction.kind == kind)
            && self
                .category
                .as_deref()
                .map_or(true, |category| transaction.category == category)
            && self.range.contains(&transaction.date)
    }
}
