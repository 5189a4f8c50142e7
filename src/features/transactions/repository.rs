use crate::features::transactions::models::{Transaction, TransactionFilter, TransactionType};
use crate::shared::currency::Currency;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::storage::JsonCollection;
use crate::shared::utils::dates::{format_timestamp, parse_timestamp_column};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// 取引の永続化
pub trait TransactionRepository: Send + Sync {
    /// 取引を作成する
    fn create(&self, transaction: &Transaction) -> AppResult<()>;

    /// IDで取引を取得する
    fn find_by_id(&self, id: &str) -> AppResult<Option<Transaction>>;

    /// ユーザーの取引を取得する（日付の新しい順）
    fn find_all(&self, user_id: &str, filter: &TransactionFilter) -> AppResult<Vec<Transaction>>;

    /// 取引を更新する
    fn update(&self, transaction: &Transaction) -> AppResult<()>;

    /// 取引を削除する
    fn delete(&self, id: &str) -> AppResult<()>;
}

/// SQLiteによる取引リポジトリ
pub struct SqliteTransactionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTransactionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースロック取得失敗: {e}")))
    }
}

const SELECT_TRANSACTION: &str =
    "SELECT id, user_id, type, category, amount, currency, date, notes, created_at FROM transactions";

fn text_conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, message.into())
}

fn map_transaction_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let kind: String = row.get(2)?;
    let currency: String = row.get(5)?;
    let date: String = row.get(6)?;
    let created_at: String = row.get(8)?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: kind
            .parse::<TransactionType>()
            .map_err(|e| text_conversion_error(2, e))?,
        category: row.get(3)?,
        amount: row.get(4)?,
        currency: currency
            .parse::<Currency>()
            .map_err(|e| text_conversion_error(5, e))?,
        date: parse_timestamp_column(&date, 6)?,
        notes: row.get(7)?,
        created_at: parse_timestamp_column(&created_at, 8)?,
    })
}

impl TransactionRepository for SqliteTransactionRepository {
    fn create(&self, transaction: &Transaction) -> AppResult<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO transactions (id, user_id, type, category, amount, currency, date, notes, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                transaction.id,
                transaction.user_id,
                transaction.kind.as_str(),
                transaction.category,
                transaction.amount,
                transaction.currency.code(),
                format_timestamp(&transaction.date),
                transaction.notes,
                format_timestamp(&transaction.created_at)
            ],
        )?;

        Ok(())
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<Transaction>> {
        let conn = self.lock()?;
        let transaction = conn
            .query_row(
                &format!("{SELECT_TRANSACTION} WHERE id = ?1"),
                params![id],
                map_transaction_row,
            )
            .optional()?;
        Ok(transaction)
    }

    fn find_all(&self, user_id: &str, filter: &TransactionFilter) -> AppResult<Vec<Transaction>> {
        let mut query = format!("{SELECT_TRANSACTION} WHERE user_id = ?");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id.to_string())];

        // 種類フィルター
        if let Some(kind) = filter.kind {
            query.push_str(" AND type = ?");
            params.push(Box::new(kind.as_str()));
        }

        // カテゴリフィルター
        if let Some(category) = &filter.category {
            query.push_str(" AND category = ?");
            params.push(Box::new(category.clone()));
        }

        // 期間フィルター（開始は含む、終了は含まない）
        if let Some(start) = &filter.range.start {
            query.push_str(" AND date >= ?");
            params.push(Box::new(format_timestamp(start)));
        }
        if let Some(end) = &filter.range.end {
            query.push_str(" AND date < ?");
            params.push(Box::new(format_timestamp(end)));
        }

        query.push_str(" ORDER BY date DESC, created_at DESC");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&query)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let transactions = stmt
            .query_map(param_refs.as_slice(), map_transaction_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(transactions)
    }

    fn update(&self, transaction: &Transaction) -> AppResult<()> {
        let conn = self.lock()?;

        let affected_rows = conn.execute(
            "UPDATE transactions SET type = ?1, category = ?2, amount = ?3, currency = ?4, date = ?5, notes = ?6
             WHERE id = ?7",
            params![
                transaction.kind.as_str(),
                transaction.category,
                transaction.amount,
                transaction.currency.code(),
                format_timestamp(&transaction.date),
                transaction.notes,
                transaction.id
            ],
        )?;

        if affected_rows == 0 {
            return Err(AppError::not_found("取引"));
        }

        Ok(())
    }

    fn delete(&self, id: &str) -> AppResult<()> {
        let conn = self.lock()?;
        let affected_rows = conn.execute("DELETE FROM transactions WHERE id = ?1", params![id])?;

        if affected_rows == 0 {
            return Err(AppError::not_found("取引"));
        }

        Ok(())
    }
}

/// JSONファイルによる取引リポジトリ
pub struct FileTransactionRepository {
    collection: JsonCollection<Transaction>,
}

impl FileTransactionRepository {
    pub fn open(data_dir: &Path) -> AppResult<Self> {
        Ok(Self {
            collection: JsonCollection::open(data_dir, "transactions")?,
        })
    }
}

impl TransactionRepository for FileTransactionRepository {
    fn create(&self, transaction: &Transaction) -> AppResult<()> {
        self.collection.insert(transaction.clone(), |_| None)
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<Transaction>> {
        self.collection.get(id)
    }

    fn find_all(&self, user_id: &str, filter: &TransactionFilter) -> AppResult<Vec<Transaction>> {
        let mut transactions = self
            .collection
            .filter(|t| t.user_id == user_id && filter.matches(t))?;
        transactions.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(transactions)
    }

    fn update(&self, transaction: &Transaction) -> AppResult<()> {
        if self.collection.replace(transaction.clone(), |_| None)? {
            Ok(())
        } else {
            Err(AppError::not_found("取引"))
        }
    }

    fn delete(&self, id: &str) -> AppResult<()> {
        if self.collection.remove(id)? {
            Ok(())
        } else {
            Err(AppError::not_found("取引"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::create_in_memory_connection;
    use crate::shared::utils::dates::{current_timestamp, month_range};
    use chrono::{DateTime, Utc};
    use tempfile::TempDir;

    fn transaction(id: &str, user_id: &str, kind: TransactionType, date: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            user_id: user_id.to_string(),
            kind,
            category: "Food".to_string(),
            amount: 25.5,
            currency: Currency::Eur,
            date: DateTime::parse_from_rfc3339(date).unwrap().with_timezone(&Utc),
            notes: Some("ランチ".to_string()),
            created_at: current_timestamp(),
        }
    }

    fn repositories(temp_dir: &TempDir) -> Vec<Box<dyn TransactionRepository>> {
        let conn = Arc::new(Mutex::new(create_in_memory_connection().unwrap()));
        vec![
            Box::new(SqliteTransactionRepository::new(conn)),
            Box::new(FileTransactionRepository::open(temp_dir.path()).unwrap()),
        ]
    }

    #[test]
    fn test_crud() {
        let temp_dir = TempDir::new().unwrap();
        for repo in repositories(&temp_dir) {
            let mut t = transaction("t1", "u1", TransactionType::Expense, "2024-03-10T08:00:00Z");
            repo.create(&t).unwrap();
            assert_eq!(repo.find_by_id("t1").unwrap().unwrap(), t);

            t.amount = 30.0;
            t.notes = None;
            repo.update(&t).unwrap();
            let stored = repo.find_by_id("t1").unwrap().unwrap();
            assert_eq!(stored.amount, 30.0);
            assert!(stored.notes.is_none());

            repo.delete("t1").unwrap();
            assert!(repo.find_by_id("t1").unwrap().is_none());
            assert!(matches!(repo.delete("t1"), Err(AppError::NotFound(_))));
        }
    }

    #[test]
    fn test_find_all_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        for repo in repositories(&temp_dir) {
            repo.create(&transaction("a", "u1", TransactionType::Expense, "2024-03-01T00:00:00Z"))
                .unwrap();
            repo.create(&transaction("b", "u1", TransactionType::Income, "2024-03-20T00:00:00Z"))
                .unwrap();
            repo.create(&transaction("c", "u1", TransactionType::Expense, "2024-04-01T00:00:00Z"))
                .unwrap();
            repo.create(&transaction("d", "u2", TransactionType::Expense, "2024-03-05T00:00:00Z"))
                .unwrap();

            let all = repo.find_all("u1", &TransactionFilter::default()).unwrap();
            let ids: Vec<&str> = all.iter().map(|t| t.id.as_str()).collect();
            assert_eq!(ids, vec!["c", "b", "a"]);

            let march = TransactionFilter {
                range: month_range("2024-03", chrono_tz::UTC).unwrap(),
                ..Default::default()
            };
            assert_eq!(repo.find_all("u1", &march).unwrap().len(), 2);

            let march_expenses = TransactionFilter {
                kind: Some(TransactionType::Expense),
                ..march
            };
            let result = repo.find_all("u1", &march_expenses).unwrap();
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].id, "a");
        }
    }
}
