use crate::features::budgets::models::{Budget, BudgetFilter};
use crate::shared::currency::Currency;
use crate::shared::database::is_unique_violation;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::storage::JsonCollection;
use crate::shared::utils::dates::{format_timestamp, parse_timestamp_column};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

const DUPLICATE_BUDGET: &str = "このカテゴリと月の予算は既に存在します";

/// 予算の永続化
pub trait BudgetRepository: Send + Sync {
    /// 予算を作成する（同じユーザー・カテゴリ・月の予算があればバリデーションエラー）
    fn create(&self, budget: &Budget) -> AppResult<()>;

    fn find_by_id(&self, id: &str) -> AppResult<Option<Budget>>;

    /// ユーザーの予算を取得する（月の新しい順、同月はカテゴリ順）
    fn find_all(&self, user_id: &str, filter: &BudgetFilter) -> AppResult<Vec<Budget>>;

    fn update(&self, budget: &Budget) -> AppResult<()>;

    fn delete(&self, id: &str) -> AppResult<()>;
}

/// SQLiteによる予算リポジトリ
pub struct SqliteBudgetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBudgetRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースロック取得失敗: {e}")))
    }
}

const SELECT_BUDGET: &str =
    "SELECT id, user_id, category, budget_limit, month, currency, created_at FROM budgets";

fn map_budget_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    let currency: String = row.get(5)?;
    let created_at: String = row.get(6)?;

    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category: row.get(2)?,
        limit: row.get(3)?,
        month: row.get(4)?,
        currency: currency.parse::<Currency>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, e.into())
        })?,
        created_at: parse_timestamp_column(&created_at, 6)?,
    })
}

fn map_write_error(error: rusqlite::Error) -> AppError {
    if is_unique_violation(&error) {
        AppError::validation(DUPLICATE_BUDGET)
    } else {
        AppError::from(error)
    }
}

impl BudgetRepository for SqliteBudgetRepository {
    fn create(&self, budget: &Budget) -> AppResult<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO budgets (id, user_id, category, budget_limit, month, currency, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                budget.id,
                budget.user_id,
                budget.category,
                budget.limit,
                budget.month,
                budget.currency.code(),
                format_timestamp(&budget.created_at)
            ],
        )
        .map_err(map_write_error)?;

        Ok(())
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<Budget>> {
        let conn = self.lock()?;
        let budget = conn
            .query_row(
                &format!("{SELECT_BUDGET} WHERE id = ?1"),
                params![id],
                map_budget_row,
            )
            .optional()?;
        Ok(budget)
    }

    fn find_all(&self, user_id: &str, filter: &BudgetFilter) -> AppResult<Vec<Budget>> {
        let mut query = format!("{SELECT_BUDGET} WHERE user_id = ?");
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id.to_string())];

        if let Some(month) = &filter.month {
            query.push_str(" AND month = ?");
            params.push(Box::new(month.clone()));
        }
        if let Some(category) = &filter.category {
            query.push_str(" AND category = ?");
            params.push(Box::new(category.clone()));
        }

        query.push_str(" ORDER BY month DESC, category ASC");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&query)?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let budgets = stmt
            .query_map(param_refs.as_slice(), map_budget_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(budgets)
    }

    fn update(&self, budget: &Budget) -> AppResult<()> {
        let conn = self.lock()?;

        let affected_rows = conn
            .execute(
                "UPDATE budgets SET category = ?1, budget_limit = ?2, month = ?3, currency = ?4
                 WHERE id = ?5",
                params![
                    budget.category,
                    budget.limit,
                    budget.month,
                    budget.currency.code(),
                    budget.id
                ],
            )
            .map_err(map_write_error)?;

        if affected_rows == 0 {
            return Err(AppError::not_found("予算"));
        }

        Ok(())
    }

    fn delete(&self, id: &str) -> AppResult<()> {
        let conn = self.lock()?;
        let affected_rows = conn.execute("DELETE FROM budgets WHERE id = ?1", params![id])?;

        if affected_rows == 0 {
            return Err(AppError::not_found("予算"));
        }

        Ok(())
    }
}

/// JSONファイルによる予算リポジトリ
pub struct FileBudgetRepository {
    collection: JsonCollection<Budget>,
}

impl FileBudgetRepository {
    pub fn open(data_dir: &Path) -> AppResult<Self> {
        Ok(Self {
            collection: JsonCollection::open(data_dir, "budgets")?,
        })
    }
}

fn duplicate_of(budget: &Budget) -> impl Fn(&Budget) -> Option<String> + '_ {
    move |existing| budget.conflicts_with(existing).then(|| DUPLICATE_BUDGET.to_string())
}

impl BudgetRepository for FileBudgetRepository {
    fn create(&self, budget: &Budget) -> AppResult<()> {
        self.collection.insert(budget.clone(), duplicate_of(budget))
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<Budget>> {
        self.collection.get(id)
    }

    fn find_all(&self, user_id: &str, filter: &BudgetFilter) -> AppResult<Vec<Budget>> {
        let mut budgets = self
            .collection
            .filter(|b| b.user_id == user_id && filter.matches(b))?;
        budgets.sort_by(|a, b| b.month.cmp(&a.month).then_with(|| a.category.cmp(&b.category)));
        Ok(budgets)
    }

    fn update(&self, budget: &Budget) -> AppResult<()> {
        if self.collection.replace(budget.clone(), duplicate_of(budget))? {
            Ok(())
        } else {
            Err(AppError::not_found("予算"))
        }
    }

    fn delete(&self, id: &str) -> AppResult<()> {
        if self.collection.remove(id)? {
            Ok(())
        } else {
            Err(AppError::not_found("予算"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::create_in_memory_connection;
    use chrono::Utc;
    use tempfile::TempDir;

    fn budget(id: &str, category: &str, month: &str) -> Budget {
        Budget {
            id: id.to_string(),
            user_id: "u1".to_string(),
            category: category.to_string(),
            limit: 300.0,
            month: month.to_string(),
            currency: Currency::Usd,
            created_at: Utc::now(),
        }
    }

    fn repositories(temp_dir: &TempDir) -> Vec<Box<dyn BudgetRepository>> {
        let conn = Arc::new(Mutex::new(create_in_memory_connection().unwrap()));
        vec![
            Box::new(SqliteBudgetRepository::new(conn)),
            Box::new(FileBudgetRepository::open(temp_dir.path()).unwrap()),
        ]
    }

    #[test]
    fn test_duplicate_budget_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        for repo in repositories(&temp_dir) {
            repo.create(&budget("a", "Food", "2024-03")).unwrap();

            let result = repo.create(&budget("b", "Food", "2024-03"));
            assert!(matches!(result, Err(AppError::Validation(_))));

            // 別の月なら作成できる
            repo.create(&budget("c", "Food", "2024-04")).unwrap();

            // 更新で重複させることもできない
            let mut moved = budget("c", "Food", "2024-03");
            moved.created_at = Utc::now();
            assert!(matches!(repo.update(&moved), Err(AppError::Validation(_))));
        }
    }

    #[test]
    fn test_find_all_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        for repo in repositories(&temp_dir) {
            repo.create(&budget("a", "Rent", "2024-03")).unwrap();
            repo.create(&budget("b", "Food", "2024-03")).unwrap();
            repo.create(&budget("c", "Food", "2024-04")).unwrap();

            let all = repo.find_all("u1", &BudgetFilter::default()).unwrap();
            let ids: Vec<&str> = all.iter().map(|b| b.id.as_str()).collect();
            assert_eq!(ids, vec!["c", "b", "a"]);

            let march = BudgetFilter {
                month: Some("2024-03".to_string()),
                ..Default::default()
            };
            assert_eq!(repo.find_all("u1", &march).unwrap().len(), 2);
            assert!(repo.find_all("u2", &march).unwrap().is_empty());
        }
    }

    #[test]
    fn test_update_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        for repo in repositories(&temp_dir) {
            let mut b = budget("a", "Food", "2024-03");
            repo.create(&b).unwrap();

            b.limit = 450.0;
            b.currency = Currency::Eur;
            repo.update(&b).unwrap();
            let stored = repo.find_by_id("a").unwrap().unwrap();
            assert_eq!(stored.limit, 450.0);
            assert_eq!(stored.currency, Currency::Eur);

            repo.delete("a").unwrap();
            assert!(matches!(repo.delete("a"), Err(AppError::NotFound(_))));
            assert!(matches!(
                repo.update(&budget("missing", "Food", "2025-01")),
                Err(AppError::NotFound(_))
            ));
        }
    }
}
