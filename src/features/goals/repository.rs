use crate::features::goals::models::Goal;
use crate::shared::currency::Currency;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::storage::JsonCollection;
use crate::shared::utils::dates::{format_timestamp, parse_timestamp_column};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// 目標の永続化
pub trait GoalRepository: Send + Sync {
    fn create(&self, goal: &Goal) -> AppResult<()>;

    fn find_by_id(&self, id: &str) -> AppResult<Option<Goal>>;

    /// ユーザーの目標を取得する（期限の近い順）
    ///
    /// # 引数
    /// * `user_id` - ユーザーID
    /// * `completed` - 指定時は達成状態で絞り込む
    fn find_all(&self, user_id: &str, completed: Option<bool>) -> AppResult<Vec<Goal>>;

    fn update(&self, goal: &Goal) -> AppResult<()>;

    fn delete(&self, id: &str) -> AppResult<()>;
}

/// SQLiteによる目標リポジトリ
pub struct SqliteGoalRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteGoalRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースロック取得失敗: {e}")))
    }
}

const SELECT_GOAL: &str = "SELECT id, user_id, title, description, target_amount, current_amount, deadline, currency, completed, created_at FROM goals";

fn map_goal_row(row: &Row<'_>) -> rusqlite::Result<Goal> {
    let deadline: String = row.get(6)?;
    let currency: String = row.get(7)?;
    let created_at: String = row.get(9)?;

    Ok(Goal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        target_amount: row.get(4)?,
        current_amount: row.get(5)?,
        deadline: parse_timestamp_column(&deadline, 6)?,
        currency: currency.parse::<Currency>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, e.into())
        })?,
        completed: row.get(8)?,
        created_at: parse_timestamp_column(&created_at, 9)?,
    })
}

impl GoalRepository for SqliteGoalRepository {
    fn create(&self, goal: &Goal) -> AppResult<()> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT INTO goals (id, user_id, title, description, target_amount, current_amount, deadline, currency, completed, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                goal.id,
                goal.user_id,
                goal.title,
                goal.description,
                goal.target_amount,
                goal.current_amount,
                format_timestamp(&goal.deadline),
                goal.currency.code(),
                goal.completed,
                format_timestamp(&goal.created_at)
            ],
        )?;

        Ok(())
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<Goal>> {
        let conn = self.lock()?;
        let goal = conn
            .query_row(&format!("{SELECT_GOAL} WHERE id = ?1"), params![id], map_goal_row)
            .optional()?;
        Ok(goal)
    }

    fn find_all(&self, user_id: &str, completed: Option<bool>) -> AppResult<Vec<Goal>> {
        let conn = self.lock()?;

        let goals = match completed {
            Some(completed) => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_GOAL} WHERE user_id = ?1 AND completed = ?2 ORDER BY deadline ASC"
                ))?;
                let rows = stmt.query_map(params![user_id, completed], map_goal_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let sql = format!("{SELECT_GOAL} WHERE user_id = ?1 ORDER BY deadline ASC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![user_id], map_goal_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        Ok(goals)
    }

    fn update(&self, goal: &Goal) -> AppResult<()> {
        let conn = self.lock()?;

        let affected_rows = conn.execute(
            "UPDATE goals SET title = ?1, description = ?2, target_amount = ?3, current_amount = ?4,
                 deadline = ?5, currency = ?6, completed = ?7
             WHERE id = ?8",
            params![
                goal.title,
                goal.description,
                goal.target_amount,
                goal.current_amount,
                format_timestamp(&goal.deadline),
                goal.currency.code(),
                goal.completed,
                goal.id
            ],
        )?;

        if affected_rows == 0 {
            return Err(AppError::not_found("目標"));
        }

        Ok(())
    }

    fn delete(&self, id: &str) -> AppResult<()> {
        let conn = self.lock()?;
        let affected_rows = conn.execute("DELETE FROM goals WHERE id = ?1", params![id])?;

        if affected_rows == 0 {
            return Err(AppError::not_found("目標"));
        }

        Ok(())
    }
}

/// JSONファイルによる目標リポジトリ
pub struct FileGoalRepository {
    collection: JsonCollection<Goal>,
}

impl FileGoalRepository {
    pub fn open(data_dir: &Path) -> AppResult<Self> {
        Ok(Self {
            collection: JsonCollection::open(data_dir, "goals")?,
        })
    }
}

impl GoalRepository for FileGoalRepository {
    fn create(&self, goal: &Goal) -> AppResult<()> {
        self.collection.insert(goal.clone(), |_| None)
    }

    fn find_by_id(&self, id: &str) -> AppResult<Option<Goal>> {
        self.collection.get(id)
    }

    fn find_all(&self, user_id: &str, completed: Option<bool>) -> AppResult<Vec<Goal>> {
        let mut goals = self.collection.filter(|g| {
            g.user_id == user_id && completed.map_or(true, |c| g.completed == c)
        })?;
        goals.sort_by(|a, b| a.deadline.cmp(&b.deadline));
        Ok(goals)
    }

    fn update(&self, goal: &Goal) -> AppResult<()> {
        if self.collection.replace(goal.clone(), |_| None)? {
            Ok(())
        } else {
            Err(AppError::not_found("目標"))
        }
    }

    fn delete(&self, id: &str) -> AppResult<()> {
        if self.collection.remove(id)? {
            Ok(())
        } else {
            Err(AppError::not_found("目標"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::database::create_in_memory_connection;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    fn goal(id: &str, days_until_deadline: i64, completed: bool) -> Goal {
        let now = Utc::now();
        Goal {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: format!("目標 {id}"),
            description: Some("説明".to_string()),
            target_amount: 1000.0,
            current_amount: 100.0,
            deadline: now + Duration::days(days_until_deadline),
            currency: Currency::Inr,
            completed,
            created_at: now,
        }
    }

    fn repositories(temp_dir: &TempDir) -> Vec<Box<dyn GoalRepository>> {
        let conn = Arc::new(Mutex::new(create_in_memory_connection().unwrap()));
        vec![
            Box::new(SqliteGoalRepository::new(conn)),
            Box::new(FileGoalRepository::open(temp_dir.path()).unwrap()),
        ]
    }

    #[test]
    fn test_find_all_sorted_by_deadline() {
        let temp_dir = TempDir::new().unwrap();
        for repo in repositories(&temp_dir) {
            repo.create(&goal("late", 90, false)).unwrap();
            repo.create(&goal("soon", 10, false)).unwrap();
            repo.create(&goal("done", 30, true)).unwrap();

            let all = repo.find_all("u1", None).unwrap();
            let ids: Vec<&str> = all.iter().map(|g| g.id.as_str()).collect();
            assert_eq!(ids, vec!["soon", "done", "late"]);

            let completed = repo.find_all("u1", Some(true)).unwrap();
            assert_eq!(completed.len(), 1);
            assert_eq!(completed[0].id, "done");
            assert_eq!(repo.find_all("u1", Some(false)).unwrap().len(), 2);
        }
    }

    #[test]
    fn test_update_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        for repo in repositories(&temp_dir) {
            let mut g = goal("g1", 10, false);
            repo.create(&g).unwrap();

            g.current_amount = 1000.0;
            g.refresh_completion();
            g.description = None;
            repo.update(&g).unwrap();

            let stored = repo.find_by_id("g1").unwrap().unwrap();
            assert!(stored.completed);
            assert!(stored.description.is_none());

            repo.delete("g1").unwrap();
            assert!(repo.find_by_id("g1").unwrap().is_none());
            assert!(matches!(repo.update(&g), Err(AppError::NotFound(_))));
        }
    }
}
