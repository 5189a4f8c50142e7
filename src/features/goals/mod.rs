/// 貯蓄目標機能モジュール
pub mod handlers;
pub mod models;
pub mod repository;

pub use models::Goal;
pub use repository::{FileGoalRepository, GoalRepository, SqliteGoalRepository};
