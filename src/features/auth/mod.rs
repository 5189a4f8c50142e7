/// 認証機能のモジュール
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod service;

pub use middleware::*;
pub use models::*;
pub use repository::*;
pub use service::*;
