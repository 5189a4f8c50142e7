/// JSONファイルによるフォールバック永続化
pub mod json_collection;

/// リソースの所有者確認
pub mod ownership;

pub use json_collection::{JsonCollection, Record};
pub use ownership::{ensure_owned, Owned};
