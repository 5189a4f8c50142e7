/// 日時・月範囲のユーティリティ
pub mod dates;

/// 入力値のバリデーション
pub mod validation;
