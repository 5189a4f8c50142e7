use crate::shared::currency::Currency;
use crate::shared::errors::{AppError, AppResult};
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// バリデーションメッセージを収集する
///
/// 複数のエラーをまとめて1つのバリデーションエラーとして返すために使う。
#[derive(Debug, Default)]
pub struct Validator {
    messages: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 必須の文字列（空白のみは不可）
    pub fn required_text(&mut self, value: Option<&str>, message: &str) {
        if value.map_or(true, |v| v.trim().is_empty()) {
            self.messages.push(message.to_string());
        }
    }

    /// 文字数の上限（指定されている場合のみ）
    pub fn max_chars(&mut self, value: Option<&str>, max: usize, message: &str) {
        if let Some(value) = value {
            if value.trim().chars().count() > max {
                self.messages.push(message.to_string());
            }
        }
    }

    /// 必須の値
    pub fn required<T>(&mut self, value: Option<&T>, message: &str) {
        if value.is_none() {
            self.messages.push(message.to_string());
        }
    }

    /// 正の有限数（指定されている場合のみ）
    pub fn positive_amount(&mut self, value: Option<f64>, message: &str) {
        if let Some(value) = value {
            if !value.is_finite() || value <= 0.0 {
                self.messages.push(message.to_string());
            }
        }
    }

    /// 0以上の有限数（指定されている場合のみ）
    pub fn non_negative_amount(&mut self, value: Option<f64>, message: &str) {
        if let Some(value) = value {
            if !value.is_finite() || value < 0.0 {
                self.messages.push(message.to_string());
            }
        }
    }

    /// 通貨コード（指定されている場合のみ）
    pub fn currency(&mut self, value: Option<&str>) -> Option<Currency> {
        let value = value?;
        match value.parse::<Currency>() {
            Ok(currency) => Some(currency),
            Err(message) => {
                self.messages.push(message);
                None
            }
        }
    }

    /// メールアドレス形式（指定されている場合のみ）
    pub fn email(&mut self, value: Option<&str>) {
        if let Some(value) = value {
            if !is_valid_email(value) {
                self.messages.push("有効なメールアドレスを入力してください".to_string());
            }
        }
    }

    /// 任意のメッセージを追加する
    pub fn push<S: Into<String>>(&mut self, message: S) {
        self.messages.push(message.into());
    }

    /// 収集したメッセージをエラーに変換する
    pub fn finish(self) -> AppResult<()> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation_messages(&self.messages))
        }
    }
}

/// メールアドレスの形式を検証する
pub fn is_valid_email(email: &str) -> bool {
    match EMAIL_REGEX.as_ref() {
        Some(regex) => regex.is_match(email.trim()),
        None => email.contains('@'),
    }
}

/// 文字列を正規化する（前後の空白を除去し、空なら None）
pub fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
