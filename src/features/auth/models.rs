use crate::shared::currency::Currency;
use crate::shared::errors::AppError;
use crate::shared::storage::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// ユーザー情報を表す構造体（APIレスポンス用、パスワードを含まない）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// ユーザーID
    pub id: String,
    /// 表示名
    pub name: String,
    /// メールアドレス
    pub email: String,
    /// 既定の通貨
    pub default_currency: Currency,
    /// 作成日時
    pub created_at: DateTime<Utc>,
}

/// 保存用のユーザーレコード（パスワードハッシュを含む）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(flatten)]
    pub user: User,
    /// bcryptハッシュ
    pub password_hash: String,
}

impl Record for UserRecord {
    fn record_id(&self) -> &str {
        &self.user.id
    }
}

/// ユーザー登録リクエスト
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub default_currency: Option<String>,
}

/// ログインリクエスト
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginDto {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// ユーザー情報更新リクエスト
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDetailsDto {
    pub name: Option<String>,
    pub email: Option<String>,
    pub default_currency: Option<String>,
}

/// パスワード更新リクエスト
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordDto {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// JWTのクレーム
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// ユーザーID
    pub sub: String,
    /// 発行日時（UNIX秒）
    pub iat: i64,
    /// 有効期限（UNIX秒）
    pub exp: i64,
}

/// 認証成功時のレスポンス
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// 認証関連のエラー
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("認証トークンが無効です")]
    InvalidToken,

    #[error("認証トークンの有効期限が切れています")]
    TokenExpired,

    #[error("ユーザーが見つかりません。再度ログインしてください")]
    UserNotFound,

    #[error("メールアドレスまたはパスワードが正しくありません")]
    InvalidCredentials,

    #[error("現在のパスワードが正しくありません")]
    IncorrectPassword,

    #[error("このメールアドレスは既に登録されています")]
    EmailTaken,
}

impl From<AuthError> for AppError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::EmailTaken => AppError::validation(error.to_string()),
            _ => AppError::unauthorized(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_serialization_flattens_user() {
        let record = UserRecord {
            user: User {
                id: "user-1".to_string(),
                name: "山田太郎".to_string(),
                email: "taro@example.com".to_string(),
                default_currency: Currency::Inr,
                created_at: Utc::now(),
            },
            password_hash: "$2b$04$hash".to_string(),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["email"], "taro@example.com");
        assert_eq!(json["defaultCurrency"], "INR");
        assert_eq!(json["passwordHash"], "$2b$04$hash");

        let public = serde_json::to_value(&record.user).unwrap();
        assert!(public.get("passwordHash").is_none());
    }

    #[test]
    fn test_auth_error_mapping() {
        let taken: AppError = AuthError::EmailTaken.into();
        assert!(matches!(taken, AppError::Validation(_)));

        let expired: AppError = AuthError::TokenExpired.into();
        assert_eq!(expired.status_code(), hyper::StatusCode::UNAUTHORIZED);
    }
}
