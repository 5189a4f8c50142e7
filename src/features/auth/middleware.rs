use crate::features::auth::models::User;
use crate::features::auth::service::AuthService;
use crate::shared::errors::{AppError, AppResult};
use std::sync::Arc;

/// API認証ミドルウェア
/// 保護されたAPIリクエストのBearerトークンを検証し、リクエストしたユーザーを特定する
#[derive(Clone)]
pub struct AuthMiddleware {
    /// 認証サービス
    auth_service: Arc<AuthService>,
}

impl AuthMiddleware {
    /// 新しいAuthMiddlewareを作成する
    ///
    /// # 引数
    /// * `auth_service` - 認証サービス
    ///
    /// # 戻り値
    /// AuthMiddlewareインスタンス
    pub fn new(auth_service: Arc<AuthService>) -> Self {
        Self { auth_service }
    }

    /// APIリクエストの認証を検証する
    ///
    /// # 引数
    /// * `token` - 認証トークン
    /// * `request_path` - リクエストパス
    ///
    /// # 戻り値
    /// 認証されたユーザー情報
    pub fn authenticate_request(&self, token: Option<&str>, request_path: &str) -> AppResult<User> {
        log::debug!("APIリクエスト認証を開始: path={request_path}");

        // トークンが提供されているかチェック
        let token = token.ok_or_else(|| {
            log::warn!("認証トークンが提供されていません: path={request_path}");
            unauthorized_access()
        })?;

        // トークンが空でないかチェック
        if token.trim().is_empty() {
            log::warn!("空の認証トークンが提供されました: path={request_path}");
            return Err(unauthorized_access());
        }

        match self.auth_service.validate_session(token.trim()) {
            Ok(user) => {
                log::debug!(
                    "APIリクエスト認証成功: user_id={}, path={request_path}",
                    user.id
                );
                Ok(user)
            }
            Err(e) => {
                log::warn!("トークン検証失敗: {e}, path={request_path}");
                Err(e)
            }
        }
    }
}

/// `Authorization` ヘッダーからBearerトークンを取り出す
pub fn extract_bearer_token(header_value: Option<&str>) -> Option<&str> {
    let value = header_value?.trim();
    let (scheme, token) = value.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then(|| token.trim())
}

fn unauthorized_access() -> AppError {
    AppError::unauthorized("このルートにアクセスする権限がありません")
}
