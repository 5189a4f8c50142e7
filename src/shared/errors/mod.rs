use hyper::StatusCode;
use thiserror::Error;

/// アプリケーション全体で使用される統一エラー型
#[derive(Debug, Error)]
pub enum AppError {
    /// データベース関連のエラー
    #[error("データベースエラー: {0}")]
    Database(String),

    /// バリデーション関連のエラー
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 認証関連のエラー（トークンなし・無効・期限切れ）
    #[error("認証エラー: {0}")]
    Unauthorized(String),

    /// 他ユーザーのリソースへのアクセス
    #[error("権限エラー: {0}")]
    Forbidden(String),

    /// リソースが見つからない場合のエラー
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 外部サービス連携でのエラー
    #[error("外部サービスエラー: {0}")]
    ExternalService(String),

    /// 設定関連のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

    /// 暗号・トークン処理のエラー
    #[error("セキュリティエラー: {0}")]
    Security(String),

    /// I/O関連のエラー
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    /// JSON解析エラー
    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),

    /// 並行処理関連のエラー
    #[error("並行処理エラー: {0}")]
    Concurrency(String),
}

/// エラーの重要度を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorSeverity {
    /// 低重要度（ユーザー入力エラーなど）
    Low,
    /// 中重要度（外部サービス一時的エラーなど）
    Medium,
    /// 高重要度（データベースエラーなど）
    High,
    /// 最重要（セキュリティエラーなど）
    Critical,
}

impl AppError {
    /// クライアントに返すメッセージを取得
    ///
    /// 4xx 系はそのまま詳細を返し、5xx 系は汎用メッセージに置き換える。
    pub fn user_message(&self) -> &str {
        match self {
            AppError::Validation(msg) => msg,
            AppError::Unauthorized(msg) => msg,
            AppError::Forbidden(msg) => msg,
            AppError::NotFound(msg) => msg,
            _ => "サーバーエラーが発生しました",
        }
    }

    /// エラーの詳細情報を取得（ログ出力用）
    pub fn details(&self) -> String {
        format!("{self}")
    }

    /// エラーの重要度を取得
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Database(_) => ErrorSeverity::High,
            AppError::Validation(_) => ErrorSeverity::Low,
            AppError::Unauthorized(_) => ErrorSeverity::Low,
            AppError::Forbidden(_) => ErrorSeverity::Medium,
            AppError::NotFound(_) => ErrorSeverity::Low,
            AppError::ExternalService(_) => ErrorSeverity::Medium,
            AppError::Configuration(_) => ErrorSeverity::High,
            AppError::Security(_) => ErrorSeverity::Critical,
            AppError::Io(_) => ErrorSeverity::Medium,
            AppError::Json(_) => ErrorSeverity::Medium,
            AppError::Concurrency(_) => ErrorSeverity::High,
        }
    }

    /// エラーに対応するHTTPステータスコードを取得
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// バリデーションエラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `message` - バリデーションエラーメッセージ
    ///
    /// # 戻り値
    /// バリデーションエラー
    pub fn validation<S: Into<String>>(message: S) -> Self {
        AppError::Validation(message.into())
    }

    /// 複数のバリデーションメッセージをまとめたエラーを作成する
    pub fn validation_messages(messages: &[String]) -> Self {
        AppError::Validation(messages.join(", "))
    }

    /// リソース未発見エラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `resource` - 見つからなかったリソース名
    ///
    /// # 戻り値
    /// リソース未発見エラー
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        AppError::NotFound(format!("{}が見つかりません", resource.into()))
    }

    /// 認証エラーを作成するヘルパー関数
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        AppError::Unauthorized(message.into())
    }

    /// 他ユーザーのリソースへのアクセスエラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `resource` - アクセスしようとしたリソース名
    pub fn forbidden<S: Into<String>>(resource: S) -> Self {
        AppError::Forbidden(format!("この{}にアクセスする権限がありません", resource.into()))
    }

    /// 外部サービスエラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `service` - サービス名
    /// * `message` - エラーメッセージ
    ///
    /// # 戻り値
    /// 外部サービスエラー
    pub fn external_service<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        AppError::ExternalService(format!("{}: {}", service.into(), message.into()))
    }

    /// 設定エラーを作成するヘルパー関数
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }

    /// セキュリティエラーを作成するヘルパー関数
    pub fn security<S: Into<String>>(message: S) -> Self {
        AppError::Security(message.into())
    }

    /// 並行処理エラーを作成するヘルパー関数
    pub fn concurrency<S: Into<String>>(message: S) -> Self {
        AppError::Concurrency(message.into())
    }
}

/// rusqlite::ErrorからAppErrorへの変換
impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        AppError::Database(error.to_string())
    }
}

/// パスワードハッシュ処理のエラー
impl From<bcrypt::BcryptError> for AppError {
    fn from(error: bcrypt::BcryptError) -> Self {
        AppError::security(format!("パスワードハッシュ処理に失敗: {error}"))
    }
}

/// JWT処理のエラー
impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(error: jsonwebtoken::errors::Error) -> Self {
        AppError::security(format!("トークン処理に失敗: {error}"))
    }
}

/// Result型のエイリアス（アプリケーション全体で使用）
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_severity() {
        // 各エラータイプの重要度をテスト
        assert_eq!(AppError::validation("テスト").severity(), ErrorSeverity::Low);
        assert_eq!(AppError::not_found("取引").severity(), ErrorSeverity::Low);
        assert_eq!(
            AppError::external_service("Gemini", "接続失敗").severity(),
            ErrorSeverity::Medium
        );
        assert_eq!(
            AppError::security("署名不正").severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            AppError::configuration("設定ファイル不正").severity(),
            ErrorSeverity::High
        );
    }

    #[test]
    fn test_token_error_is_security_error() {
        let error: AppError = jsonwebtoken::errors::Error::from(
            jsonwebtoken::errors::ErrorKind::InvalidSignature,
        )
        .into();
        assert!(matches!(error, AppError::Security(_)));
        assert_eq!(error.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            AppError::validation("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::unauthorized("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::forbidden("予算").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("目標").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::Database("locked".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_user_message() {
        let validation_error = AppError::validation("金額が不正です");
        assert_eq!(validation_error.user_message(), "金額が不正です");

        let not_found_error = AppError::not_found("取引");
        assert_eq!(not_found_error.user_message(), "取引が見つかりません");

        // 5xx 系は詳細を隠す
        let db_error = AppError::Database("no such table: budgets".to_string());
        assert_eq!(db_error.user_message(), "サーバーエラーが発生しました");
        assert!(db_error.details().contains("no such table"));
    }

    #[test]
    fn test_validation_messages_are_joined() {
        let error = AppError::validation_messages(&[
            "カテゴリは必須です".to_string(),
            "通貨は必須です".to_string(),
        ]);
        assert_eq!(error.user_message(), "カテゴリは必須です, 通貨は必須です");
    }
}
