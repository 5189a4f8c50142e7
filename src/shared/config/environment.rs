use crate::shared::errors::{AppError, AppResult};
use chrono_tz::Tz;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// 開発環境で使用するJWTシークレットのデフォルト値
const DEVELOPMENT_JWT_SECRET: &str = "development_jwt_secret_change_me";

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: String,
    /// デバッグモードの有効/無効
    pub debug_mode: bool,
    /// ログレベル
    pub log_level: String,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # 戻り値
    /// 環境設定
    pub fn from_env() -> Self {
        let environment = get_environment();
        let debug_mode = environment == Environment::Development;
        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
            if debug_mode {
                "debug".to_string()
            } else {
                "info".to_string()
            }
        });

        Self {
            environment: format!("{environment:?}").to_lowercase(),
            debug_mode,
            log_level,
        }
    }
}

/// 現在の実行環境を判定する
///
/// # 戻り値
/// 現在の実行環境（Development または Production）
///
/// # 判定ロジック
/// 1. 実行時環境変数 ENVIRONMENT を確認
/// 2. デバッグビルドの場合は Development
/// 3. リリースビルドの場合は Production
pub fn get_environment() -> Environment {
    if let Ok(env_var) = std::env::var("ENVIRONMENT") {
        let env = match env_var.as_str() {
            "production" => Environment::Production,
            _ => Environment::Development,
        };
        log::debug!("環境判定: 実行時環境変数を使用 -> {env_var} -> {env:?}");
        return env;
    }

    // フォールバック: ビルド設定に基づく判定
    let env = if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    };
    log::debug!(
        "環境判定: ビルド設定を使用 -> debug_assertions={} -> {env:?}",
        cfg!(debug_assertions)
    );
    env
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # ファイル名の規則
/// - 開発環境: "dev_kakeibo.db"
/// - プロダクション環境: "kakeibo.db"
pub fn get_database_filename(env: Environment) -> &'static str {
    match env {
        Environment::Development => "dev_kakeibo.db",
        Environment::Production => "kakeibo.db",
    }
}

/// 環境に応じた.envファイルを読み込む
pub fn load_environment_variables() {
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

    // 環境に応じた.envファイルのパスを決定
    let env_file = match environment.as_str() {
        "production" => ".env.production",
        _ => ".env",
    };

    match dotenv::from_filename(env_file) {
        Ok(_) => {
            log::info!("{env_file}ファイルを読み込みました");
        }
        Err(_) => {
            // 環境固有のファイルがない場合は、デフォルトの.envを試行
            if env_file != ".env" && dotenv::dotenv().is_ok() {
                log::warn!("{env_file}が見つからないため、デフォルトの.envファイルを読み込みました");
            } else {
                log::warn!(".envファイルが見つかりません。直接設定された環境変数を使用します。");
            }
        }
    }
}

/// ログシステムを初期化する
///
/// # 処理内容
/// 1. 環境設定を取得
/// 2. ログレベルを設定
/// 3. env_loggerを初期化
pub fn initialize_logging_system() {
    let env_config = EnvironmentConfig::from_env();

    let log_level = match env_config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .init();

    log::info!(
        "ログシステムを初期化しました: level={}, environment={}",
        env_config.log_level,
        env_config.environment
    );
}

/// 永続化バックエンドの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// SQLiteデータベース
    Sqlite,
    /// JSONファイル（フォールバック）
    File,
}

/// Gemini API の設定
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// APIキー（未設定の場合はAI機能が無効）
    pub api_key: Option<String>,
    /// 使用するモデル名
    pub model: String,
    /// APIのベースURL
    pub base_url: String,
    /// リクエストのタイムアウト秒数
    pub timeout_seconds: u64,
}

impl GeminiConfig {
    /// 環境変数からGemini設定を読み込む
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        if api_key.is_none() {
            log::warn!("GEMINI_API_KEY が設定されていないため、AIアドバイス機能は無効です");
        }

        Self {
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta".to_string()
            }),
            timeout_seconds: 30,
        }
    }
}

/// サーバー全体の設定を管理する構造体
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// 待ち受けホスト
    pub host: String,
    /// 待ち受けポート
    pub port: u16,
    /// 永続化バックエンド
    pub storage_backend: StorageBackend,
    /// SQLiteデータベースファイルのパス
    pub database_path: PathBuf,
    /// JSONファイルストアのディレクトリ
    pub data_dir: PathBuf,
    /// JWT署名用シークレット
    pub jwt_secret: String,
    /// JWTの有効日数
    pub jwt_expire_days: i64,
    /// bcryptのコスト
    pub bcrypt_cost: u32,
    /// リマインダーのポーリング間隔
    pub reminder_interval: Duration,
    /// 月の境界やデフォルトリマインダーの計算に使うタイムゾーン
    pub timezone: Tz,
    /// AIプロバイダーの設定
    pub gemini: GeminiConfig,
    /// 実行環境
    pub environment: Environment,
}

impl ServerConfig {
    /// 環境変数からサーバー設定を読み込む
    ///
    /// # 戻り値
    /// サーバー設定、または値が不正な場合はエラー
    pub fn from_env() -> AppResult<Self> {
        let environment = get_environment();

        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_env_or("PORT", 5000u16)?;

        let storage_backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "sqlite".to_string())
            .to_lowercase()
            .as_str()
        {
            "sqlite" => StorageBackend::Sqlite,
            "file" => StorageBackend::File,
            other => {
                return Err(AppError::configuration(format!(
                    "STORAGE_BACKEND の値が不正です: {other}"
                )))
            }
        };

        let database_path = std::env::var("DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(get_database_filename(environment.clone())));
        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("JWT_SECRET が設定されていないため、開発用のデフォルト値を使用（本番環境では必ず設定してください）");
            DEVELOPMENT_JWT_SECRET.to_string()
        });

        let timezone_name = std::env::var("APP_TIMEZONE").unwrap_or_else(|_| "UTC".to_string());
        let timezone: Tz = timezone_name.parse().map_err(|_| {
            AppError::configuration(format!("APP_TIMEZONE の値が不正です: {timezone_name}"))
        })?;

        let config = Self {
            host,
            port,
            storage_backend,
            database_path,
            data_dir,
            jwt_secret,
            jwt_expire_days: parse_env_or("JWT_EXPIRE_DAYS", 30i64)?,
            bcrypt_cost: parse_env_or("BCRYPT_COST", 10u32)?,
            reminder_interval: Duration::from_secs(parse_env_or("REMINDER_INTERVAL_SECS", 60u64)?),
            timezone,
            gemini: GeminiConfig::from_env(),
            environment,
        };

        config.validate()?;
        Ok(config)
    }

    /// 設定を検証する
    ///
    /// # 戻り値
    /// 設定が有効な場合はOk(())、無効な場合はエラー
    pub fn validate(&self) -> AppResult<()> {
        if self.jwt_secret.len() < 16 {
            return Err(AppError::configuration(
                "JWT_SECRET は最低16文字以上である必要があります",
            ));
        }

        if self.environment == Environment::Production && self.jwt_secret == DEVELOPMENT_JWT_SECRET
        {
            return Err(AppError::configuration(
                "本番環境では JWT_SECRET を必ず設定してください",
            ));
        }

        // 有効期限の計算が桁あふれしない範囲に収める
        if !(1..=3650).contains(&self.jwt_expire_days) {
            return Err(AppError::configuration(
                "JWT_EXPIRE_DAYS は1から3650の範囲で指定してください",
            ));
        }

        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(AppError::configuration(
                "BCRYPT_COST は4から31の範囲で指定してください",
            ));
        }

        if self.reminder_interval.is_zero() {
            return Err(AppError::configuration(
                "REMINDER_INTERVAL_SECS は1以上である必要があります",
            ));
        }

        Ok(())
    }

    /// 待ち受けアドレスを取得
    pub fn socket_addr(&self) -> AppResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::configuration(format!("待ち受けアドレスが不正です: {e}")))
    }
}

#[cfg(test)]
impl ServerConfig {
    /// テスト用の設定（インメモリ向け、bcryptコスト最小）
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            storage_backend: StorageBackend::Sqlite,
            database_path: PathBuf::from("test.db"),
            data_dir: PathBuf::from("data"),
            jwt_secret: "test_jwt_secret_long_enough".to_string(),
            jwt_expire_days: 30,
            bcrypt_cost: 4,
            reminder_interval: Duration::from_secs(60),
            timezone: chrono_tz::UTC,
            gemini: GeminiConfig {
                api_key: None,
                model: "gemini-1.5-flash".to_string(),
                base_url: "http://localhost".to_string(),
                timeout_seconds: 5,
            },
            environment: Environment::Development,
        }
    }
}

/// 環境変数を読み込んで型変換する（未設定の場合はデフォルト値）
fn parse_env_or<T>(key: &str, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| AppError::configuration(format!("{key} の値が不正です: {value}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig::for_tests()
    }

    #[test]
    fn test_get_database_filename() {
        assert_eq!(
            get_database_filename(Environment::Development),
            "dev_kakeibo.db"
        );
        assert_eq!(get_database_filename(Environment::Production), "kakeibo.db");
    }

    #[test]
    fn test_validate_accepts_reasonable_config() {
        assert!(test_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = test_config();
        config.jwt_secret = "short".to_string();
        assert!(matches!(config.validate(), Err(AppError::Configuration(_))));
    }

    #[test]
    fn test_validate_rejects_default_secret_in_production() {
        let mut config = test_config();
        config.environment = Environment::Production;
        config.jwt_secret = DEVELOPMENT_JWT_SECRET.to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_jwt_expiry() {
        for days in [0, -1, 3651, 100_000, i64::MAX] {
            let mut config = test_config();
            config.jwt_expire_days = days;
            assert!(
                matches!(config.validate(), Err(AppError::Configuration(_))),
                "jwt_expire_days={days}"
            );
        }

        let mut config = test_config();
        config.jwt_expire_days = 3650;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_socket_addr() {
        let addr = test_config().socket_addr().unwrap();
        assert_eq!(addr.port(), 5000);
    }
}
