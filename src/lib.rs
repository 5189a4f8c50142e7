pub mod api;
pub mod features;
pub mod repositories;
pub mod shared;

use features::auth::middleware::AuthMiddleware;
use features::auth::service::AuthService;
use features::insights::provider::{GeminiProvider, InsightProvider};
use features::reminders::engine::{LogNotifier, ReminderEngine};
use features::reminders::scheduler::start_reminder_scheduler;
use log::{error, info};
use repositories::Storage;
use shared::config::{initialize_logging_system, load_environment_variables, ServerConfig};
use shared::currency::ExchangeRates;
use shared::errors::AppResult;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// アプリケーション状態（リクエスト処理とリマインダー巡回で共有）
pub struct AppState {
    pub config: ServerConfig,
    pub storage: Storage,
    pub auth_service: Arc<AuthService>,
    pub auth_middleware: AuthMiddleware,
    pub rates: ExchangeRates,
    pub insights: Arc<dyn InsightProvider>,
}

impl AppState {
    /// 設定・永続化層・AIプロバイダーからアプリケーション状態を組み立てる
    pub fn new(
        config: ServerConfig,
        storage: Storage,
        insights: Arc<dyn InsightProvider>,
    ) -> Self {
        let auth_service = Arc::new(AuthService::new(Arc::clone(&storage.users), &config));
        let auth_middleware = AuthMiddleware::new(Arc::clone(&auth_service));

        Self {
            config,
            storage,
            auth_service,
            auth_middleware,
            rates: ExchangeRates::default(),
            insights,
        }
    }
}

/// サーバーを起動し、Ctrl-Cで停止するまで実行する
///
/// # 処理内容
/// 1. 環境変数の読み込みとログの初期化
/// 2. 設定の読み込みと検証
/// 3. 永続化層の初期化（SQLite、失敗時はJSONファイル）
/// 4. リマインダースケジューラーの起動
/// 5. APIサーバーの起動
pub async fn run() -> AppResult<()> {
    load_environment_variables();
    initialize_logging_system();

    info!("アプリケーション初期化を開始します...");

    let config = ServerConfig::from_env().map_err(|e| {
        error!("設定の読み込みに失敗しました: {e}");
        e
    })?;

    let storage = Storage::initialize(&config)?;
    let insights: Arc<dyn InsightProvider> = Arc::new(GeminiProvider::new(config.gemini.clone())?);
    let addr = config.socket_addr()?;
    let reminder_interval = config.reminder_interval;

    let engine = ReminderEngine::new(
        Arc::clone(&storage.reminders),
        Arc::new(LogNotifier),
        config.timezone,
    );
    let state = Arc::new(AppState::new(config, storage, insights));

    let shutdown = CancellationToken::new();
    let scheduler = start_reminder_scheduler(engine, reminder_interval, shutdown.clone());

    let listener = api::server::bind(addr).await?;
    let server = tokio::spawn(api::server::serve(listener, state, shutdown.clone()));

    info!("アプリケーション初期化が完了しました");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("シグナルの待機に失敗しました: {e}");
    }
    info!("停止シグナルを受信しました");
    shutdown.cancel();

    for (name, handle) in [("APIサーバー", server), ("リマインダースケジューラー", scheduler)] {
        if let Err(e) = handle.await {
            error!("{name}の終了待ちに失敗しました: {e}");
        }
    }

    info!("アプリケーションを終了しました");
    Ok(())
}
