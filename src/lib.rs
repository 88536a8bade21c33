pub mod db;
pub mod features;
pub mod server;
pub mod shared;

use db::SqliteStore;
use features::reports::aggregator::CostAggregator;
use features::subscriptions::service::SubscriptionService;
use features::subscriptions::validation::RequestValidator;
use log::{error, info};
use server::{HttpServer, RequestLogger};
use shared::config::{initialize_logging_system, load_environment_variables, EnvironmentConfig};
use shared::errors::AppResult;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// アプリケーション状態（各リクエストで共有する）
pub struct AppState {
    pub service: SubscriptionService,
    pub validator: RequestValidator,
    pub logger: RequestLogger,
}

impl AppState {
    pub fn new(
        service: SubscriptionService,
        validator: RequestValidator,
        logger: RequestLogger,
    ) -> Self {
        Self {
            service,
            validator,
            logger,
        }
    }

    /// 設定からデータベースを開き、アプリケーション状態を組み立てる
    ///
    /// # 引数
    /// * `config` - 環境設定
    ///
    /// # 戻り値
    /// アプリケーション状態、またはデータベース初期化失敗時はエラー
    pub fn initialize(config: &EnvironmentConfig) -> AppResult<Self> {
        info!("データベースを初期化しています...");
        let conn = db::initialize_database(&config.database).map_err(|e| {
            error!("データベースの初期化に失敗しました: {e}");
            e
        })?;
        info!("データベースの初期化が完了しました");

        let store = Arc::new(SqliteStore::new(conn));
        let service = SubscriptionService::new(store.clone(), store, CostAggregator::new());

        Ok(Self::new(service, RequestValidator::new(), RequestLogger::new()))
    }
}

/// アプリケーションを起動し、停止シグナルを受け取るまで実行する
pub async fn run() -> AppResult<()> {
    let env_file = load_environment_variables();
    let config = EnvironmentConfig::from_env()?;
    initialize_logging_system(&config);
    env_file.log();

    info!(
        "アプリケーション初期化を開始します: environment={}",
        config.environment.as_str()
    );

    let state = Arc::new(AppState::initialize(&config)?);
    let server = HttpServer::bind(config.http.socket_addr(), state).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn(wait_for_shutdown_signal(shutdown.clone()));

    server.serve(shutdown).await?;
    info!("アプリケーションを終了しました");
    Ok(())
}

/// SIGINT / SIGTERM を待ってキャンセルを通知する
async fn wait_for_shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("SIGINTの監視に失敗しました: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("SIGTERMの監視に失敗しました: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("SIGINTを受信しました"),
        _ = terminate => info!("SIGTERMを受信しました"),
        _ = shutdown.cancelled() => {}
    }

    shutdown.cancel();
}
