use crate::shared::errors::{AppError, AppResult};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// アプリケーションのデータディレクトリ名
const APP_DIR_NAME: &str = "subscription-tracker";

const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
const DEFAULT_HTTP_PORT: u16 = 8080;
const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;
const DEFAULT_CONNECT_DELAY_MS: u64 = 500;

/// アプリケーションの実行環境を表す列挙型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    /// 開発環境
    Development,
    /// プロダクション環境
    Production,
}

impl Environment {
    fn from_name(name: &str) -> Self {
        match name {
            "production" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// HTTPサーバーの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub host: IpAddr,
    pub port: u16,
}

impl HttpSettings {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// データベースの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    /// データベースファイルのパス（":memory:" でインメモリ）
    pub path: PathBuf,
    /// 接続の最大試行回数
    pub connect_attempts: u32,
    /// 接続再試行までの待機時間
    pub connect_delay: Duration,
}

/// 環境設定を管理する構造体
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    /// 実行環境
    pub environment: Environment,
    /// ログレベル
    pub log_level: String,
    /// HTTPサーバー設定
    pub http: HttpSettings,
    /// データベース設定
    pub database: DatabaseSettings,
}

impl EnvironmentConfig {
    /// 環境変数から設定を読み込む
    ///
    /// # 戻り値
    /// 環境設定、または値が不正な場合は設定エラー
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の取得関数から設定を読み込む
    ///
    /// # 引数
    /// * `lookup` - 変数名から値を返す関数
    ///
    /// # 戻り値
    /// 環境設定、または値が不正な場合は設定エラー
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .map(|name| Environment::from_name(&name))
            .unwrap_or_else(default_environment);
        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| match environment {
            Environment::Development => "debug".to_string(),
            Environment::Production => "info".to_string(),
        });

        let host = lookup("HTTP_HOST")
            .unwrap_or_else(|| DEFAULT_HTTP_HOST.to_string())
            .parse::<IpAddr>()
            .map_err(|e| AppError::configuration(format!("HTTP_HOST が不正です: {e}")))?;
        let port = parse_or("HTTP_PORT", lookup("HTTP_PORT"), DEFAULT_HTTP_PORT)?;

        let path = match lookup("DATABASE_PATH") {
            Some(path) if !path.trim().is_empty() => PathBuf::from(path),
            _ => default_database_path(environment),
        };
        let connect_attempts = parse_or(
            "DATABASE_CONNECT_ATTEMPTS",
            lookup("DATABASE_CONNECT_ATTEMPTS"),
            DEFAULT_CONNECT_ATTEMPTS,
        )?;
        if connect_attempts == 0 {
            return Err(AppError::configuration(
                "DATABASE_CONNECT_ATTEMPTS は1以上を指定してください",
            ));
        }
        let connect_delay_ms = parse_or(
            "DATABASE_CONNECT_DELAY_MS",
            lookup("DATABASE_CONNECT_DELAY_MS"),
            DEFAULT_CONNECT_DELAY_MS,
        )?;

        Ok(Self {
            environment,
            log_level,
            http: HttpSettings { host, port },
            database: DatabaseSettings {
                path,
                connect_attempts,
                connect_delay: Duration::from_millis(connect_delay_ms),
            },
        })
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::configuration(format!("{key} が不正です ({raw}): {e}"))),
        None => Ok(default),
    }
}

/// ビルド設定に基づく既定の実行環境
fn default_environment() -> Environment {
    if cfg!(debug_assertions) {
        Environment::Development
    } else {
        Environment::Production
    }
}

/// 環境に応じたデータベースファイル名を取得する
///
/// # ファイル名の規則
/// - 開発環境: "dev_subscriptions.db"
/// - プロダクション環境: "subscriptions.db"
pub fn get_database_filename(env: Environment) -> &'static str {
    match env {
        Environment::Development => "dev_subscriptions.db",
        Environment::Production => "subscriptions.db",
    }
}

/// 既定のデータベースファイルパス
///
/// OSのデータディレクトリが取得できない場合はカレントディレクトリを使う。
fn default_database_path(env: Environment) -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(get_database_filename(env))
}

/// .envファイルの読み込み結果
///
/// ロガー初期化前に読み込むため、結果は初期化後に `log` で出力する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvFileOutcome {
    /// 環境に応じたファイルを読み込んだ
    Loaded(&'static str),
    /// 環境に応じたファイルがなく、デフォルトの.envを読み込んだ
    FellBack(&'static str),
    /// どのファイルも見つからなかった
    Missing,
}

impl EnvFileOutcome {
    /// 読み込み結果をログに出力する
    pub fn log(&self) {
        match self {
            EnvFileOutcome::Loaded(file) => log::info!("{file}ファイルを読み込みました"),
            EnvFileOutcome::FellBack(file) => {
                log::warn!("{file}が見つからないため、デフォルトの.envファイルを読み込みました")
            }
            EnvFileOutcome::Missing => {
                log::warn!("環境変数ファイルが見つかりません。直接設定された環境変数を使用します。")
            }
        }
    }
}

/// 実行環境名に対応する.envファイル名
fn env_file_name(environment: &str) -> &'static str {
    match environment {
        "production" => ".env.production",
        _ => ".env",
    }
}

/// 環境に応じた.envファイルを読み込む
///
/// # 処理内容
/// 1. ENVIRONMENT に応じた.envファイルを読み込み
/// 2. 見つからない場合はデフォルトの.envにフォールバック
///
/// # 戻り値
/// 読み込み結果（ロガー初期化後に `EnvFileOutcome::log` で出力する）
pub fn load_environment_variables() -> EnvFileOutcome {
    let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    let env_file = env_file_name(&environment);

    if dotenv::from_filename(env_file).is_ok() {
        EnvFileOutcome::Loaded(env_file)
    } else if env_file != ".env" && dotenv::dotenv().is_ok() {
        EnvFileOutcome::FellBack(env_file)
    } else {
        EnvFileOutcome::Missing
    }
}

/// ログシステムを初期化する
///
/// # 引数
/// * `config` - 環境設定
pub fn initialize_logging_system(config: &EnvironmentConfig) {
    let log_level = match config.log_level.to_lowercase().as_str() {
        "error" => log::LevelFilter::Error,
        "warn" => log::LevelFilter::Warn,
        "info" => log::LevelFilter::Info,
        "debug" => log::LevelFilter::Debug,
        "trace" => log::LevelFilter::Trace,
        _ => log::LevelFilter::Info,
    };

    // 既に初期化済みの場合（テストなど）は無視する
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(false)
        .try_init();

    log::info!(
        "ログシステムを初期化しました: level={}, environment={}",
        config.log_level,
        config.environment.as_str()
    );
}
