/// 共有エラー型とエラーハンドリング
pub mod errors;

/// 共有設定管理
pub mod config;

/// 暦月の表現と月単位の範囲
pub mod month;

/// 共有ユーティリティ関数
pub mod utils;

// 便利な再エクスポート
pub use config::{
    get_database_filename, EnvFileOutcome, initialize_logging_system, load_environment_variables,
    DatabaseSettings, Environment, EnvironmentConfig, HttpSettings,
};
pub use errors::{AppError, AppResult, ErrorSeverity};
pub use month::{MonthKey, MonthParseError, MonthRange};
