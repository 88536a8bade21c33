use super::migrations::run_migrations;
use crate::shared::config::DatabaseSettings;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::connect_with_tries;
use rusqlite::Connection;
use std::path::Path;

/// インメモリデータベースを指定するパス
pub const IN_MEMORY_PATH: &str = ":memory:";

/// データベース接続を初期化し、マイグレーションを実行する
///
/// # 引数
/// * `settings` - データベース設定
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
///
/// # 処理内容
/// 1. 保存先ディレクトリの確保
/// 2. 設定された回数まで接続を試行
/// 3. テーブル作成とマイグレーションの実行
pub fn initialize_database(settings: &DatabaseSettings) -> AppResult<Connection> {
    let path = settings.path.as_path();

    if path != Path::new(IN_MEMORY_PATH) {
        ensure_parent_directory(path)?;
    }

    let conn = connect_with_tries(
        || open_connection(path),
        settings.connect_attempts,
        settings.connect_delay,
    )?;

    run_migrations(&conn)
        .map_err(|e| AppError::Database(format!("マイグレーションの実行に失敗しました: {e}")))?;

    log::info!("データベースを初期化しました: {:?}", path);

    Ok(conn)
}

fn open_connection(path: &Path) -> AppResult<Connection> {
    let conn = if path == Path::new(IN_MEMORY_PATH) {
        Connection::open_in_memory()
    } else {
        Connection::open(path)
    }
    .map_err(|e| AppError::Database(format!("データベースのオープンに失敗しました: {e}")))?;

    Ok(conn)
}

/// データベースファイルの親ディレクトリが存在しない場合は作成する
fn ensure_parent_directory(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::configuration(format!("データディレクトリの作成に失敗: {e}"))
            })?;
            log::info!("データディレクトリを作成: {:?}", parent);
        }
    }

    Ok(())
}
