//! リクエスト単位の構造化ログ
//!
//! ユーザーIDはハッシュ化してから出力する。

use crate::shared::errors::{AppError, ErrorSeverity};
use crate::shared::utils::hash_identifier;
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::fmt;

/// ログレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl From<ErrorSeverity> for LogLevel {
    fn from(severity: ErrorSeverity) -> Self {
        match severity {
            ErrorSeverity::Low => LogLevel::Warn,
            ErrorSeverity::Medium | ErrorSeverity::High => LogLevel::Error,
        }
    }
}

/// 構造化ログエントリ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// 操作名
    pub action: String,
    /// メッセージ
    pub message: String,
    /// コンテキスト情報（キー順で出力する）
    pub context: BTreeMap<String, String>,
}

impl LogEntry {
    pub fn new(action: &str, message: &str) -> Self {
        Self {
            action: action.to_string(),
            message: message.to_string(),
            context: BTreeMap::new(),
        }
    }

    /// コンテキスト情報を追加
    pub fn with_context(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }

    /// ユーザーIDをハッシュ化して追加
    pub fn with_user_id(self, user_id: impl fmt::Display) -> Self {
        let hashed = hash_identifier(&user_id.to_string());
        self.with_context("user_id_hash", hashed)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.action, self.message)?;
        for (key, value) in &self.context {
            write!(f, " {key}={value}")?;
        }
        Ok(())
    }
}

/// HTTPリクエストのログ出力を担当するコンポーネント
///
/// アプリケーション起動時に生成し、`AppState` 経由で共有する。
#[derive(Debug, Clone, Default)]
pub struct RequestLogger;

impl RequestLogger {
    pub fn new() -> Self {
        Self
    }

    /// リクエスト受信を記録する
    pub fn started(&self, action: &str, method: &str, path: &str) {
        let entry = LogEntry::new(action, "リクエストを受信しました")
            .with_context("method", method)
            .with_context("path", path);
        self.write(LogLevel::Info, &entry);
    }

    /// 処理の成功を記録する
    pub fn completed(&self, entry: LogEntry) {
        self.write(LogLevel::Info, &entry);
    }

    /// 処理の失敗を記録する
    ///
    /// 重要度に応じて警告またはエラーとして出力し、
    /// 内部エラーの詳細はログにのみ残す。
    pub fn failed(&self, action: &str, err: &AppError) {
        let entry = LogEntry::new(action, "リクエストの処理に失敗しました")
            .with_context("error", err.details());
        self.write(LogLevel::from(err.severity()), &entry);
    }

    fn write(&self, level: LogLevel, entry: &LogEntry) {
        match level {
            LogLevel::Info => info!("{entry}"),
            LogLevel::Warn => warn!("{entry}"),
            LogLevel::Error => error!("{entry}"),
        }
    }
}
