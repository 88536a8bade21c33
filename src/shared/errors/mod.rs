use thiserror::Error;

/// アプリケーション全体で使用される統一エラー型
#[derive(Debug, Error)]
pub enum AppError {
    /// データベース関連のエラー
    #[error("データベースエラー: {0}")]
    Database(String),

    /// リクエスト内容の形式エラー（必須項目の欠落、形式不正など）
    #[error("バリデーションエラー: {0}")]
    Validation(String),

    /// 業務ルール違反（期間の逆転、非正の金額など）
    #[error("業務ルールエラー: {0}")]
    BusinessRule(String),

    /// リソースが見つからない場合のエラー
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 一意制約に違反した場合のエラー
    #[error("リソースが既に存在します: {0}")]
    Conflict(String),

    /// 設定関連のエラー
    #[error("設定エラー: {0}")]
    Configuration(String),

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
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 低重要度（ユーザー入力エラーなど）
    Low,
    /// 中重要度（ファイル操作の一時的エラーなど）
    Medium,
    /// 高重要度（データベースエラーなど）
    High,
}

impl AppError {
    /// クライアントに返却するためのメッセージを取得
    ///
    /// 内部エラーの詳細は含めない。
    ///
    /// # 戻り値
    /// クライアントに返却可能なエラーメッセージ
    pub fn user_message(&self) -> &str {
        match self {
            AppError::Validation(msg) => msg,
            AppError::BusinessRule(msg) => msg,
            AppError::NotFound(_) => "subscription not found",
            AppError::Conflict(_) => "subscription already exists",
            AppError::Database(_)
            | AppError::Configuration(_)
            | AppError::Io(_)
            | AppError::Json(_)
            | AppError::Concurrency(_) => "internal server error",
        }
    }

    /// エラーの詳細情報を取得
    ///
    /// # 戻り値
    /// エラーの詳細情報（ログ出力用）
    pub fn details(&self) -> String {
        format!("{self}")
    }

    /// エラーの重要度を取得
    ///
    /// # 戻り値
    /// エラーの重要度レベル
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            AppError::Database(_) => ErrorSeverity::High,
            AppError::Validation(_) => ErrorSeverity::Low,
            AppError::BusinessRule(_) => ErrorSeverity::Low,
            AppError::NotFound(_) => ErrorSeverity::Low,
            AppError::Conflict(_) => ErrorSeverity::Low,
            AppError::Configuration(_) => ErrorSeverity::High,
            AppError::Io(_) => ErrorSeverity::Medium,
            AppError::Json(_) => ErrorSeverity::Medium,
            AppError::Concurrency(_) => ErrorSeverity::High,
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

    /// 業務ルールエラーを作成するヘルパー関数
    pub fn business_rule<S: Into<String>>(message: S) -> Self {
        AppError::BusinessRule(message.into())
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

    /// 重複エラーを作成するヘルパー関数
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        AppError::Conflict(message.into())
    }

    /// 設定エラーを作成するヘルパー関数
    ///
    /// # 引数
    /// * `message` - 設定エラーメッセージ
    ///
    /// # 戻り値
    /// 設定エラー
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }

    /// 並行処理エラーを作成するヘルパー関数
    pub fn concurrency<S: Into<String>>(message: S) -> Self {
        AppError::Concurrency(message.into())
    }
}

/// rusqlite::ErrorからAppErrorへの変換
///
/// `QueryReturnedNoRows` は呼び出し側で NotFound に変換すること。
impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        AppError::Database(error.to_string())
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
        assert_eq!(
            AppError::validation("テスト").severity(),
            ErrorSeverity::Low
        );
        assert_eq!(
            AppError::not_found("サブスクリプション").severity(),
            ErrorSeverity::Low
        );
        assert_eq!(
            AppError::business_rule("invalid date range").severity(),
            ErrorSeverity::Low
        );
        assert_eq!(
            AppError::configuration("HTTP_PORT が不正").severity(),
            ErrorSeverity::High
        );
        assert_eq!(
            AppError::Database("locked".to_string()).severity(),
            ErrorSeverity::High
        );
    }

    #[test]
    fn test_user_message() {
        // クライアント向けメッセージのテスト
        let validation_error = AppError::validation("field 'price' is required");
        assert_eq!(validation_error.user_message(), "field 'price' is required");

        let not_found_error = AppError::not_found("サブスクリプション");
        assert_eq!(not_found_error.user_message(), "subscription not found");

        let conflict_error = AppError::conflict("duplicate id");
        assert_eq!(conflict_error.user_message(), "subscription already exists");

        // 内部エラーの詳細はクライアントに漏らさない
        let db_error = AppError::Database("no such table: subscriptions".to_string());
        assert_eq!(db_error.user_message(), "internal server error");
    }

    #[test]
    fn test_rusqlite_conversion() {
        let error: AppError = rusqlite::Error::InvalidQuery.into();
        assert!(matches!(error, AppError::Database(_)));
    }

    #[test]
    fn test_error_details() {
        // エラー詳細のテスト
        let error = AppError::business_rule("invalid date range");
        let details = error.details();
        assert!(details.contains("invalid date range"));
        assert!(details.contains("業務ルールエラー"));
    }
}
