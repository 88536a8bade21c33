use crate::shared::errors::{AppError, AppResult};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};

/// エラーレスポンスの本文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

/// 値をJSONにシリアライズしてレスポンスを作成する
pub fn json_response<T: Serialize>(status: StatusCode, value: &T) -> AppResult<Response<String>> {
    let body = serde_json::to_string(value)?;
    Ok(with_json_body(status, body))
}

/// 本文なしのレスポンスを作成する
pub fn empty_response(status: StatusCode) -> Response<String> {
    let mut response = Response::new(String::new());
    *response.status_mut() = status;
    response
}

/// エラーメッセージのみを持つJSONレスポンスを作成する
pub fn message_response(status: StatusCode, message: &str) -> Response<String> {
    let body = ErrorBody {
        message: message.to_string(),
    };
    // 文字列フィールドのみの構造体はシリアライズに失敗しない
    let json = serde_json::to_string(&body)
        .unwrap_or_else(|_| r#"{"message":"internal server error"}"#.to_string());
    with_json_body(status, json)
}

/// アプリケーションエラーをHTTPレスポンスに変換する
///
/// 内部エラーの詳細はレスポンスに含めない。
pub fn error_response(error: &AppError) -> Response<String> {
    message_response(status_for(error), error.user_message())
}

/// エラー種別に対応するHTTPステータスコード
pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Validation(_) => StatusCode::BAD_REQUEST,
        AppError::BusinessRule(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::Database(_)
        | AppError::Configuration(_)
        | AppError::Io(_)
        | AppError::Json(_)
        | AppError::Concurrency(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn with_json_body(status: StatusCode, body: String) -> Response<String> {
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
