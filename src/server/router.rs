use super::response::{empty_response, error_response, message_response};
use crate::features::subscriptions::handlers::{self, QueryParams};
use crate::shared::errors::{AppError, AppResult};
use crate::AppState;
use http_body_util::{BodyExt, Limited};
use hyper::body::{Body, Bytes};
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

const SUBSCRIPTIONS_PATH: &str = "/api/v1/subscriptions";

/// リクエスト本文の上限（1 MiB）
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// 解決済みのルート
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Health,
    CreateSubscription,
    ListSubscriptions,
    TotalCost,
    GetSubscription(String),
    UpdateSubscription(String),
    DeleteSubscription(String),
}

/// ルート解決の失敗
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteError {
    NotFound,
    MethodNotAllowed,
}

impl Route {
    /// メソッドとパスからルートを解決する
    ///
    /// # 引数
    /// * `method` - HTTPメソッド
    /// * `path` - リクエストパス（クエリを含まない）
    ///
    /// # 戻り値
    /// 解決したルート。パスが存在しない場合は `NotFound`、
    /// メソッドが対応していない場合は `MethodNotAllowed`
    pub fn resolve(method: &Method, path: &str) -> Result<Self, RouteError> {
        let path = match path.strip_suffix('/') {
            Some(trimmed) if !trimmed.is_empty() => trimmed,
            _ => path,
        };

        if path == "/health" {
            return match *method {
                Method::GET => Ok(Route::Health),
                _ => Err(RouteError::MethodNotAllowed),
            };
        }

        let rest = path
            .strip_prefix(SUBSCRIPTIONS_PATH)
            .ok_or(RouteError::NotFound)?;

        if rest.is_empty() {
            return match *method {
                Method::POST => Ok(Route::CreateSubscription),
                Method::GET => Ok(Route::ListSubscriptions),
                _ => Err(RouteError::MethodNotAllowed),
            };
        }

        let segment = rest.strip_prefix('/').ok_or(RouteError::NotFound)?;
        if segment.is_empty() || segment.contains('/') {
            return Err(RouteError::NotFound);
        }

        if segment == "total-cost" {
            return match *method {
                Method::GET => Ok(Route::TotalCost),
                _ => Err(RouteError::MethodNotAllowed),
            };
        }

        let id = segment.to_string();
        match *method {
            Method::GET => Ok(Route::GetSubscription(id)),
            Method::PUT => Ok(Route::UpdateSubscription(id)),
            Method::DELETE => Ok(Route::DeleteSubscription(id)),
            _ => Err(RouteError::MethodNotAllowed),
        }
    }

    /// ログ出力に使う操作名
    pub fn action(&self) -> &'static str {
        match self {
            Route::Health => "health",
            Route::CreateSubscription => "create_subscription",
            Route::ListSubscriptions => "list_subscriptions",
            Route::TotalCost => "total_cost",
            Route::GetSubscription(_) => "get_subscription",
            Route::UpdateSubscription(_) => "update_subscription",
            Route::DeleteSubscription(_) => "delete_subscription",
        }
    }
}

/// HTTPリクエストを処理してレスポンスを返す
///
/// エラーはすべてJSONのエラーレスポンスに変換されるため、
/// この関数自体は失敗しない。
pub async fn handle_request<B>(req: Request<B>, state: Arc<AppState>) -> Response<String>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let route = match Route::resolve(&method, &path) {
        Ok(route) => route,
        Err(RouteError::NotFound) => {
            log::debug!("未対応のリクエスト: {method} {path}");
            return message_response(StatusCode::NOT_FOUND, "not found");
        }
        Err(RouteError::MethodNotAllowed) => {
            log::debug!("許可されていないメソッド: {method} {path}");
            return message_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        }
    };

    let action = route.action();
    state.logger.started(action, method.as_str(), &path);

    match dispatch(route, req, Arc::clone(&state)).await {
        Ok(response) => response,
        Err(e) => {
            state.logger.failed(action, &e);
            error_response(&e)
        }
    }
}

/// 本文を読み込んだ後、ハンドラーをブロッキング用スレッドで実行する
///
/// ハンドラーは SQLite への同期アクセスを含むため、
/// tokio のワーカースレッドを占有しないようにする。
async fn dispatch<B>(
    route: Route,
    req: Request<B>,
    state: Arc<AppState>,
) -> AppResult<Response<String>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let query = parse_query(req.uri().query());
    let body = match route {
        Route::CreateSubscription | Route::UpdateSubscription(_) => read_body(req).await?,
        _ => Bytes::new(),
    };

    tokio::task::spawn_blocking(move || {
        let state = &*state;
        match route {
            Route::Health => Ok(empty_response(StatusCode::OK)),
            Route::CreateSubscription => handlers::create_subscription(state, &body),
            Route::ListSubscriptions => handlers::list_subscriptions(state, &query),
            Route::TotalCost => handlers::total_cost(state, &query),
            Route::GetSubscription(id) => handlers::get_subscription(state, &id),
            Route::UpdateSubscription(id) => handlers::update_subscription(state, &id, &body),
            Route::DeleteSubscription(id) => handlers::delete_subscription(state, &id),
        }
    })
    .await
    .map_err(|e| AppError::concurrency(format!("リクエスト処理タスクが異常終了しました: {e}")))?
}

/// リクエスト本文を上限付きで読み込む
async fn read_body<B>(req: Request<B>) -> AppResult<Bytes>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let limited = Limited::new(req.into_body(), MAX_BODY_BYTES);
    match limited.collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) => {
            log::debug!("リクエスト本文の読み込みに失敗しました: {e}");
            Err(AppError::validation("invalid request"))
        }
    }
}

/// クエリ文字列を解析する
///
/// 同じキーが複数ある場合は最初の値を使う。
fn parse_query(query: Option<&str>) -> QueryParams {
    let mut params = QueryParams::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            params.entry(key.into_owned()).or_insert_with(|| value.into_owned());
        }
    }
    params
}
