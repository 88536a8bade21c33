use super::models::{
    CreateSubscriptionRequest, TotalCostQuery, UpdateSubscriptionRequest,
};
use crate::features::reports::models::TotalCost;
use crate::server::logger::LogEntry;
use crate::server::response::{empty_response, json_response};
use crate::shared::errors::{AppError, AppResult};
use crate::AppState;
use hyper::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// クエリパラメータ
pub type QueryParams = HashMap<String, String>;

/// サブスクリプションを登録する
///
/// # 引数
/// * `state` - アプリケーション状態
/// * `body` - リクエスト本文（JSON）
///
/// # 戻り値
/// 201 と登録されたサブスクリプション
pub fn create_subscription(state: &AppState, body: &[u8]) -> AppResult<Response<String>> {
    let request: CreateSubscriptionRequest = decode_json(body)?;
    let new = state.validator.parse_create(request)?;
    let created = state.service.create_subscription(new)?;

    state.logger.completed(
        LogEntry::new("create_subscription", "サブスクリプションを登録しました")
            .with_context("subscription_id", created.id)
            .with_user_id(created.user_id),
    );
    json_response(StatusCode::CREATED, &created)
}

/// IDでサブスクリプションを取得する
pub fn get_subscription(state: &AppState, raw_id: &str) -> AppResult<Response<String>> {
    let id = state.validator.parse_subscription_id(raw_id)?;
    let subscription = state.service.get_subscription(id)?;

    state.logger.completed(
        LogEntry::new("get_subscription", "サブスクリプションを取得しました")
            .with_context("subscription_id", id),
    );
    json_response(StatusCode::OK, &subscription)
}

/// サブスクリプションを更新する
///
/// 成功時は本文なしの 204 を返す。
pub fn update_subscription(
    state: &AppState,
    raw_id: &str,
    body: &[u8],
) -> AppResult<Response<String>> {
    let id = state.validator.parse_subscription_id(raw_id)?;
    let request: UpdateSubscriptionRequest = decode_json(body)?;
    let changes = state.validator.parse_update(request)?;
    state.service.update_subscription(id, changes)?;

    state.logger.completed(
        LogEntry::new("update_subscription", "サブスクリプションを更新しました")
            .with_context("subscription_id", id),
    );
    Ok(empty_response(StatusCode::NO_CONTENT))
}

/// サブスクリプションを削除する
pub fn delete_subscription(state: &AppState, raw_id: &str) -> AppResult<Response<String>> {
    let id = state.validator.parse_subscription_id(raw_id)?;
    state.service.delete_subscription(id)?;

    state.logger.completed(
        LogEntry::new("delete_subscription", "サブスクリプションを削除しました")
            .with_context("subscription_id", id),
    );
    Ok(empty_response(StatusCode::NO_CONTENT))
}

/// ユーザーのサブスクリプション一覧を取得する
///
/// # 引数
/// * `query` - `user_id`（必須）、`page`、`limit`
pub fn list_subscriptions(state: &AppState, query: &QueryParams) -> AppResult<Response<String>> {
    let raw_user = query.get("user_id").map(String::as_str).unwrap_or_default();
    let user_id = state.validator.parse_user_id(raw_user)?;
    let (page, limit) = state.validator.pagination(
        query.get("page").map(String::as_str),
        query.get("limit").map(String::as_str),
    );

    let result = state.service.list_subscriptions(user_id, page, limit)?;

    state.logger.completed(
        LogEntry::new("list_subscriptions", "サブスクリプション一覧を取得しました")
            .with_user_id(user_id)
            .with_context("page", page)
            .with_context("limit", limit)
            .with_context("total", result.total),
    );
    json_response(StatusCode::OK, &result)
}

/// 期間内の合計金額を計算する
///
/// # 引数
/// * `query` - `start_date`、`end_date`（必須）、`user_id`、`service_name`
///
/// # 戻り値
/// 200 と `{"total": n}`
pub fn total_cost(state: &AppState, query: &QueryParams) -> AppResult<Response<String>> {
    let query = TotalCostQuery {
        user_id: query.get("user_id").cloned(),
        service_name: query.get("service_name").cloned(),
        start_date: query.get("start_date").cloned(),
        end_date: query.get("end_date").cloned(),
    };
    let params = state.validator.parse_total_cost(query)?;

    let mut entry = LogEntry::new("total_cost", "合計金額を計算しました")
        .with_context("start_date", params.start)
        .with_context("end_date", params.end);
    if let Some(user_id) = params.user_id {
        entry = entry.with_user_id(user_id);
    }
    if let Some(ref name) = params.service_name {
        entry = entry.with_context("service_name", name);
    }

    let total = state.service.calculate_total_cost(
        params.user_id,
        params.service_name,
        params.start,
        params.end,
    )?;

    state.logger.completed(entry.with_context("total", total));
    json_response(StatusCode::OK, &TotalCost { total })
}

fn decode_json<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        log::debug!("リクエスト本文の解析に失敗しました: {e}");
        AppError::validation("invalid request")
    })
}
