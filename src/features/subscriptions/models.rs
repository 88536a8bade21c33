use crate::shared::month::MonthKey;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 料金付きサービス（名前と金額の組で一意）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
}

/// サブスクリプションデータモデル
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub service: Service,
    pub user_id: Uuid,
    pub start_date: MonthKey,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<MonthKey>,
    pub created_at: String,
}

/// サブスクリプション登録用の入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: MonthKey,
    pub end_date: Option<MonthKey>,
}

/// サブスクリプション更新用の入力
///
/// `None` の項目は現在の値を維持する。`end_date` は
/// `Some(None)` で終了日を解除する。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub service_name: Option<String>,
    pub price: Option<i64>,
    pub end_date: Option<Option<MonthKey>>,
}

/// ページ単位の一覧レスポンス
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

/// サービス情報（登録リクエスト）
#[derive(Debug, Clone, Deserialize)]
pub struct CreateServiceRequest {
    pub name: Option<String>,
    pub price: Option<i64>,
}

/// サブスクリプション登録リクエスト
///
/// 必須項目の欠落はバリデーションで検出するため、すべて Option で受け取る。
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub service: Option<CreateServiceRequest>,
    pub user_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// サービス情報（更新リクエスト）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateServiceRequest {
    pub name: Option<String>,
    pub price: Option<i64>,
}

/// サブスクリプション更新リクエスト
///
/// `end_date` は省略時 `None`、`null` 指定時 `Some(None)` になる。
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub service: Option<UpdateServiceRequest>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub end_date: Option<Option<String>>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// 合計金額計算のクエリパラメータ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TotalCostQuery {
    pub user_id: Option<String>,
    pub service_name: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}
