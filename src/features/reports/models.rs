use crate::shared::errors::{AppError, AppResult};
use crate::shared::month::MonthKey;
use serde::Serialize;
use uuid::Uuid;

/// 料金が発生する1つの期間（サブスクリプションの価格付き区間）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionPeriod {
    /// 1か月あたりの料金（正の整数）
    pub price: i64,
    /// 開始月
    pub start_month: MonthKey,
    /// 終了月（None の場合は終了日未設定）
    pub end_month: Option<MonthKey>,
}

impl SubscriptionPeriod {
    pub fn new(price: i64, start_month: MonthKey, end_month: Option<MonthKey>) -> Self {
        Self {
            price,
            start_month,
            end_month,
        }
    }

    /// 期間が集計期間と1か月でも重なるかを判定する
    pub fn intersects(&self, window: &QueryWindow) -> bool {
        self.start_month <= window.end_month
            && self.end_month.map_or(true, |end| end >= window.start_month)
    }
}

/// 集計期間（開始月・終了月ともに含む）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryWindow {
    pub start_month: MonthKey,
    pub end_month: MonthKey,
}

impl QueryWindow {
    /// 集計期間を作成する
    ///
    /// # 引数
    /// * `start_month` - 開始月
    /// * `end_month` - 終了月
    ///
    /// # 戻り値
    /// 集計期間、または開始月が終了月より後の場合は業務ルールエラー
    pub fn new(start_month: MonthKey, end_month: MonthKey) -> AppResult<Self> {
        if start_month > end_month {
            return Err(AppError::business_rule("invalid date range"));
        }

        Ok(Self {
            start_month,
            end_month,
        })
    }
}

/// 期間取得時の絞り込み条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodFilter {
    pub user_id: Option<Uuid>,
    pub service_name: Option<String>,
    pub window: QueryWindow,
}

impl PeriodFilter {
    pub fn new(window: QueryWindow) -> Self {
        Self {
            user_id: None,
            service_name: None,
            window,
        }
    }

    pub fn with_user(mut self, user_id: Option<Uuid>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn with_service_name(mut self, service_name: Option<String>) -> Self {
        self.service_name = service_name;
        self
    }
}

/// 合計金額のレスポンス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TotalCost {
    pub total: i64,
}
