use super::models::{NewSubscription, Page, Subscription, SubscriptionUpdate};
use super::repository::SubscriptionStore;
use crate::features::reports::aggregator::CostAggregator;
use crate::features::reports::models::{PeriodFilter, QueryWindow};
use crate::features::reports::repository::PeriodSource;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::month::MonthKey;
use std::sync::Arc;
use uuid::Uuid;

/// 一覧取得の1ページあたりの最大件数
pub const MAX_PAGE_LIMIT: u32 = 100;

/// サブスクリプションの業務ロジック
///
/// 永続化（`SubscriptionStore`）と期間取得（`PeriodSource`）を
/// 別々に受け取り、合計金額の計算は `CostAggregator` に委ねる。
#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
    periods: Arc<dyn PeriodSource>,
    aggregator: CostAggregator,
}

impl SubscriptionService {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        periods: Arc<dyn PeriodSource>,
        aggregator: CostAggregator,
    ) -> Self {
        Self {
            store,
            periods,
            aggregator,
        }
    }

    /// サブスクリプションを登録する
    ///
    /// # 引数
    /// * `new` - 登録内容
    ///
    /// # 戻り値
    /// 登録されたサブスクリプション、または業務ルール違反・永続化失敗時はエラー
    pub fn create_subscription(&self, mut new: NewSubscription) -> AppResult<Subscription> {
        new.service_name = new.service_name.trim().to_string();
        validate_service_name(&new.service_name)?;
        validate_price(new.price)?;
        validate_period(new.start_date, new.end_date)?;

        let created = self.store.insert(new)?;
        log::debug!("サブスクリプションを登録しました: id={}", created.id);
        Ok(created)
    }

    /// IDでサブスクリプションを取得する
    pub fn get_subscription(&self, id: Uuid) -> AppResult<Subscription> {
        self.store.find_by_id(id)
    }

    /// サブスクリプションを更新する
    ///
    /// 指定されなかった項目は現在の値を維持する。
    ///
    /// # 引数
    /// * `id` - サブスクリプションID
    /// * `changes` - 変更内容
    ///
    /// # 戻り値
    /// 更新後のサブスクリプション
    pub fn update_subscription(
        &self,
        id: Uuid,
        changes: SubscriptionUpdate,
    ) -> AppResult<Subscription> {
        let mut current = self.store.find_by_id(id)?;

        if let Some(name) = changes.service_name {
            current.service.name = name.trim().to_string();
        }
        if let Some(price) = changes.price {
            current.service.price = price;
        }
        if let Some(end_date) = changes.end_date {
            current.end_date = end_date;
        }

        validate_service_name(&current.service.name)?;
        validate_price(current.service.price)?;
        validate_period(current.start_date, current.end_date)?;

        self.store.update(&current)?;
        self.store.find_by_id(id)
    }

    /// サブスクリプションを削除する
    pub fn delete_subscription(&self, id: Uuid) -> AppResult<()> {
        self.store.delete(id)
    }

    /// ユーザーのサブスクリプション一覧をページ単位で取得する
    ///
    /// # 引数
    /// * `user_id` - ユーザーID
    /// * `page` - ページ番号（1始まり）
    /// * `limit` - 1ページあたりの件数（1〜100）
    pub fn list_subscriptions(
        &self,
        user_id: Uuid,
        page: u32,
        limit: u32,
    ) -> AppResult<Page<Subscription>> {
        if page == 0 {
            return Err(AppError::validation("field 'page' is invalid"));
        }
        if limit == 0 || limit > MAX_PAGE_LIMIT {
            return Err(AppError::validation("field 'limit' is invalid"));
        }

        let offset = i64::from(page - 1) * i64::from(limit);
        let items = self.store.list_by_user(user_id, offset, i64::from(limit))?;
        let total = self.store.count_by_user(user_id)?;

        Ok(Page {
            items,
            total,
            page,
            limit,
        })
    }

    /// 期間内のサブスクリプション合計金額を計算する
    ///
    /// # 引数
    /// * `user_id` - ユーザーIDによる絞り込み（任意）
    /// * `service_name` - サービス名による絞り込み（任意）
    /// * `start` - 集計開始月
    /// * `end` - 集計終了月
    ///
    /// # 戻り値
    /// 合計金額。該当するサブスクリプションがない場合は0
    pub fn calculate_total_cost(
        &self,
        user_id: Option<Uuid>,
        service_name: Option<String>,
        start: MonthKey,
        end: MonthKey,
    ) -> AppResult<i64> {
        let window = QueryWindow::new(start, end)?;
        let filter = PeriodFilter::new(window)
            .with_user(user_id)
            .with_service_name(service_name);

        let periods = self.periods.fetch_periods(&filter)?;
        let total = self.aggregator.aggregate(&periods, &window);

        log::debug!(
            "合計金額を計算しました: periods={}, window={}..{}, total={total}",
            periods.len(),
            window.start_month,
            window.end_month
        );

        Ok(total)
    }
}

fn validate_service_name(name: &str) -> AppResult<()> {
    if name.is_empty() {
        return Err(AppError::business_rule("empty service name"));
    }
    Ok(())
}

fn validate_price(price: i64) -> AppResult<()> {
    if price <= 0 {
        return Err(AppError::business_rule("price must be positive"));
    }
    Ok(())
}

fn validate_period(start: MonthKey, end: Option<MonthKey>) -> AppResult<()> {
    match end {
        Some(end) if end < start => Err(AppError::business_rule("end date before start date")),
        _ => Ok(()),
    }
}
