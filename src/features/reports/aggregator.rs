use super::models::{QueryWindow, SubscriptionPeriod};
use crate::shared::month::MonthRange;
use std::collections::HashSet;

/// サブスクリプション期間から集計期間内の合計金額を算出するコンポーネント
///
/// 状態を持たないため、複数のリクエストから同時に使用してよい。
#[derive(Debug, Clone, Copy, Default)]
pub struct CostAggregator;

impl CostAggregator {
    pub fn new() -> Self {
        Self
    }

    /// 集計期間内の合計金額を計算する
    ///
    /// # 引数
    /// * `periods` - 対象となるサブスクリプション期間（取得順）
    /// * `window` - 集計期間
    ///
    /// # 戻り値
    /// 合計金額（0以上）
    ///
    /// # 計算ルール
    /// 1. 各期間を集計期間で切り取る
    /// 2. 切り取った範囲の月を1か月ずつ列挙する
    /// 3. 同じ月は1回だけ計上する。複数の期間が同じ月を含む場合、
    ///    先に現れた期間の金額が採用され、後の期間はその月について無視される
    pub fn aggregate(&self, periods: &[SubscriptionPeriod], window: &QueryWindow) -> i64 {
        let mut seen = HashSet::new();
        let mut total: i64 = 0;

        for period in periods {
            let Some(months) = clip(period, window) else {
                continue;
            };

            for month in months {
                if seen.insert(month) {
                    total = total.saturating_add(period.price);
                }
            }
        }

        total
    }
}

/// 期間を集計期間で切り取る
///
/// # 引数
/// * `period` - サブスクリプション期間
/// * `window` - 集計期間
///
/// # 戻り値
/// 重なる月の範囲、重ならない場合は None
pub fn clip(period: &SubscriptionPeriod, window: &QueryWindow) -> Option<MonthRange> {
    let start = period.start_month.max(window.start_month);
    let end = period
        .end_month
        .map_or(window.end_month, |end| end.min(window.end_month));

    if end < start {
        return None;
    }

    Some(MonthRange::inclusive(start, end))
}
