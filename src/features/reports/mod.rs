/// コスト集計機能モジュール
///
/// サブスクリプション期間を月単位に展開し、同じ月を二重に数えずに
/// 期間内の合計金額を求める。
pub mod aggregator;
pub mod models;
pub mod repository;

pub use aggregator::CostAggregator;
pub use models::{PeriodFilter, QueryWindow, SubscriptionPeriod, TotalCost};
pub use repository::PeriodSource;
