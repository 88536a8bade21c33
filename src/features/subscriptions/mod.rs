/// サブスクリプション機能モジュール
///
/// このモジュールは、サブスクリプション管理に関連する機能を提供します：
/// - サブスクリプションの登録、取得、更新、削除
/// - ユーザー単位の一覧取得（ページング）
/// - 期間内の合計金額の計算
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod validation;

// 公開インターフェース
pub use models::{NewSubscription, Page, Service, Subscription, SubscriptionUpdate};
pub use repository::SubscriptionStore;
pub use service::SubscriptionService;
pub use validation::RequestValidator;
