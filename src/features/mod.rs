/// 機能別モジュール
///
/// 各機能モジュールは、その機能に関連するコード（モデル、データベース操作、サービス）
/// を含む自己完結型のユニットです。
// 機能モジュールの宣言
pub mod reports;
pub mod subscriptions;
