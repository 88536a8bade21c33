use crate::features::reports::models::{PeriodFilter, SubscriptionPeriod};
use crate::features::reports::repository::{self as report_repository, PeriodSource};
use crate::features::subscriptions::models::{NewSubscription, Subscription};
use crate::features::subscriptions::repository::{self as subscription_repository, SubscriptionStore};
use crate::shared::errors::{AppError, AppResult};
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// SQLite をバックエンドとするストア
///
/// `SubscriptionStore` と `PeriodSource` の両方を実装する。
/// 接続はリポジトリ呼び出し1回の間だけロックする。
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// データベース接続を取得する
    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AppError::concurrency(format!("データベースロックエラー: {e}")))
    }
}

impl SubscriptionStore for SqliteStore {
    fn insert(&self, subscription: NewSubscription) -> AppResult<Subscription> {
        let conn = self.lock()?;
        subscription_repository::create(&conn, subscription)
    }

    fn find_by_id(&self, id: Uuid) -> AppResult<Subscription> {
        let conn = self.lock()?;
        subscription_repository::find_by_id(&conn, id)
    }

    fn update(&self, subscription: &Subscription) -> AppResult<()> {
        let conn = self.lock()?;
        subscription_repository::update(&conn, subscription)
    }

    fn delete(&self, id: Uuid) -> AppResult<()> {
        let conn = self.lock()?;
        subscription_repository::delete(&conn, id)
    }

    fn list_by_user(&self, user_id: Uuid, offset: i64, limit: i64) -> AppResult<Vec<Subscription>> {
        let conn = self.lock()?;
        subscription_repository::list_by_user(&conn, user_id, offset, limit)
    }

    fn count_by_user(&self, user_id: Uuid) -> AppResult<i64> {
        let conn = self.lock()?;
        subscription_repository::count_by_user(&conn, user_id)
    }
}

impl PeriodSource for SqliteStore {
    fn fetch_periods(&self, filter: &PeriodFilter) -> AppResult<Vec<SubscriptionPeriod>> {
        let conn = self.lock()?;
        let periods = report_repository::fetch_periods(&conn, filter)?;
        debug_assert!(
            periods.iter().all(|p| p.intersects(&filter.window)),
            "集計期間と重ならない期間が取得されました"
        );
        Ok(periods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::features::reports::models::QueryWindow;
    use crate::shared::month::MonthKey;
    use std::sync::Arc;
    use std::thread;

    fn create_store() -> SqliteStore {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        SqliteStore::new(conn)
    }

    #[test]
    fn test_store_serves_both_capabilities() {
        let store = create_store();
        let user_id = Uuid::new_v4();
        let start = MonthKey::new(2024, 1).unwrap();

        let created = store
            .insert(NewSubscription {
                service_name: "Cloud".to_string(),
                price: 150,
                user_id,
                start_date: start,
                end_date: None,
            })
            .unwrap();
        assert_eq!(store.find_by_id(created.id).unwrap().id, created.id);
        assert_eq!(store.count_by_user(user_id).unwrap(), 1);

        let window = QueryWindow::new(start, start).unwrap();
        let periods = store.fetch_periods(&PeriodFilter::new(window)).unwrap();
        assert_eq!(periods, vec![SubscriptionPeriod::new(150, start, None)]);
    }

    #[test]
    fn test_fetched_periods_all_intersect_window() {
        let store = create_store();
        let user_id = Uuid::new_v4();
        let month = |m| MonthKey::new(2024, m).unwrap();

        for (start, end) in [(1, Some(2)), (2, Some(4)), (5, None), (8, None)] {
            store
                .insert(NewSubscription {
                    service_name: "Cloud".to_string(),
                    price: 100,
                    user_id,
                    start_date: month(start),
                    end_date: end.map(month),
                })
                .unwrap();
        }

        let window = QueryWindow::new(month(3), month(6)).unwrap();
        let periods = store.fetch_periods(&PeriodFilter::new(window)).unwrap();

        assert_eq!(periods.len(), 2);
        assert!(periods.iter().all(|p| p.intersects(&window)));
    }

    #[test]
    fn test_store_is_shareable_across_threads() {
        let store = Arc::new(create_store());
        let user_id = Uuid::new_v4();

        let handles: Vec<_> = (1..=4)
            .map(|m| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store
                        .insert(NewSubscription {
                            service_name: "Parallel".to_string(),
                            price: 10,
                            user_id,
                            start_date: MonthKey::new(2024, m).unwrap(),
                            end_date: None,
                        })
                        .unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.count_by_user(user_id).unwrap(), 4);
    }
}
