use super::models::{PeriodFilter, SubscriptionPeriod};
use crate::features::subscriptions::repository::{month_column, optional_month_column};
use crate::shared::errors::{AppError, AppResult};
use rusqlite::{params, Connection};

/// 集計対象となるサブスクリプション期間の取得元
///
/// 集計期間と重なるすべての期間を登録順に返す。重複排除は行わない
/// （重複排除は集計側の責務）。
pub trait PeriodSource: Send + Sync {
    fn fetch_periods(&self, filter: &PeriodFilter) -> AppResult<Vec<SubscriptionPeriod>>;
}

/// 集計期間と重なるサブスクリプション期間を取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `filter` - ユーザー・サービス名・集計期間による絞り込み条件
///
/// # 戻り値
/// 期間のリスト（登録順）、または失敗時はエラー
///
/// # 抽出条件
/// `start_date <= 期間終了 AND (end_date IS NULL OR end_date >= 期間開始)`
pub fn fetch_periods(conn: &Connection, filter: &PeriodFilter) -> AppResult<Vec<SubscriptionPeriod>> {
    let mut stmt = conn.prepare(
        "SELECT svc.price, s.start_date, s.end_date
         FROM subscriptions s
         JOIN services svc ON s.service_id = svc.id
         WHERE s.start_date <= ?1
           AND (s.end_date IS NULL OR s.end_date >= ?2)
           AND (?3 IS NULL OR s.user_id = ?3)
           AND (?4 IS NULL OR svc.name = ?4)
         ORDER BY s.seq ASC",
    )?;

    let periods = stmt.query_map(
        params![
            filter.window.end_month.to_storage(),
            filter.window.start_month.to_storage(),
            filter.user_id.map(|id| id.to_string()),
            filter.service_name.as_deref(),
        ],
        |row| {
            Ok(SubscriptionPeriod {
                price: row.get(0)?,
                start_month: month_column(row, 1)?,
                end_month: optional_month_column(row, 2)?,
            })
        },
    )?;

    periods
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::features::reports::models::QueryWindow;
    use crate::features::subscriptions::models::NewSubscription;
    use crate::features::subscriptions::repository;
    use crate::shared::month::MonthKey;
    use uuid::Uuid;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn month(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    fn insert(
        conn: &Connection,
        user_id: Uuid,
        name: &str,
        price: i64,
        start: MonthKey,
        end: Option<MonthKey>,
    ) {
        repository::create(
            conn,
            NewSubscription {
                service_name: name.to_string(),
                price,
                user_id,
                start_date: start,
                end_date: end,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_fetch_periods_returns_intersecting_only() {
        let conn = create_test_db();
        let user = Uuid::new_v4();

        insert(&conn, user, "A", 100, month(2023, 1), Some(month(2023, 12))); // 期間より前
        insert(&conn, user, "B", 200, month(2024, 1), Some(month(2024, 3))); // 開始境界で接する
        insert(&conn, user, "C", 300, month(2024, 6), None); // 終了境界で接する
        insert(&conn, user, "D", 400, month(2024, 7), None); // 期間より後
        insert(&conn, user, "E", 500, month(2020, 1), None); // 終了日なし

        let window = QueryWindow::new(month(2024, 3), month(2024, 6)).unwrap();
        let periods = fetch_periods(&conn, &PeriodFilter::new(window)).unwrap();
        let prices: Vec<_> = periods.iter().map(|p| p.price).collect();

        assert_eq!(prices, vec![200, 300, 500]);
    }

    #[test]
    fn test_fetch_periods_keeps_insertion_order() {
        let conn = create_test_db();
        let user = Uuid::new_v4();

        insert(&conn, user, "Late", 100, month(2024, 3), None);
        insert(&conn, user, "Early", 200, month(2024, 1), None);

        let window = QueryWindow::new(month(2024, 1), month(2024, 4)).unwrap();
        let periods = fetch_periods(&conn, &PeriodFilter::new(window)).unwrap();

        assert_eq!(periods[0].price, 100);
        assert_eq!(periods[1].price, 200);
    }

    #[test]
    fn test_fetch_periods_applies_filters() {
        let conn = create_test_db();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        insert(&conn, alice, "Music", 100, month(2024, 1), None);
        insert(&conn, alice, "Video", 200, month(2024, 1), None);
        insert(&conn, bob, "Music", 300, month(2024, 1), None);

        let window = QueryWindow::new(month(2024, 1), month(2024, 1)).unwrap();

        let by_user = fetch_periods(&conn, &PeriodFilter::new(window).with_user(Some(alice))).unwrap();
        assert_eq!(by_user.len(), 2);

        let by_service = fetch_periods(
            &conn,
            &PeriodFilter::new(window).with_service_name(Some("Music".to_string())),
        )
        .unwrap();
        assert_eq!(by_service.iter().map(|p| p.price).collect::<Vec<_>>(), vec![100, 300]);

        let both = fetch_periods(
            &conn,
            &PeriodFilter::new(window)
                .with_user(Some(bob))
                .with_service_name(Some("Music".to_string())),
        )
        .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].price, 300);

        let unknown = fetch_periods(
            &conn,
            &PeriodFilter::new(window).with_service_name(Some("Nothing".to_string())),
        )
        .unwrap();
        assert!(unknown.is_empty());
    }

    #[test]
    fn test_fetch_periods_does_not_deduplicate() {
        let conn = create_test_db();
        let user = Uuid::new_v4();

        insert(&conn, user, "Same", 100, month(2024, 1), Some(month(2024, 1)));
        insert(&conn, user, "Same", 100, month(2024, 1), Some(month(2024, 1)));

        let window = QueryWindow::new(month(2024, 1), month(2024, 1)).unwrap();
        let periods = fetch_periods(&conn, &PeriodFilter::new(window)).unwrap();
        assert_eq!(periods.len(), 2);
    }
}
