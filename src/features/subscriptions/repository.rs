use super::models::{NewSubscription, Service, Subscription};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::month::MonthKey;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use uuid::Uuid;

/// サブスクリプションの永続化を担うストア
///
/// 集計用の期間取得（`PeriodSource`）とは別の能力として定義する。
pub trait SubscriptionStore: Send + Sync {
    fn insert(&self, subscription: NewSubscription) -> AppResult<Subscription>;
    fn find_by_id(&self, id: Uuid) -> AppResult<Subscription>;
    fn update(&self, subscription: &Subscription) -> AppResult<()>;
    fn delete(&self, id: Uuid) -> AppResult<()>;
    fn list_by_user(&self, user_id: Uuid, offset: i64, limit: i64) -> AppResult<Vec<Subscription>>;
    fn count_by_user(&self, user_id: Uuid) -> AppResult<i64>;
}

const SELECT_SUBSCRIPTION: &str =
    "SELECT s.id, s.user_id, s.start_date, s.end_date, s.created_at, svc.id, svc.name, svc.price
     FROM subscriptions s
     JOIN services svc ON s.service_id = svc.id";

/// 行データをサブスクリプションに変換する
fn map_subscription(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    Ok(Subscription {
        id: uuid_column(row, 0)?,
        user_id: uuid_column(row, 1)?,
        start_date: month_column(row, 2)?,
        end_date: optional_month_column(row, 3)?,
        created_at: row.get(4)?,
        service: Service {
            id: uuid_column(row, 5)?,
            name: row.get(6)?,
            price: row.get(7)?,
        },
    })
}

pub(crate) fn uuid_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Uuid> {
    let value: String = row.get(index)?;
    Uuid::parse_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

pub(crate) fn month_column(row: &Row<'_>, index: usize) -> rusqlite::Result<MonthKey> {
    let value: String = row.get(index)?;
    MonthKey::parse_storage(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

pub(crate) fn optional_month_column(
    row: &Row<'_>,
    index: usize,
) -> rusqlite::Result<Option<MonthKey>> {
    let value: Option<String> = row.get(index)?;
    value
        .map(|v| {
            MonthKey::parse_storage(&v).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e))
            })
        })
        .transpose()
}

fn not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("ID {id} のサブスクリプションが見つかりません"))
}

/// 名前と金額が一致するサービスを取得し、存在しなければ作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `name` - サービス名
/// * `price` - 月額料金
///
/// # 戻り値
/// 既存または新規作成したサービス
pub fn find_or_create_service(conn: &Connection, name: &str, price: i64) -> AppResult<Service> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM services WHERE name = ?1 AND price = ?2",
            params![name, price],
            |row| row.get(0),
        )
        .optional()?;

    let id = match existing {
        Some(id) => Uuid::parse_str(&id)
            .map_err(|e| AppError::Database(format!("サービスIDの形式が不正です: {e}")))?,
        None => {
            let id = Uuid::new_v4();
            conn.execute(
                "INSERT INTO services (id, name, price) VALUES (?1, ?2, ?3)",
                params![id.to_string(), name, price],
            )?;
            log::debug!("サービスを新規作成しました: name={name}, price={price}");
            id
        }
    };

    Ok(Service {
        id,
        name: name.to_string(),
        price,
    })
}

/// サブスクリプションを作成する
///
/// # 引数
/// * `conn` - データベース接続
/// * `new` - 登録内容
///
/// # 戻り値
/// 作成されたサブスクリプション、または失敗時はエラー
pub fn create(conn: &Connection, new: NewSubscription) -> AppResult<Subscription> {
    let tx = conn.unchecked_transaction()?;

    let service = find_or_create_service(&tx, &new.service_name, new.price)?;
    let id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();

    tx.execute(
        "INSERT INTO subscriptions (id, service_id, user_id, start_date, end_date, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id.to_string(),
            service.id.to_string(),
            new.user_id.to_string(),
            new.start_date.to_storage(),
            new.end_date.map(|m| m.to_storage()),
            now,
        ],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == ErrorCode::ConstraintViolation
                && (err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                    || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
        {
            AppError::conflict(format!("ID {id} のサブスクリプションは既に存在します"))
        }
        _ => AppError::from(e),
    })?;

    tx.commit()?;

    find_by_id(conn, id)
}

/// IDでサブスクリプションを取得する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - サブスクリプションID
///
/// # 戻り値
/// サブスクリプション、または失敗時はエラー
pub fn find_by_id(conn: &Connection, id: Uuid) -> AppResult<Subscription> {
    conn.query_row(
        &format!("{SELECT_SUBSCRIPTION} WHERE s.id = ?1"),
        params![id.to_string()],
        map_subscription,
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => not_found(id),
        _ => AppError::Database(e.to_string()),
    })
}

/// サブスクリプションを更新する
///
/// サービス名・金額が変わった場合は対応するサービスを取得または作成して付け替える。
///
/// # 引数
/// * `conn` - データベース接続
/// * `subscription` - 更新後のサブスクリプション
pub fn update(conn: &Connection, subscription: &Subscription) -> AppResult<()> {
    let tx = conn.unchecked_transaction()?;

    let service =
        find_or_create_service(&tx, &subscription.service.name, subscription.service.price)?;

    let rows_affected = tx.execute(
        "UPDATE subscriptions
         SET service_id = ?1, user_id = ?2, start_date = ?3, end_date = ?4
         WHERE id = ?5",
        params![
            service.id.to_string(),
            subscription.user_id.to_string(),
            subscription.start_date.to_storage(),
            subscription.end_date.map(|m| m.to_storage()),
            subscription.id.to_string(),
        ],
    )?;

    if rows_affected == 0 {
        return Err(not_found(subscription.id));
    }

    tx.commit()?;
    Ok(())
}

/// サブスクリプションを削除する
///
/// # 引数
/// * `conn` - データベース接続
/// * `id` - サブスクリプションID
pub fn delete(conn: &Connection, id: Uuid) -> AppResult<()> {
    let rows_affected = conn.execute(
        "DELETE FROM subscriptions WHERE id = ?1",
        params![id.to_string()],
    )?;

    if rows_affected == 0 {
        return Err(not_found(id));
    }

    Ok(())
}

/// ユーザーのサブスクリプション一覧を取得する（開始月の新しい順）
///
/// # 引数
/// * `conn` - データベース接続
/// * `user_id` - ユーザーID
/// * `offset` - 読み飛ばす件数
/// * `limit` - 取得する最大件数
pub fn list_by_user(
    conn: &Connection,
    user_id: Uuid,
    offset: i64,
    limit: i64,
) -> AppResult<Vec<Subscription>> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT_SUBSCRIPTION} WHERE s.user_id = ?1
         ORDER BY s.start_date DESC, s.seq DESC
         LIMIT ?2 OFFSET ?3"
    ))?;

    let subscriptions = stmt.query_map(
        params![user_id.to_string(), limit, offset],
        map_subscription,
    )?;

    subscriptions
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Database(e.to_string()))
}

/// ユーザーのサブスクリプション件数を取得する
pub fn count_by_user(conn: &Connection, user_id: Uuid) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM subscriptions WHERE user_id = ?1",
        params![user_id.to_string()],
        |row| row.get(0),
    )?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    fn create_test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn month(year: i32, month: u32) -> MonthKey {
        MonthKey::new(year, month).unwrap()
    }

    fn new_subscription(user_id: Uuid, name: &str, price: i64, start: MonthKey) -> NewSubscription {
        NewSubscription {
            service_name: name.to_string(),
            price,
            user_id,
            start_date: start,
            end_date: None,
        }
    }

    #[test]
    fn test_subscription_crud_operations() {
        let conn = create_test_db();
        let user_id = Uuid::new_v4();

        // 作成のテスト
        let created = create(&conn, new_subscription(user_id, "Yandex Plus", 400, month(2025, 7)))
            .unwrap();
        assert_eq!(created.service.name, "Yandex Plus");
        assert_eq!(created.service.price, 400);
        assert_eq!(created.start_date, month(2025, 7));
        assert!(created.end_date.is_none());

        // 取得のテスト
        let retrieved = find_by_id(&conn, created.id).unwrap();
        assert_eq!(retrieved, created);

        // 更新のテスト
        let mut changed = retrieved.clone();
        changed.service.name = "Yandex Plus Multi".to_string();
        changed.service.price = 650;
        changed.end_date = Some(month(2025, 12));
        update(&conn, &changed).unwrap();

        let updated = find_by_id(&conn, created.id).unwrap();
        assert_eq!(updated.service.name, "Yandex Plus Multi");
        assert_eq!(updated.service.price, 650);
        assert_eq!(updated.end_date, Some(month(2025, 12)));
        assert_ne!(updated.service.id, created.service.id);

        // 削除のテスト
        delete(&conn, created.id).unwrap();
        assert!(matches!(find_by_id(&conn, created.id), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_services_are_shared_by_name_and_price() {
        let conn = create_test_db();

        let first = create(&conn, new_subscription(Uuid::new_v4(), "Netflix", 999, month(2024, 1)))
            .unwrap();
        let second = create(&conn, new_subscription(Uuid::new_v4(), "Netflix", 999, month(2024, 3)))
            .unwrap();
        let third = create(&conn, new_subscription(Uuid::new_v4(), "Netflix", 1299, month(2024, 3)))
            .unwrap();

        assert_eq!(first.service.id, second.service.id);
        assert_ne!(first.service.id, third.service.id);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM services", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn test_missing_subscription_operations() {
        let conn = create_test_db();
        let id = Uuid::new_v4();

        assert!(matches!(find_by_id(&conn, id), Err(AppError::NotFound(_))));
        assert!(matches!(delete(&conn, id), Err(AppError::NotFound(_))));

        let ghost = Subscription {
            id,
            service: Service {
                id: Uuid::new_v4(),
                name: "Ghost".to_string(),
                price: 1,
            },
            user_id: Uuid::new_v4(),
            start_date: month(2024, 1),
            end_date: None,
            created_at: Utc::now().to_rfc3339(),
        };
        assert!(matches!(update(&conn, &ghost), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_list_by_user_paginates_newest_first() {
        let conn = create_test_db();
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();

        for m in 1..=5 {
            create(&conn, new_subscription(user_id, "Music", 300, month(2024, m))).unwrap();
        }
        create(&conn, new_subscription(other_user, "Music", 300, month(2024, 6))).unwrap();

        assert_eq!(count_by_user(&conn, user_id).unwrap(), 5);
        assert_eq!(count_by_user(&conn, other_user).unwrap(), 1);

        let first_page = list_by_user(&conn, user_id, 0, 2).unwrap();
        let starts: Vec<_> = first_page.iter().map(|s| s.start_date).collect();
        assert_eq!(starts, vec![month(2024, 5), month(2024, 4)]);

        let last_page = list_by_user(&conn, user_id, 4, 2).unwrap();
        assert_eq!(last_page.len(), 1);
        assert_eq!(last_page[0].start_date, month(2024, 1));

        assert!(list_by_user(&conn, Uuid::new_v4(), 0, 10).unwrap().is_empty());
    }
}
