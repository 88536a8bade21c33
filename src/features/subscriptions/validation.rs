use super::models::{
    CreateSubscriptionRequest, NewSubscription, SubscriptionUpdate, TotalCostQuery,
    UpdateSubscriptionRequest,
};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::month::MonthKey;
use uuid::{Uuid, Version};

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 10;

/// 合計金額計算の検証済みパラメータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalCostParams {
    pub user_id: Option<Uuid>,
    pub service_name: Option<String>,
    pub start: MonthKey,
    pub end: MonthKey,
}

/// HTTPリクエストの入力検証を行うコンポーネント
///
/// アプリケーション起動時に生成し、`AppState` 経由でハンドラーに渡す。
#[derive(Debug, Clone)]
pub struct RequestValidator {
    name_min_chars: usize,
    name_max_chars: usize,
    max_page_limit: u32,
}

impl Default for RequestValidator {
    fn default() -> Self {
        Self {
            name_min_chars: 2,
            name_max_chars: 100,
            max_page_limit: super::service::MAX_PAGE_LIMIT,
        }
    }
}

impl RequestValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登録リクエストを検証して登録内容に変換する
    ///
    /// # 引数
    /// * `request` - 登録リクエスト
    ///
    /// # 戻り値
    /// 登録内容、または最初に見つかった入力エラー
    pub fn parse_create(&self, request: CreateSubscriptionRequest) -> AppResult<NewSubscription> {
        let service = request.service.ok_or_else(|| required("service"))?;
        let name = required_text(service.name, "name")?;
        let price = service.price.ok_or_else(|| required("price"))?;
        let user_id = required_text(request.user_id, "user_id")?;
        let start_date = required_text(request.start_date, "start_date")?;

        self.check_service_name("name", &name)?;
        check_price(price)?;

        let user_id = self.parse_user_id(&user_id)?;
        let start_date = self.parse_month(&start_date)?;
        let end_date = match request.end_date.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(self.parse_month(raw)?),
        };

        Ok(NewSubscription {
            service_name: name.trim().to_string(),
            price,
            user_id,
            start_date,
            end_date,
        })
    }

    /// 更新リクエストを検証して変更内容に変換する
    ///
    /// `end_date` が省略された場合は現在の終了月を維持し、
    /// `null` または空文字列の場合は終了月を解除する。
    pub fn parse_update(&self, request: UpdateSubscriptionRequest) -> AppResult<SubscriptionUpdate> {
        let service = request.service.ok_or_else(|| required("service"))?;

        if let Some(ref name) = service.name {
            self.check_service_name("name", name)?;
        }
        if let Some(price) = service.price {
            check_price(price)?;
        }

        let end_date = match request.end_date {
            None => None,
            Some(None) => Some(None),
            Some(Some(raw)) if raw.is_empty() => Some(None),
            Some(Some(raw)) => Some(Some(self.parse_month(&raw)?)),
        };

        Ok(SubscriptionUpdate {
            service_name: service.name.map(|n| n.trim().to_string()),
            price: service.price,
            end_date,
        })
    }

    /// 合計金額計算のクエリを検証する
    ///
    /// 期間の前後関係は業務ルールとしてサービス層で検証する。
    pub fn parse_total_cost(&self, query: TotalCostQuery) -> AppResult<TotalCostParams> {
        let start = required_text(query.start_date, "start_date")?;
        let end = required_text(query.end_date, "end_date")?;

        // 登録時と同じく前後の空白を除いた名前で照合する
        let service_name = match query.service_name {
            Some(name) if !name.is_empty() => {
                self.check_service_name("service_name", &name)?;
                Some(name.trim().to_string())
            }
            _ => None,
        };

        let user_id = match query.user_id.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(self.parse_user_id(raw)?),
        };

        Ok(TotalCostParams {
            user_id,
            service_name,
            start: self.parse_month(&start)?,
            end: self.parse_month(&end)?,
        })
    }

    /// パスパラメータのサブスクリプションIDを解析する
    pub fn parse_subscription_id(&self, raw: &str) -> AppResult<Uuid> {
        Uuid::parse_str(raw).map_err(|_| AppError::validation("invalid subscription id"))
    }

    /// ユーザーID（UUID v4）を解析する
    pub fn parse_user_id(&self, raw: &str) -> AppResult<Uuid> {
        match Uuid::parse_str(raw) {
            Ok(id) if id.get_version() == Some(Version::Random) => Ok(id),
            _ => Err(AppError::validation("invalid user id")),
        }
    }

    /// MM-YYYY 形式の月を解析する
    pub fn parse_month(&self, raw: &str) -> AppResult<MonthKey> {
        MonthKey::parse_api(raw).map_err(|_| AppError::validation("invalid date format, use MM-YYYY"))
    }

    /// ページ番号と件数を解釈する
    ///
    /// 不正な値や範囲外の値は既定値（page=1, limit=10）に置き換える。
    pub fn pagination(&self, page: Option<&str>, limit: Option<&str>) -> (u32, u32) {
        let page = page
            .and_then(|p| p.parse::<u32>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(DEFAULT_PAGE);
        let limit = limit
            .and_then(|l| l.parse::<u32>().ok())
            .filter(|l| (1..=self.max_page_limit).contains(l))
            .unwrap_or(DEFAULT_LIMIT);
        (page, limit)
    }

    fn check_service_name(&self, field: &str, name: &str) -> AppResult<()> {
        let length = name.trim().chars().count();
        if length < self.name_min_chars || length > self.name_max_chars {
            return Err(AppError::validation(format!("field '{field}' is invalid")));
        }
        Ok(())
    }
}

fn required(field: &str) -> AppError {
    AppError::validation(format!("field '{field}' is required"))
}

/// 必須の文字列項目を取り出す（空文字列は未指定として扱う）
fn required_text(value: Option<String>, field: &str) -> AppResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| required(field))
}

fn check_price(price: i64) -> AppResult<()> {
    if price <= 0 {
        return Err(AppError::validation("field 'price' must be greater than 0"));
    }
    Ok(())
}
