use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// API で受け付ける月の形式（MM-YYYY）
static API_MONTH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})-(\d{4})$").expect("月形式の正規表現が不正です"));

/// データベースに保存する月の形式（YYYY-MM）
static STORAGE_MONTH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})$").expect("保存形式の正規表現が不正です"));

/// 月の解析エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonthParseError {
    /// 形式が MM-YYYY（または YYYY-MM）ではない
    #[error("月の形式が不正です: {0}")]
    InvalidFormat(String),

    /// 月が1から12の範囲外
    #[error("月は1から12の間で指定してください: {0}")]
    MonthOutOfRange(u32),
}

/// 暦月を表す値（年, 月）
///
/// 集計時の重複排除の単位として使う。`Ord` は年→月の順で比較されるため、
/// 時系列順と一致する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// 年と月から MonthKey を作成する
    ///
    /// # 引数
    /// * `year` - 西暦年（0〜9999）
    /// * `month` - 月（1〜12）
    ///
    /// # 戻り値
    /// 範囲内であれば Some、それ以外は None
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (0..=9999).contains(&year) && (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// 翌月を返す
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// API 形式（MM-YYYY）の文字列を解析する
    ///
    /// # 引数
    /// * `value` - "01-2024" のような文字列
    ///
    /// # 戻り値
    /// 解析した MonthKey、または失敗時はエラー
    pub fn parse_api(value: &str) -> Result<Self, MonthParseError> {
        let captures = API_MONTH_PATTERN
            .captures(value)
            .ok_or_else(|| MonthParseError::InvalidFormat(value.to_string()))?;
        Self::from_parts(&captures[2], &captures[1], value)
    }

    /// 保存形式（YYYY-MM）の文字列を解析する
    pub fn parse_storage(value: &str) -> Result<Self, MonthParseError> {
        let captures = STORAGE_MONTH_PATTERN
            .captures(value)
            .ok_or_else(|| MonthParseError::InvalidFormat(value.to_string()))?;
        Self::from_parts(&captures[1], &captures[2], value)
    }

    fn from_parts(year: &str, month: &str, original: &str) -> Result<Self, MonthParseError> {
        // 正規表現で桁数は保証されているため、数値変換は失敗しない想定
        let year: i32 = year
            .parse()
            .map_err(|_| MonthParseError::InvalidFormat(original.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| MonthParseError::InvalidFormat(original.to_string()))?;

        Self::new(year, month).ok_or(MonthParseError::MonthOutOfRange(month))
    }

    /// 保存形式（YYYY-MM）の文字列に変換する
    ///
    /// 文字列の辞書順が時系列順と一致するため、SQL で直接比較できる。
    pub fn to_storage(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// API 形式（MM-YYYY）で表示する
impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:04}", self.month, self.year)
    }
}

impl FromStr for MonthKey {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_api(s)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse_api(&value).map_err(serde::de::Error::custom)
    }
}

/// 開始月から終了月までを1か月ずつ列挙するイテレータ（両端を含む）
#[derive(Debug, Clone)]
pub struct MonthRange {
    next: Option<MonthKey>,
    end: MonthKey,
}

impl MonthRange {
    /// 両端を含む月の範囲を作成する
    ///
    /// 終了月が開始月より前の場合は空の範囲になる。
    pub fn inclusive(start: MonthKey, end: MonthKey) -> Self {
        let next = if start <= end { Some(start) } else { None };
        Self { next, end }
    }

    pub fn start(&self) -> Option<MonthKey> {
        self.next
    }

    pub fn end(&self) -> MonthKey {
        self.end
    }

    fn remaining(&self) -> usize {
        match self.next {
            Some(current) => {
                let months = (self.end.year - current.year) as i64 * 12
                    + self.end.month as i64
                    - current.month as i64
                    + 1;
                months.max(0) as usize
            }
            None => 0,
        }
    }
}

impl Iterator for MonthRange {
    type Item = MonthKey;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        let following = current.succ();
        self.next = if following <= self.end {
            Some(following)
        } else {
            None
        };
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for MonthRange {}
