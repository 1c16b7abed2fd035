//! 價格序列資料表的項目結構與容錯解析
//!
//! 序列表經歷過數次欄位調整：日期可能在 `date`、`asOfDate` 或排序鍵後綴中，
//! 排序鍵後綴也有 `YYYY-MM-DD` 與舊版 `YYYYMMDD` 兩種編碼；數值可能是數字或字串。
//! 解析一律不失敗，無法辨識的值以空值表示。

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::domain_types::timeseries::TimeseriesPoint;
use crate::storage::store::{attribute_text, Item, SortCondition};

/// 序列資料表屬性名稱
pub mod attr {
    pub const PK: &str = "pk";
    pub const SK: &str = "sk";
    pub const SYMBOL: &str = "symbol";
    pub const DATE: &str = "date";
    pub const AS_OF_DATE: &[&str] = &["asOfDate", "as_of_date"];
    pub const OPEN: &[&str] = &["open"];
    pub const HIGH: &[&str] = &["high"];
    pub const LOW: &[&str] = &["low"];
    pub const CLOSE: &[&str] = &["close"];
    pub const ADJUSTED_CLOSE: &[&str] = &["adjustedClose", "adjClose", "adj_close"];
    pub const VOLUME: &[&str] = &["volume", "vol"];
    pub const PREVIOUS_CLOSE: &[&str] = &["previousClose", "prevClose", "preClose", "pre_close"];
    pub const LAST: &[&str] = &["last", "price"];
}

/// 目前寫入格式的排序鍵前綴
pub const DATE_KEY_PREFIX: &str = "DATE#";

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("合法的正則表達式"));
static COMPACT_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}$").expect("合法的正則表達式"));

type DateExtractor = fn(&Item) -> Option<String>;

/// 日期來源，依優先順序嘗試；新的編碼只需在此加一行
const DATE_EXTRACTORS: &[DateExtractor] = &[
    explicit_date,
    as_of_date,
    sort_key_iso,
    sort_key_compact,
];

fn explicit_date(item: &Item) -> Option<String> {
    iso_date(attribute_text(item.get(attr::DATE))?.trim())
}

fn as_of_date(item: &Item) -> Option<String> {
    attr::AS_OF_DATE
        .iter()
        .find_map(|name| iso_date(attribute_text(item.get(*name))?.trim()))
}

fn sort_key_iso(item: &Item) -> Option<String> {
    iso_date(&sort_key_suffix(item)?)
}

fn sort_key_compact(item: &Item) -> Option<String> {
    compact_date(&sort_key_suffix(item)?)
}

fn iso_date(raw: &str) -> Option<String> {
    if !ISO_DATE.is_match(raw) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn compact_date(raw: &str) -> Option<String> {
    if !COMPACT_DATE.is_match(raw) {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y%m%d")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

fn sort_key_suffix(item: &Item) -> Option<String> {
    let sk = attribute_text(item.get(attr::SK))?;
    let suffix = sk.rsplit('#').next().unwrap_or(&sk);
    Some(suffix.trim().to_string())
}

/// 解析交易日；無法解析時回傳空字串
pub fn extract_date(item: &Item) -> String {
    DATE_EXTRACTORS
        .iter()
        .find_map(|extract| extract(item))
        .unwrap_or_default()
}

/// 數字或數字字串轉為有限浮點數
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    number.is_finite().then_some(number)
}

fn first_number(item: &Item, names: &[&str]) -> Option<f64> {
    names
        .iter()
        .find_map(|name| item.get(*name).and_then(coerce_number))
}

/// 將儲存項目轉為價格點
pub fn point_from_item(item: &Item) -> TimeseriesPoint {
    TimeseriesPoint {
        date: extract_date(item),
        open: first_number(item, attr::OPEN),
        high: first_number(item, attr::HIGH),
        low: first_number(item, attr::LOW),
        close: first_number(item, attr::CLOSE),
        adjusted_close: first_number(item, attr::ADJUSTED_CLOSE),
        volume: first_number(item, attr::VOLUME),
        previous_close: first_number(item, attr::PREVIOUS_CLOSE),
        last: first_number(item, attr::LAST),
    }
}

/// 排序鍵中的一種日期編碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKeyLayout {
    pub prefix: &'static str,
    format: &'static str,
    lowest: &'static str,
    highest: &'static str,
}

/// 序列表中出現過的排序鍵編碼，目前格式在前；讀取時逐一查詢再依交易日合併
pub const SORT_KEY_LAYOUTS: &[SortKeyLayout] = &[
    SortKeyLayout {
        prefix: DATE_KEY_PREFIX,
        format: "%Y-%m-%d",
        lowest: "0000-00-00",
        highest: "9999-99-99",
    },
    SortKeyLayout {
        prefix: "DAY#",
        format: "%Y%m%d",
        lowest: "00000000",
        highest: "99999999",
    },
    SortKeyLayout {
        prefix: "",
        format: "%Y%m%d",
        lowest: "00000000",
        highest: "99999999",
    },
];

impl SortKeyLayout {
    /// 交易日在此編碼下的排序鍵
    pub fn key(&self, date: NaiveDate) -> String {
        format!("{}{}", self.prefix, date.format(self.format))
    }

    /// `[from, to]` 區間的排序鍵條件
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> SortCondition {
        SortCondition::Between {
            low: self.key(from),
            high: self.key(to),
        }
    }

    /// 此編碼下所有排序鍵的條件
    pub fn any_date(&self) -> SortCondition {
        SortCondition::Between {
            low: format!("{}{}", self.prefix, self.lowest),
            high: format!("{}{}", self.prefix, self.highest),
        }
    }
}

/// 交易日對應的排序鍵（目前格式）
pub fn date_sort_key(date: NaiveDate) -> String {
    SORT_KEY_LAYOUTS[0].key(date)
}

/// 合併各編碼查得的價格點：依交易日排序，同日只保留最先出現的一筆，最後截到 `limit` 筆
pub fn merge_points(mut points: Vec<TimeseriesPoint>, descending: bool, limit: usize) -> Vec<TimeseriesPoint> {
    points.retain(|p| !p.date.is_empty());
    if descending {
        points.sort_by(|a, b| b.date.cmp(&a.date));
    } else {
        points.sort_by(|a, b| a.date.cmp(&b.date));
    }
    points.dedup_by(|later, earlier| later.date == earlier.date);
    points.truncate(limit);
    points
}
