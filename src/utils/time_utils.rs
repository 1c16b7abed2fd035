// time_utils.rs
//
// 交易日區間相關的工具函數：日期解析、區間天數與預設區間推導。

use chrono::{Days, NaiveDate, Utc};

/// 查詢參數使用的日期格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 以天數推導區間時允許的最大天數
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// 今天（UTC）
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

/// 解析 `YYYY-MM-DD`
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// 格式化為 `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 閉區間內的天數；`to` 早於 `from` 時為 0
pub fn days_in_window(from: NaiveDate, to: NaiveDate) -> usize {
    let days = (to - from).num_days() + 1;
    usize::try_from(days).unwrap_or(0)
}

/// 推導查詢區間
///
/// 兩端都有時原樣使用；否則以 `to`（預設今天）往前推 `days - 1` 天，`days` 至少為 1。
/// 往前推超出日期可表示範圍時回傳 `None`。
pub fn resolve_window(
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
    days: u32,
    today: NaiveDate,
) -> Option<(NaiveDate, NaiveDate)> {
    if let (Some(from), Some(to)) = (from, to) {
        return Some((from, to));
    }
    let to = to.unwrap_or(today);
    let span = u64::from(days.max(1)) - 1;
    let from = to.checked_sub_days(Days::new(span))?;
    Some((from, to))
}
