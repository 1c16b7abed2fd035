//! 最新報價與漲跌計算

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain_types::timeseries::TimeseriesPoint;

/// 漲跌值保留的小數位數
pub const CHANGE_DECIMALS: u32 = 6;

/// 由最新兩個價格點推導出的報價欄位
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteFields {
    pub last: Option<f64>,
    pub previous_close: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
}

impl QuoteFields {
    /// 全部為空的報價，用於取數失敗或查無資料
    pub fn empty() -> Self {
        Self::default()
    }

    /// 從最近的價格點計算報價
    ///
    /// 先依交易日降冪排序，日期最新的一筆為最新價；前收盤優先使用最新點上的明確欄位，
    /// 否則取次新一筆的價格。
    pub fn from_latest(points: &[TimeseriesPoint]) -> Self {
        let mut ordered: Vec<&TimeseriesPoint> = points.iter().collect();
        ordered.sort_by(|a, b| b.date.cmp(&a.date));
        let Some(latest) = ordered.first() else {
            return Self::empty();
        };

        let last = latest.price();
        let previous_close = latest
            .previous_close
            .or_else(|| ordered.get(1).and_then(|p| p.price()));

        let change = match (last, previous_close) {
            (Some(last), Some(prev)) => subtract(last, prev),
            _ => None,
        };
        let change_percent = match (change, previous_close) {
            (Some(change), Some(prev)) => percent(change, prev),
            _ => None,
        };

        Self {
            last,
            previous_close,
            change,
            change_percent,
        }
    }
}

fn subtract(last: f64, prev: f64) -> Option<f64> {
    let diff = Decimal::from_f64(last)? - Decimal::from_f64(prev)?;
    diff.round_dp(CHANGE_DECIMALS).to_f64()
}

fn percent(change: f64, prev: f64) -> Option<f64> {
    let prev = Decimal::from_f64(prev)?;
    if prev.is_zero() {
        return None;
    }
    let ratio = Decimal::from_f64(change)?.checked_div(prev)? * Decimal::ONE_HUNDRED;
    ratio.round_dp(CHANGE_DECIMALS).to_f64()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str, close: Option<f64>) -> TimeseriesPoint {
        TimeseriesPoint {
            date: date.to_string(),
            close,
            ..Default::default()
        }
    }

    #[test]
    fn test_change_from_previous_point() {
        let points = vec![point("2024-03-02", Some(555.12)), point("2024-03-01", Some(550.00))];
        let quote = QuoteFields::from_latest(&points);

        assert_eq!(quote.last, Some(555.12));
        assert_eq!(quote.previous_close, Some(550.0));
        assert!((quote.change.unwrap() - 5.12).abs() < 1e-9);
        assert!((quote.change_percent.unwrap() - 0.930909).abs() < 1e-6);
    }

    #[test]
    fn test_explicit_previous_close_wins() {
        let mut latest = point("2024-03-02", Some(555.12));
        latest.previous_close = Some(540.0);
        let points = vec![latest, point("2024-03-01", Some(550.00))];

        let quote = QuoteFields::from_latest(&points);
        assert_eq!(quote.previous_close, Some(540.0));
        assert!((quote.change.unwrap() - 15.12).abs() < 1e-9);
    }

    #[test]
    fn test_points_out_of_order_use_newest_date() {
        let points = vec![point("2024-01-01", Some(5.0)), point("2024-05-31", Some(9.0))];
        let quote = QuoteFields::from_latest(&points);
        assert_eq!(quote.last, Some(9.0));
        assert_eq!(quote.previous_close, Some(5.0));
        assert_eq!(quote.change, Some(4.0));
    }

    #[test]
    fn test_single_point_has_no_change() {
        let quote = QuoteFields::from_latest(&[point("2024-03-02", Some(10.0))]);
        assert_eq!(quote.last, Some(10.0));
        assert_eq!(quote.change, None);
        assert_eq!(quote.change_percent, None);
    }

    #[test]
    fn test_zero_previous_close_has_no_percent() {
        let points = vec![point("2024-03-02", Some(1.0)), point("2024-03-01", Some(0.0))];
        let quote = QuoteFields::from_latest(&points);
        assert_eq!(quote.change, Some(1.0));
        assert_eq!(quote.change_percent, None);
    }

    #[test]
    fn test_previous_point_falls_back_to_adjusted_close() {
        let mut prev = point("2024-03-01", None);
        prev.adjusted_close = Some(8.0);
        let points = vec![point("2024-03-02", Some(10.0)), prev];

        let quote = QuoteFields::from_latest(&points);
        assert_eq!(quote.previous_close, Some(8.0));
        assert_eq!(quote.change_percent, Some(25.0));
    }

    #[test]
    fn test_empty_points() {
        assert_eq!(QuoteFields::from_latest(&[]), QuoteFields::empty());
    }
}
