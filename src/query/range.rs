//! 價格序列區間查詢
//!
//! 未指定資產類別時先查指數序列表，沒有資料再查股票序列表，結果中回報實際使用的類別與區間。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{QueryError, QueryResult};
use super::SeriesStores;
use crate::domain_types::timeseries::{AssetClass, TimeseriesPoint};
use crate::monitor::QueryMetrics;
use crate::utils::time_utils::{format_date, parse_date, resolve_window, today_utc, MAX_WINDOW_DAYS};

/// 區間查詢請求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesRequest {
    pub code: String,
    #[serde(default)]
    pub asset: Option<AssetClass>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub days: Option<u32>,
}

/// 區間查詢結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeResult {
    pub asset: AssetClass,
    pub code: String,
    pub from: String,
    pub to: String,
    pub count: usize,
    pub points: Vec<TimeseriesPoint>,
}

fn parse_bound(raw: Option<&str>, field: &str) -> QueryResult<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(value) => parse_date(value)
            .map(Some)
            .ok_or_else(|| QueryError::validation(format!("{field} 不是合法的日期 (YYYY-MM-DD): {value}"))),
    }
}

/// 價格序列區間編排器
pub struct RangeOrchestrator {
    series: SeriesStores,
    default_days: u32,
}

impl RangeOrchestrator {
    pub fn new(series: SeriesStores, default_days: u32) -> Self {
        Self { series, default_days }
    }

    /// 以今天（UTC）為預設結束日查詢
    pub async fn range(&self, request: TimeseriesRequest) -> QueryResult<RangeResult> {
        self.range_at(request, today_utc()).await
    }

    /// 以指定的「今天」查詢
    pub async fn range_at(&self, request: TimeseriesRequest, today: NaiveDate) -> QueryResult<RangeResult> {
        let code = request.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(QueryError::validation("code 為必填"));
        }
        let from = parse_bound(request.from.as_deref(), "from")?;
        let to = parse_bound(request.to.as_deref(), "to")?;
        let days = request.days.unwrap_or(self.default_days);
        if days > MAX_WINDOW_DAYS {
            return Err(QueryError::validation(format!(
                "days 不可超過 {MAX_WINDOW_DAYS}: {days}"
            )));
        }
        let (from, to) = resolve_window(from, to, days, today)
            .ok_or_else(|| QueryError::validation(format!("days {days} 超出可查詢的日期範圍")))?;
        if from > to {
            return Err(QueryError::validation(format!(
                "from ({}) 晚於 to ({})",
                format_date(from),
                format_date(to)
            )));
        }

        let order: &[AssetClass] = match request.asset {
            Some(AssetClass::Index) => &[AssetClass::Index],
            Some(AssetClass::Stock) => &[AssetClass::Stock],
            None => &[AssetClass::Index, AssetClass::Stock],
        };

        // 全部為空時回報最後嘗試的類別
        let mut asset = order[order.len() - 1];
        let mut points = Vec::new();
        for &candidate in order {
            match self.series.for_class(candidate).range_by_symbol(&code, from, to, None).await {
                Ok(found) if !found.is_empty() => {
                    asset = candidate;
                    points = found;
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("代碼 {} 的 {} 區間查詢失敗，視為無資料: {}", code, candidate, e);
                    QueryMetrics::record_stage_failure("range");
                }
            }
        }

        debug!("代碼 {} {}..{} 使用 {} 序列: {} 筆", code, from, to, asset, points.len());
        Ok(RangeResult {
            asset,
            code,
            from: format_date(from),
            to: format_date(to),
            count: points.len(),
            points,
        })
    }
}
