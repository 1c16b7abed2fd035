//! 多代碼報價快照
//!
//! 每個代碼先查指數序列表，再查股票序列表，都沒有資料時標記為 `unknown`。

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{QueryError, QueryResult};
use super::list::LATEST_POINTS;
use super::SeriesStores;
use crate::domain_types::quote::QuoteFields;
use crate::domain_types::symbol::normalize;
use crate::domain_types::timeseries::AssetClass;
use crate::monitor::QueryMetrics;

/// 查詢介面上多個代碼的分隔字元
pub const SYMBOL_DELIMITER: char = '|';

/// 快照中的商品分類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Index,
    Stock,
    Unknown,
}

impl From<AssetClass> for SnapshotKind {
    fn from(asset: AssetClass) -> Self {
        match asset {
            AssetClass::Index => SnapshotKind::Index,
            AssetClass::Stock => SnapshotKind::Stock,
        }
    }
}

/// 單一代碼的快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotItem {
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: SnapshotKind,
    pub last: Option<f64>,
    pub chg: Option<f64>,
    pub chg_percent: Option<f64>,
}

impl SnapshotItem {
    fn unknown(symbol: String) -> Self {
        Self {
            symbol,
            kind: SnapshotKind::Unknown,
            last: None,
            chg: None,
            chg_percent: None,
        }
    }

    fn priced(symbol: String, kind: SnapshotKind, quote: QuoteFields) -> Self {
        Self {
            symbol,
            kind,
            last: quote.last,
            chg: quote.change,
            chg_percent: quote.change_percent,
        }
    }
}

/// 快照結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotResult {
    pub count: usize,
    pub items: Vec<SnapshotItem>,
}

/// 解析以 `|` 分隔的代碼清單
pub fn parse_symbols(raw: &str) -> Vec<String> {
    dedupe(raw.split(SYMBOL_DELIMITER))
}

/// 正規化、去除空值並依首次出現順序去重
fn dedupe<'a>(symbols: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for symbol in symbols.into_iter().map(normalize) {
        if !symbol.is_empty() && !out.contains(&symbol) {
            out.push(symbol);
        }
    }
    out
}

/// 報價快照編排器
pub struct SnapshotOrchestrator {
    series: SeriesStores,
    fan_out: usize,
}

impl SnapshotOrchestrator {
    pub fn new(series: SeriesStores, fan_out: usize) -> Self {
        Self {
            series,
            fan_out: fan_out.max(1),
        }
    }

    /// 取得多個代碼的最新報價
    pub async fn snapshot<S: AsRef<str>>(&self, symbols: &[S]) -> QueryResult<SnapshotResult> {
        let symbols = dedupe(symbols.iter().map(|s| s.as_ref()));
        if symbols.is_empty() {
            return Err(QueryError::validation("至少需要一個代碼"));
        }

        let items: Vec<SnapshotItem> = stream::iter(symbols)
            .map(|symbol| self.snapshot_one(symbol))
            .buffered(self.fan_out)
            .collect()
            .await;

        Ok(SnapshotResult {
            count: items.len(),
            items,
        })
    }

    async fn snapshot_one(&self, symbol: String) -> SnapshotItem {
        for asset in [AssetClass::Index, AssetClass::Stock] {
            match self.series.for_class(asset).latest_by_symbol(&symbol, LATEST_POINTS).await {
                Ok(points) if !points.is_empty() => {
                    return SnapshotItem::priced(symbol, asset.into(), QuoteFields::from_latest(&points));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("代碼 {} 的 {} 序列查詢失敗，視為無資料: {}", symbol, asset, e);
                    QueryMetrics::record_stage_failure("snapshot.latest");
                }
            }
        }
        debug!("代碼 {} 查無價格資料", symbol);
        SnapshotItem::unknown(symbol)
    }
}
