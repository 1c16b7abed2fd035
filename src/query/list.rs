//! 目錄列表與報價補充
//!
//! 第一階段取得目錄記錄：代碼型查詢且沒有游標時先精確查找，查無結果才退回分區列表。
//! 第二階段以有上限的並行度逐筆補上最新報價，結果保持輸入順序。

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{QueryError, QueryResult};
use super::SeriesStores;
use crate::config::types::QueryConfig;
use crate::domain_types::catalog::{AssetType, CatalogRecord};
use crate::domain_types::quote::QuoteFields;
use crate::domain_types::symbol::analyze;
use crate::monitor::QueryMetrics;
use crate::storage::cursor::Cursor;
use crate::storage::repository::{clamp_limit, CatalogRepository, PartitionPageRequest};

/// 計算漲跌所需的最新價格點數
pub const LATEST_POINTS: usize = 2;

/// 列表請求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub market: String,
    #[serde(default)]
    pub asset_type: Option<AssetType>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub cursor: Option<Cursor>,
}

/// 附帶報價的目錄記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedItem {
    #[serde(flatten)]
    pub record: CatalogRecord,
    #[serde(flatten)]
    pub quote: QuoteFields,
}

/// 列表結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResult {
    pub count: usize,
    pub items: Vec<ListedItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<Cursor>,
}

/// 目錄列表編排器
pub struct ListOrchestrator {
    catalog: Arc<dyn CatalogRepository>,
    series: SeriesStores,
    config: QueryConfig,
}

impl ListOrchestrator {
    pub fn new(catalog: Arc<dyn CatalogRepository>, series: SeriesStores, config: QueryConfig) -> Self {
        Self {
            catalog,
            series,
            config,
        }
    }

    /// 列出市場內的商品並補上最新報價
    pub async fn list(&self, request: ListRequest) -> QueryResult<ListResult> {
        let market = request.market.trim().to_uppercase();
        if market.is_empty() {
            return Err(QueryError::validation("market 為必填"));
        }
        if let Some(cursor) = &request.cursor {
            cursor.decode()?;
        }
        let limit = clamp_limit(request.limit.unwrap_or(self.config.list_default_limit));
        let query = request.q.as_deref().map(str::trim).filter(|q| !q.is_empty());

        let mut records = Vec::new();
        if let (Some(q), None) = (query, &request.cursor) {
            records = self.exact_candidates(q, limit).await;
            records.retain(|r| r.matches_scope(Some(&market), request.asset_type));
        }

        let mut next_cursor = None;
        if records.is_empty() {
            let page_request = PartitionPageRequest {
                market: market.clone(),
                status: None,
                asset_type: request.asset_type,
                query: query.map(str::to_string),
                cursor: request.cursor.clone(),
                limit,
            };
            match self.catalog.page_by_partition(page_request).await {
                Ok(page) => {
                    records = page.items;
                    next_cursor = page.cursor;
                }
                Err(e) => {
                    warn!("市場 {} 分區列表失敗: {}", market, e);
                    QueryMetrics::record_stage_failure("list.page");
                }
            }
            records.retain(|r| r.matches_scope(Some(&market), request.asset_type));
        }

        let items: Vec<ListedItem> = stream::iter(records)
            .map(|record| self.enrich(record))
            .buffered(self.config.fan_out.max(1))
            .collect()
            .await;

        debug!("市場 {} 列表: {} 筆，{}", market, items.len(), if next_cursor.is_some() { "有下一頁" } else { "無下一頁" });
        Ok(ListResult {
            count: items.len(),
            items,
            next_cursor,
        })
    }

    /// 逐一精確查找候選代碼，第一個有結果的候選勝出
    async fn exact_candidates(&self, query: &str, limit: usize) -> Vec<CatalogRecord> {
        let analysis = analyze(query);
        for candidate in &analysis.symbol_candidates {
            match self.catalog.get_by_symbol_exact(candidate, limit).await {
                Ok(records) if !records.is_empty() => return records,
                Ok(_) => {}
                Err(e) => {
                    warn!("列表精確查找 {} 失敗，略過: {}", candidate, e);
                    QueryMetrics::record_stage_failure("list.exact");
                }
            }
        }
        Vec::new()
    }

    async fn enrich(&self, record: CatalogRecord) -> ListedItem {
        let repository = self.series.for_asset_type(record.asset_type);
        let quote = match repository.latest_by_symbol(&record.symbol, LATEST_POINTS).await {
            Ok(points) => QuoteFields::from_latest(&points),
            Err(e) => {
                warn!("代碼 {} 報價補充失敗: {}", record.symbol, e);
                QueryMetrics::record_enrichment_failure();
                QuoteFields::empty()
            }
        };
        ListedItem { record, quote }
    }
}
