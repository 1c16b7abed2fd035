use std::sync::Arc;
use tracing::info;

use super::company::CompanyLookup;
use super::error::QueryResult;
use super::list::{ListOrchestrator, ListRequest, ListResult};
use super::range::{RangeOrchestrator, RangeResult, TimeseriesRequest};
use super::search::{SearchOrchestrator, SearchResult};
use super::snapshot::{SnapshotOrchestrator, SnapshotResult};
use super::SeriesStores;
use crate::config::types::{QueryConfig, StoreConfig};
use crate::domain_types::catalog::CatalogRecord;
use crate::storage::repository::{
    catalog_schema, series_schema, CatalogRepository, StoreCatalogRepository, StoreTimeseriesRepository,
};
use crate::storage::store::{KeyValueStore, TableSchema};

/// 引擎使用的三張資料表定義
pub fn table_schemas(config: &StoreConfig) -> Vec<TableSchema> {
    vec![
        catalog_schema(&config.catalog),
        series_schema(&config.index_series),
        series_schema(&config.equity_series),
    ]
}

/// 目錄與價格序列查詢引擎
///
/// 由配置與注入的儲存建立所有存取層與編排器。
pub struct CatalogQueryEngine {
    search: SearchOrchestrator,
    list: ListOrchestrator,
    snapshot: SnapshotOrchestrator,
    range: RangeOrchestrator,
    company: CompanyLookup,
}

impl CatalogQueryEngine {
    pub fn new(store: Arc<dyn KeyValueStore>, store_config: &StoreConfig, query_config: &QueryConfig) -> Self {
        let timeout = store_config.call_timeout();
        let catalog: Arc<dyn CatalogRepository> = Arc::new(StoreCatalogRepository::new(
            store.clone(),
            store_config.catalog.clone(),
            timeout,
        ));
        let series = SeriesStores::new(
            Arc::new(StoreTimeseriesRepository::new(
                store.clone(),
                store_config.index_series.clone(),
                timeout,
            )),
            Arc::new(StoreTimeseriesRepository::new(
                store,
                store_config.equity_series.clone(),
                timeout,
            )),
        );

        info!(
            "查詢引擎初始化完成，目錄表: {}，序列表: {} / {}",
            store_config.catalog.table, store_config.index_series.table, store_config.equity_series.table
        );

        Self {
            search: SearchOrchestrator::new(catalog.clone(), query_config.clone()),
            list: ListOrchestrator::new(catalog.clone(), series.clone(), query_config.clone()),
            snapshot: SnapshotOrchestrator::new(series.clone(), query_config.fan_out),
            range: RangeOrchestrator::new(series, query_config.default_days),
            company: CompanyLookup::new(catalog),
        }
    }

    /// 目錄搜尋
    pub async fn search(&self, query: &str, market: Option<&str>) -> QueryResult<SearchResult> {
        self.search.search(query, market).await
    }

    /// 市場列表與報價
    pub async fn list(&self, request: ListRequest) -> QueryResult<ListResult> {
        self.list.list(request).await
    }

    /// 多代碼報價快照
    pub async fn snapshot<S: AsRef<str>>(&self, symbols: &[S]) -> QueryResult<SnapshotResult> {
        self.snapshot.snapshot(symbols).await
    }

    /// 價格序列區間
    pub async fn timeseries(&self, request: TimeseriesRequest) -> QueryResult<RangeResult> {
        self.range.range(request).await
    }

    /// 價格序列區間，指定「今天」
    pub async fn timeseries_at(&self, request: TimeseriesRequest, today: chrono::NaiveDate) -> QueryResult<RangeResult> {
        self.range.range_at(request, today).await
    }

    /// 單一代碼查找
    pub async fn company(&self, code: &str) -> Option<CatalogRecord> {
        self.company.lookup(code).await
    }
}
