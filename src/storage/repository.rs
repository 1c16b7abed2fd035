//! 儲存轉接層
//!
//! 把領域查詢轉為 [`KeyValueStore`] 的範圍查詢。每次儲存呼叫都套用超時並記錄延遲。

use std::time::{Duration, Instant};
use tracing::warn;

use crate::monitor::QueryMetrics;
use crate::storage::store::{KeyValueStore, QueryInput, QueryOutput, StoreError};

pub mod catalog;
pub mod timeseries;

pub use catalog::{
    catalog_schema, CatalogPage, CatalogRepository, PartitionPageRequest, StoreCatalogRepository,
};
pub use timeseries::{series_schema, StoreTimeseriesRepository, TimeseriesRepository};

/// 單頁筆數上限
pub const MAX_LIMIT: usize = 50;
/// 內部翻頁次數上限
pub const MAX_PAGES: usize = 20;

/// 筆數限制夾到 `[1, 50]`
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_LIMIT)
}

/// 翻頁次數夾到 `[1, 20]`
pub fn clamp_pages(pages: usize) -> usize {
    pages.clamp(1, MAX_PAGES)
}

/// 帶超時的一次儲存查詢
pub(crate) async fn timed_query(
    store: &dyn KeyValueStore,
    operation: &'static str,
    timeout: Duration,
    input: QueryInput,
) -> Result<QueryOutput, StoreError> {
    let started = Instant::now();
    let result = match tokio::time::timeout(timeout, store.query(input)).await {
        Ok(result) => result,
        Err(_) => {
            let timeout_ms = timeout.as_millis() as u64;
            warn!("儲存呼叫 {} 超時 ({}ms)", operation, timeout_ms);
            QueryMetrics::record_store_timeout(operation);
            Err(StoreError::Timeout {
                operation: operation.to_string(),
                timeout_ms,
            })
        }
    };
    QueryMetrics::record_store_call(operation, result.is_ok(), started.elapsed());
    result
}
