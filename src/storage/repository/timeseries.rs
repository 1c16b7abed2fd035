use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::timed_query;
use crate::config::types::SeriesTableConfig;
use crate::domain_types::timeseries::TimeseriesPoint;
use crate::storage::models::timeseries::{attr, merge_points, point_from_item, SortKeyLayout, SORT_KEY_LAYOUTS};
use crate::storage::store::{KeyValueStore, QueryInput, SortCondition, StoreError, TableSchema};
use crate::utils::time_utils::days_in_window;

/// 未指定筆數時，區間天數之外多取的筆數
const RANGE_LIMIT_SLACK: usize = 10;

/// 價格序列資料表定義
pub fn series_schema(config: &SeriesTableConfig) -> TableSchema {
    TableSchema::new(&config.table, attr::PK, Some(attr::SK)).with_index(
        &config.symbol_date_index,
        attr::SYMBOL,
        Some(attr::SK),
    )
}

/// 價格序列存取接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TimeseriesRepository: Send + Sync {
    /// 區間內的價格點，依日期遞增
    async fn range_by_symbol(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        limit: Option<usize>,
    ) -> Result<Vec<TimeseriesPoint>, StoreError>;

    /// 最近的價格點，依日期遞減
    async fn latest_by_symbol(&self, symbol: &str, limit: usize) -> Result<Vec<TimeseriesPoint>, StoreError>;
}

/// 建立在 [`KeyValueStore`] 之上的價格序列存取實現，每個序列表一個實例
pub struct StoreTimeseriesRepository {
    store: Arc<dyn KeyValueStore>,
    config: SeriesTableConfig,
    timeout: Duration,
}

impl StoreTimeseriesRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, config: SeriesTableConfig, timeout: Duration) -> Self {
        Self { store, config, timeout }
    }

    pub fn table(&self) -> &str {
        &self.config.table
    }

    fn symbol_query(&self, symbol: &str) -> QueryInput {
        QueryInput::new(&self.config.table, symbol.trim().to_uppercase())
            .on_index(&self.config.symbol_date_index)
    }

    /// 每種排序鍵編碼各查一次，取回的項目一併轉成價格點
    async fn query_layouts<F>(
        &self,
        operation: &'static str,
        symbol: &str,
        limit: usize,
        scan_forward: bool,
        condition: F,
    ) -> Result<Vec<TimeseriesPoint>, StoreError>
    where
        F: Fn(&SortKeyLayout) -> SortCondition,
    {
        let mut points = Vec::new();
        for layout in SORT_KEY_LAYOUTS {
            let mut input = self.symbol_query(symbol).with_sort(condition(layout)).with_limit(limit);
            if !scan_forward {
                input = input.descending();
            }
            let output = timed_query(self.store.as_ref(), operation, self.timeout, input).await?;
            points.extend(output.items.iter().map(point_from_item));
        }
        Ok(points)
    }
}

#[async_trait]
impl TimeseriesRepository for StoreTimeseriesRepository {
    async fn range_by_symbol(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
        limit: Option<usize>,
    ) -> Result<Vec<TimeseriesPoint>, StoreError> {
        let limit = limit
            .unwrap_or_else(|| days_in_window(from, to) + RANGE_LIMIT_SLACK)
            .max(1);
        let points = self
            .query_layouts("series.range", symbol, limit, true, |layout| layout.between(from, to))
            .await?;
        let points = merge_points(points, false, limit);
        debug!(
            "{} 區間查詢 {} {}..{}: {} 筆",
            self.config.table,
            symbol,
            from,
            to,
            points.len()
        );
        Ok(points)
    }

    async fn latest_by_symbol(&self, symbol: &str, limit: usize) -> Result<Vec<TimeseriesPoint>, StoreError> {
        let limit = limit.max(1);
        let points = self
            .query_layouts("series.latest", symbol, limit, false, |layout| layout.any_date())
            .await?;
        Ok(merge_points(points, true, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use crate::storage::store::{Item, MockKeyValueStore, QueryOutput};
    use serde_json::json;

    fn point(symbol: &str, date: &str, close: f64) -> Item {
        json!({
            "pk": symbol,
            "sk": format!("DATE#{date}"),
            "symbol": symbol,
            "close": close,
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn repository() -> StoreTimeseriesRepository {
        let config = SeriesTableConfig::named("equity-series");
        let store = MemoryStore::new(vec![series_schema(&config)]);
        for (day, close) in [("2024-01-02", 10.0), ("2024-01-03", 10.5), ("2024-01-04", 10.2), ("2024-01-05", 11.0)] {
            store.put_item("equity-series", point("SZ000001", day, close)).unwrap();
        }
        store.put_item("equity-series", point("SH600036", "2024-01-03", 35.0)).unwrap();
        StoreTimeseriesRepository::new(Arc::new(store), config, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_range_is_ascending_and_inclusive() {
        let repo = repository();
        let points = repo
            .range_by_symbol("sz000001", date("2024-01-03"), date("2024-01-05"), None)
            .await
            .unwrap();
        let dates: Vec<&str> = points.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-03", "2024-01-04", "2024-01-05"]);
    }

    #[tokio::test]
    async fn test_range_explicit_limit() {
        let repo = repository();
        let points = repo
            .range_by_symbol("SZ000001", date("2024-01-01"), date("2024-01-31"), Some(2))
            .await
            .unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, "2024-01-02");
    }

    #[tokio::test]
    async fn test_latest_is_descending() {
        let repo = repository();
        let points = repo.latest_by_symbol("SZ000001", 2).await.unwrap();
        assert_eq!(points[0].close, Some(11.0));
        assert_eq!(points[1].close, Some(10.2));

        assert!(repo.latest_by_symbol("SH999999", 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inferred_range_limit() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_query()
            .withf(|input| input.limit == Some(41) && input.scan_forward && input.sort.is_some())
            .times(SORT_KEY_LAYOUTS.len())
            .returning(|_| Ok(QueryOutput::default()));

        let repo = StoreTimeseriesRepository::new(
            Arc::new(store),
            SeriesTableConfig::named("index-series"),
            Duration::from_secs(1),
        );
        let points = repo
            .range_by_symbol("SH000300", date("2024-01-01"), date("2024-01-31"), None)
            .await
            .unwrap();
        assert!(points.is_empty());
    }

    fn mixed_repository() -> StoreTimeseriesRepository {
        let config = SeriesTableConfig::named("equity-series");
        let store = MemoryStore::new(vec![series_schema(&config)]);
        for (sk, close) in [
            ("DAY#20240101", 5.0),
            ("DATE#2024-05-31", 9.0),
            ("DAY#20240305", 6.0),
            ("20240306", 7.0),
            ("DATE#2024-03-07", 8.0),
        ] {
            let item = json!({ "pk": "SZ000002", "sk": sk, "symbol": "SZ000002", "close": close })
                .as_object()
                .cloned()
                .unwrap();
            store.put_item("equity-series", item).unwrap();
        }
        StoreTimeseriesRepository::new(Arc::new(store), config, Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_latest_orders_mixed_key_encodings_by_date() {
        let repo = mixed_repository();
        let points = repo.latest_by_symbol("SZ000002", 2).await.unwrap();
        let closes: Vec<Option<f64>> = points.iter().map(|p| p.close).collect();
        assert_eq!(closes, vec![Some(9.0), Some(8.0)]);
    }

    #[tokio::test]
    async fn test_range_includes_legacy_key_encodings() {
        let repo = mixed_repository();
        let points = repo
            .range_by_symbol("SZ000002", date("2024-03-01"), date("2024-03-31"), None)
            .await
            .unwrap();
        let dates: Vec<&str> = points.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-05", "2024-03-06", "2024-03-07"]);

        let points = repo
            .range_by_symbol("SZ000002", date("2024-01-01"), date("2024-12-31"), Some(2))
            .await
            .unwrap();
        let dates: Vec<&str> = points.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-03-05"]);
    }
}
