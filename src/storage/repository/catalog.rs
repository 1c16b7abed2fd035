use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use super::{clamp_limit, clamp_pages, timed_query};
use crate::config::types::CatalogTableConfig;
use crate::domain_types::catalog::{AssetType, CatalogRecord, Status};
use crate::storage::cursor::Cursor;
use crate::storage::models::catalog::{attr, partition_key, record_from_item, CATALOG_SCOPE_PREFIX};
use crate::storage::store::{
    Filter, Item, KeyValueStore, QueryInput, SortCondition, StoreError, TableSchema,
};

/// 目錄資料表定義
pub fn catalog_schema(config: &CatalogTableConfig) -> TableSchema {
    TableSchema::new(&config.table, attr::PK, Some(attr::SK))
        .with_index(&config.symbol_index, attr::SYMBOL, None)
        .with_index(&config.partition_index, attr::MARKET_STATUS, Some(attr::ENTITY_SCOPE))
}

/// 分區列表的一頁
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogPage {
    pub items: Vec<CatalogRecord>,
    /// 分區還有後續資料時的續查游標
    pub cursor: Option<Cursor>,
}

/// 分區列表請求
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionPageRequest {
    pub market: String,
    pub status: Option<Status>,
    pub asset_type: Option<AssetType>,
    pub query: Option<String>,
    pub cursor: Option<Cursor>,
    pub limit: usize,
}

/// 目錄存取接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// 以代碼索引精確查找
    async fn get_by_symbol_exact(&self, symbol: &str, limit: usize) -> Result<Vec<CatalogRecord>, StoreError>;

    /// 在單一 (market, status) 分區內做子字串比對，內部翻頁直到湊滿、分區讀完或達翻頁上限
    async fn fuzzy_within_partition(
        &self,
        market: &str,
        status: Option<Status>,
        query: &str,
        limit: usize,
        max_pages: usize,
    ) -> Result<Vec<CatalogRecord>, StoreError>;

    /// 分區內的一頁列表
    async fn page_by_partition(&self, request: PartitionPageRequest) -> Result<CatalogPage, StoreError>;
}

/// 比對用的子字串：原樣、大寫、小寫，去重並略過空白
fn needles(query: &str) -> Vec<String> {
    let query = query.trim();
    let mut out: Vec<String> = Vec::with_capacity(3);
    for needle in [query.to_string(), query.to_uppercase(), query.to_lowercase()] {
        if !needle.is_empty() && !out.contains(&needle) {
            out.push(needle);
        }
    }
    out
}

fn text_filter(query: &str) -> Option<Filter> {
    let needles = needles(query);
    (!needles.is_empty()).then(|| Filter::Contains {
        attributes: vec![attr::NAME.to_string(), attr::SYMBOL.to_string(), attr::PK.to_string()],
        needles,
    })
}

fn asset_type_filter(asset_type: AssetType) -> Filter {
    Filter::In {
        attribute: attr::ASSET_TYPE.to_string(),
        values: asset_type.stored_values().iter().map(|v| v.to_string()).collect(),
    }
}

fn records(items: &[Item]) -> Vec<CatalogRecord> {
    items.iter().filter_map(record_from_item).collect()
}

/// 建立在 [`KeyValueStore`] 之上的目錄存取實現
pub struct StoreCatalogRepository {
    store: Arc<dyn KeyValueStore>,
    config: CatalogTableConfig,
    timeout: Duration,
}

impl StoreCatalogRepository {
    pub fn new(store: Arc<dyn KeyValueStore>, config: CatalogTableConfig, timeout: Duration) -> Self {
        Self { store, config, timeout }
    }

    fn partition_query(&self, market: &str, status: Option<Status>) -> QueryInput {
        QueryInput::new(&self.config.table, partition_key(market, status.unwrap_or_default()))
            .on_index(&self.config.partition_index)
            .with_sort(SortCondition::BeginsWith(CATALOG_SCOPE_PREFIX.to_string()))
    }
}

#[async_trait]
impl CatalogRepository for StoreCatalogRepository {
    async fn get_by_symbol_exact(&self, symbol: &str, limit: usize) -> Result<Vec<CatalogRecord>, StoreError> {
        let symbol = symbol.trim().to_uppercase();
        let input = QueryInput::new(&self.config.table, symbol.as_str())
            .on_index(&self.config.symbol_index)
            .with_limit(clamp_limit(limit));

        let output = timed_query(self.store.as_ref(), "catalog.exact", self.timeout, input).await?;
        let mut found = records(&output.items);
        // 同一代碼有上市中的記錄時只回傳上市中的；全數下市時照常回傳
        if found.iter().any(|r| r.status == Status::Active) {
            found.retain(|r| r.status == Status::Active);
        }
        debug!("精確查找代碼 {}: {} 筆", symbol, found.len());
        Ok(found)
    }

    async fn fuzzy_within_partition(
        &self,
        market: &str,
        status: Option<Status>,
        query: &str,
        limit: usize,
        max_pages: usize,
    ) -> Result<Vec<CatalogRecord>, StoreError> {
        let limit = clamp_limit(limit);
        let max_pages = clamp_pages(max_pages);
        let filter = text_filter(query);

        let mut collected: Vec<CatalogRecord> = Vec::new();
        let mut seen = HashSet::new();
        let mut start_key: Option<Item> = None;
        let mut pages = 0;

        while pages < max_pages {
            pages += 1;
            let input = self
                .partition_query(market, status)
                .with_filter(filter.clone())
                .with_limit(limit)
                .starting_after(start_key.take());
            let output = timed_query(self.store.as_ref(), "catalog.fuzzy", self.timeout, input).await?;

            // 零筆符合的頁面不代表分區已讀完
            for record in records(&output.items) {
                if seen.insert(record.symbol.clone()) {
                    collected.push(record);
                }
            }
            if collected.len() >= limit {
                break;
            }
            match output.last_evaluated_key {
                Some(key) => start_key = Some(key),
                None => break,
            }
        }

        collected.truncate(limit);
        debug!(
            "分區 {} 模糊比對 {:?}: 翻頁 {} 次，取得 {} 筆",
            market,
            query,
            pages,
            collected.len()
        );
        Ok(collected)
    }

    async fn page_by_partition(&self, request: PartitionPageRequest) -> Result<CatalogPage, StoreError> {
        let start_key = match &request.cursor {
            Some(cursor) => Some(
                cursor
                    .decode()
                    .map_err(|e| StoreError::InvalidKey(e.to_string()))?,
            ),
            None => None,
        };

        let filters: Vec<Filter> = [
            request.asset_type.map(asset_type_filter),
            request.query.as_deref().and_then(text_filter),
        ]
        .into_iter()
        .flatten()
        .collect();

        let input = self
            .partition_query(&request.market, request.status)
            .with_filter(Filter::all(filters))
            .with_limit(clamp_limit(request.limit))
            .starting_after(start_key);

        let output = timed_query(self.store.as_ref(), "catalog.page", self.timeout, input).await?;
        let page = CatalogPage {
            items: records(&output.items),
            cursor: output.last_evaluated_key.as_ref().map(Cursor::encode),
        };
        debug!(
            "分區 {} 列表: 評估 {} 筆，回傳 {} 筆，{}",
            request.market,
            output.scanned_count,
            page.items.len(),
            if page.cursor.is_some() { "尚有後續" } else { "已到結尾" }
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;
    use crate::storage::store::{MockKeyValueStore, QueryOutput};
    use serde_json::json;

    fn catalog_item(symbol: &str, name: &str, market: &str, asset_type: &str) -> Item {
        json!({
            "pk": format!("INSTRUMENT#{symbol}"),
            "sk": "PROFILE",
            "symbol": symbol,
            "name": name,
            "exchange": if symbol.starts_with("SH") { "SSE" } else { "SZSE" },
            "assetType": asset_type,
            "market": market,
            "status": "active",
            "marketStatus": format!("{market}#ACTIVE"),
            "entityScope": format!("CATALOG#{symbol}"),
        })
        .as_object()
        .cloned()
        .unwrap()
    }

    fn repository(store: Arc<dyn KeyValueStore>) -> StoreCatalogRepository {
        StoreCatalogRepository::new(store, CatalogTableConfig::default(), Duration::from_secs(1))
    }

    fn seeded() -> Arc<MemoryStore> {
        let store = MemoryStore::new(vec![catalog_schema(&CatalogTableConfig::default())]);
        for (symbol, name, market, asset_type) in [
            ("SH600000", "浦发银行", "CN", "stock"),
            ("SH600036", "招商银行", "CN", "stock"),
            ("SH601318", "中国平安", "CN", "stock"),
            ("SZ000001", "平安银行", "CN", "stock"),
            ("SH510300", "沪深300ETF", "CN", "etf"),
            ("SH000300", "沪深300", "INDEX", "index"),
        ] {
            store.put_item("catalog", catalog_item(symbol, name, market, asset_type)).unwrap();
        }
        // 同分區的報價列不屬於目錄
        store
            .put_item(
                "catalog",
                json!({
                    "pk": "QUOTE#SH600036",
                    "sk": "LATEST",
                    "marketStatus": "CN#ACTIVE",
                    "entityScope": "QUOTE#SH600036",
                    "name": "招商银行报价"
                })
                .as_object()
                .cloned()
                .unwrap(),
            )
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_exact_lookup_normalizes_symbol() {
        let repo = repository(seeded());
        let found = repo.get_by_symbol_exact(" sh600036 ", 5).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "招商银行");
        assert!(repo.get_by_symbol_exact("SH999999", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exact_lookup_prefers_active_records() {
        let store = seeded();
        let mut delisted = catalog_item("SH600036", "招商银行(旧)", "CN", "stock");
        delisted.insert("pk".into(), json!("INSTRUMENT#SH600036#1999"));
        delisted.insert("status".into(), json!("inactive"));
        delisted.insert("marketStatus".into(), json!("CN#INACTIVE"));
        store.put_item("catalog", delisted).unwrap();

        let mut retired = catalog_item("SH600999", "已下市", "CN", "stock");
        retired.insert("status".into(), json!("inactive"));
        retired.insert("marketStatus".into(), json!("CN#INACTIVE"));
        store.put_item("catalog", retired).unwrap();

        let repo = repository(store);
        let found = repo.get_by_symbol_exact("SH600036", 5).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "招商银行");
        assert_eq!(found[0].status, Status::Active);

        let found = repo.get_by_symbol_exact("SH600999", 5).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].status, Status::Inactive);
    }

    #[tokio::test]
    async fn test_fuzzy_skips_quote_rows_and_pages_through() {
        let repo = repository(seeded());
        // 每頁評估 2 筆，首頁只有 1 筆符合，必須繼續翻頁
        let found = repo
            .fuzzy_within_partition("CN", None, "银行", 2, 20)
            .await
            .unwrap();
        let symbols: Vec<&str> = found.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["SH600000", "SH600036"]);
    }

    #[tokio::test]
    async fn test_fuzzy_page_cap_truncates() {
        let repo = repository(seeded());
        // SZ000001 是分區中最後一筆；一頁只評估 1 筆時兩頁讀不到
        let found = repo.fuzzy_within_partition("CN", None, "平安银行", 1, 2).await.unwrap();
        assert!(found.is_empty());

        let found = repo.fuzzy_within_partition("CN", None, "平安银行", 1, 20).await.unwrap();
        assert_eq!(found[0].symbol, "SZ000001");
    }

    #[tokio::test]
    async fn test_fuzzy_matches_case_insensitively_on_symbol() {
        let repo = repository(seeded());
        let found = repo.fuzzy_within_partition("cn", Some(Status::Active), "sh6013", 10, 5).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbol, "SH601318");
    }

    #[tokio::test]
    async fn test_page_by_partition_with_cursor() {
        let repo = repository(seeded());
        let first = repo
            .page_by_partition(PartitionPageRequest {
                market: "CN".into(),
                limit: 2,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(first.items.len(), 2);
        let cursor = first.cursor.clone().expect("應有游標");

        let second = repo
            .page_by_partition(PartitionPageRequest {
                market: "CN".into(),
                limit: 2,
                cursor: Some(cursor),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(second.items.iter().all(|r| !first.items.contains(r)));
    }

    #[tokio::test]
    async fn test_index_request_matches_stored_etf() {
        let repo = repository(seeded());
        let page = repo
            .page_by_partition(PartitionPageRequest {
                market: "CN".into(),
                asset_type: Some(AssetType::Index),
                limit: 50,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].symbol, "SH510300");
        assert_eq!(page.items[0].asset_type, AssetType::Index);
        assert!(page.cursor.is_none());
    }

    #[tokio::test]
    async fn test_invalid_cursor_is_rejected() {
        let repo = repository(seeded());
        let err = repo
            .page_by_partition(PartitionPageRequest {
                market: "CN".into(),
                cursor: Some(Cursor::from("not-base64!")),
                limit: 5,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_fuzzy_query_shape() {
        let mut store = MockKeyValueStore::new();
        store
            .expect_query()
            .withf(|input| {
                input.index.as_deref() == Some("market-status-index")
                    && input.partition_value == "GLOBAL#INACTIVE"
                    && input.sort == Some(SortCondition::BeginsWith("CATALOG#".into()))
                    && input.limit == Some(50)
            })
            .times(1)
            .returning(|_| Ok(QueryOutput::default()));

        let repo = repository(Arc::new(store));
        let found = repo
            .fuzzy_within_partition("global", Some(Status::Inactive), "Apple", 500, 3)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_needles_dedupe() {
        assert_eq!(needles("Apple"), vec!["Apple", "APPLE", "apple"]);
        assert_eq!(needles("银行"), vec!["银行"]);
        assert!(needles("  ").is_empty());
    }
}
