use catalog_query::config::{QueryConfig, StoreConfig};
use catalog_query::query::engine::table_schemas;
use catalog_query::query::CatalogQueryEngine;
use catalog_query::storage::{Item, MemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn item(value: Value) -> Item {
    value.as_object().cloned().expect("fixture must be an object")
}

pub fn catalog_item(symbol: &str, name: &str, market: &str, asset_type: &str) -> Item {
    item(json!({
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
    }))
}

pub fn series_item(symbol: &str, date: &str, close: f64) -> Item {
    item(json!({
        "pk": symbol,
        "sk": format!("DATE#{date}"),
        "symbol": symbol,
        "close": close,
    }))
}

/// 測試用儲存：CN 市場四檔、INDEX 市場一檔，以及少量價格序列
pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub store_config: StoreConfig,
}

impl Fixture {
    pub fn empty() -> Self {
        let store_config = StoreConfig::default();
        let store = Arc::new(MemoryStore::new(table_schemas(&store_config)));
        Self { store, store_config }
    }

    pub fn seeded() -> Self {
        let fixture = Self::empty();
        let catalog = &fixture.store_config.catalog.table;
        for (symbol, name, market, asset_type) in [
            ("SH510300", "沪深300ETF", "CN", "etf"),
            ("SH600036", "招商银行", "CN", "stock"),
            ("SH601318", "中国平安", "CN", "stock"),
            ("SZ000001", "平安银行", "CN", "stock"),
            ("SH000300", "沪深300", "INDEX", "index"),
        ] {
            fixture
                .store
                .put_item(catalog, catalog_item(symbol, name, market, asset_type))
                .unwrap();
        }

        let index = &fixture.store_config.index_series.table;
        for (date, close) in [("2024-05-30", 3600.0), ("2024-05-31", 3580.0)] {
            fixture.store.put_item(index, series_item("SH000300", date, close)).unwrap();
        }

        let equity = &fixture.store_config.equity_series.table;
        for (date, close) in [("2024-05-29", 37.5), ("2024-05-30", 38.0), ("2024-05-31", 40.0)] {
            fixture.store.put_item(equity, series_item("SH600036", date, close)).unwrap();
        }
        fixture
            .store
            .put_item(equity, series_item("SZ000001", "2024-05-31", 10.5))
            .unwrap();
        fixture
    }

    pub fn engine(&self) -> CatalogQueryEngine {
        CatalogQueryEngine::new(self.store.clone(), &self.store_config, &QueryConfig::default())
    }
}
