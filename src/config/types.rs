use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::validation::{ValidationError, ValidationUtils, Validator};
use crate::utils::time_utils::MAX_WINDOW_DAYS;

/// 應用程序配置結構
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplicationConfig {
    pub log: LogConfig,
    pub store: StoreConfig,
    pub redis: RedisConfig,
    pub query: QueryConfig,
}

impl Validator for ApplicationConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        // 驗證各個部分的配置
        self.log.validate()?;
        self.store.validate()?;
        self.query.validate()?;

        // 只有使用 Redis 後端時才需要 Redis 配置
        if self.store.backend == "redis" {
            self.redis.validate()?;
        }

        Ok(())
    }
}

/// 日誌配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Validator for LogConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::one_of(
            &self.level.to_lowercase().as_str(),
            &["trace", "debug", "info", "warn", "error"],
            "log.level",
        )?;
        ValidationUtils::one_of(&self.format.to_lowercase().as_str(), &["pretty", "json"], "log.format")?;

        Ok(())
    }
}

/// 目錄資料表配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogTableConfig {
    pub table: String,
    pub symbol_index: String,
    pub partition_index: String,
}

impl Default for CatalogTableConfig {
    fn default() -> Self {
        Self {
            table: "catalog".to_string(),
            symbol_index: "symbol-index".to_string(),
            partition_index: "market-status-index".to_string(),
        }
    }
}

/// 價格序列資料表配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesTableConfig {
    pub table: String,
    pub symbol_date_index: String,
}

impl SeriesTableConfig {
    pub fn named(table: &str) -> Self {
        Self {
            table: table.to_string(),
            symbol_date_index: "symbol-date-index".to_string(),
        }
    }
}

/// 儲存配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `memory` 或 `redis`
    pub backend: String,
    /// 記憶體後端啟動時載入的 NDJSON 種子檔
    #[serde(default)]
    pub seed_file: Option<String>,
    /// 單次儲存呼叫超時（毫秒）
    pub call_timeout_ms: u64,
    pub catalog: CatalogTableConfig,
    pub index_series: SeriesTableConfig,
    pub equity_series: SeriesTableConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            seed_file: None,
            call_timeout_ms: 3000,
            catalog: CatalogTableConfig::default(),
            index_series: SeriesTableConfig::named("index-series"),
            equity_series: SeriesTableConfig::named("equity-series"),
        }
    }
}

impl StoreConfig {
    /// 單次儲存呼叫超時
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl Validator for StoreConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::one_of(&self.backend.as_str(), &["memory", "redis"], "store.backend")?;
        ValidationUtils::in_range(self.call_timeout_ms, 10, 60_000, "store.call_timeout_ms")?;
        ValidationUtils::check_dependency(
            self.seed_file.is_some(),
            self.backend == "memory",
            "store.seed_file",
            "store.backend = memory",
        )?;
        ValidationUtils::not_empty(&self.catalog.table, "store.catalog.table")?;
        ValidationUtils::not_empty(&self.catalog.symbol_index, "store.catalog.symbol_index")?;
        ValidationUtils::not_empty(&self.catalog.partition_index, "store.catalog.partition_index")?;
        ValidationUtils::not_empty(&self.index_series.table, "store.index_series.table")?;
        ValidationUtils::not_empty(&self.equity_series.table, "store.equity_series.table")?;

        if self.index_series.table == self.equity_series.table {
            return Err(ValidationError::InvalidValue(
                "指數序列表與股票序列表不可相同".to_string(),
            ));
        }

        Ok(())
    }
}

/// Redis配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub pool_size: u32,
    pub connection_timeout_secs: u64,
    /// 鍵名前綴，用於隔離不同環境
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            pool_size: 8,
            connection_timeout_secs: 5,
            key_prefix: "catalog".to_string(),
        }
    }
}

impl Validator for RedisConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::not_empty(&self.url, "redis.url")?;
        ValidationUtils::in_range(self.pool_size, 1, 100, "redis.pool_size")?;
        ValidationUtils::in_range(self.connection_timeout_secs, 1, 60, "redis.connection_timeout_secs")?;
        ValidationUtils::not_empty(&self.key_prefix, "redis.key_prefix")?;

        Ok(())
    }
}

/// 查詢配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// 搜尋結果上限（呼叫端不可調整）
    pub search_limit: usize,
    /// 未指定範圍時依序搜尋的分區
    pub search_partitions: Vec<String>,
    /// 模糊比對的翻頁上限
    pub fuzzy_max_pages: usize,
    /// 列表預設每頁筆數
    pub list_default_limit: usize,
    /// 報價補充的並行上限
    pub fan_out: usize,
    /// 未指定區間時的預設天數
    pub default_days: u32,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            search_limit: 20,
            search_partitions: vec![
                "CN".to_string(),
                "GLOBAL".to_string(),
                "INDEX".to_string(),
                "FUND".to_string(),
            ],
            fuzzy_max_pages: 10,
            list_default_limit: 20,
            fan_out: 8,
            default_days: 120,
        }
    }
}

impl Validator for QueryConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationUtils::in_range(self.search_limit, 1, 50, "query.search_limit")?;
        ValidationUtils::in_range(self.fuzzy_max_pages, 1, 20, "query.fuzzy_max_pages")?;
        ValidationUtils::in_range(self.list_default_limit, 1, 50, "query.list_default_limit")?;
        ValidationUtils::in_range(self.fan_out, 1, 64, "query.fan_out")?;
        ValidationUtils::in_range(self.default_days, 1, MAX_WINDOW_DAYS, "query.default_days")?;

        if self.search_partitions.is_empty() {
            return Err(ValidationError::MissingField("query.search_partitions".to_string()));
        }
        for partition in &self.search_partitions {
            ValidationUtils::not_empty(partition, "query.search_partitions")?;
        }

        Ok(())
    }
}
