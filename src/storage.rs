//! 儲存模組
//!
//! 分區鍵值儲存介面及其實現、項目結構解析、游標編解碼、種子資料載入，以及面向領域的存取層。

pub mod cursor;
pub mod memory;
pub mod models;
pub mod redis;
pub mod repository;
pub mod seed;
pub mod store;

pub use cursor::{Cursor, CursorError};
pub use memory::MemoryStore;
pub use redis::RedisStore;
pub use repository::{
    catalog_schema, series_schema, CatalogPage, CatalogRepository, PartitionPageRequest,
    StoreCatalogRepository, StoreTimeseriesRepository, TimeseriesRepository,
};
pub use seed::{load_seed, load_seed_file, parse_seed, ItemWriter, SeedError, SeedRecord};
pub use store::{
    Filter, Item, KeySchema, KeyValueStore, QueryInput, QueryOutput, SortCondition, StoreError,
    TableSchema,
};
