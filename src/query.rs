//! 查詢編排模組
//!
//! 每個編排器把一個對外操作拆成數個儲存呼叫，在階段邊界吸收儲存錯誤，
//! 只把參數驗證錯誤回傳給呼叫端。

use std::sync::Arc;

use crate::domain_types::catalog::AssetType;
use crate::domain_types::timeseries::AssetClass;
use crate::storage::repository::TimeseriesRepository;

pub mod company;
pub mod engine;
pub mod error;
pub mod list;
pub mod range;
pub mod search;
pub mod snapshot;

pub use company::CompanyLookup;
pub use engine::CatalogQueryEngine;
pub use error::{QueryError, QueryResult};
pub use list::{ListOrchestrator, ListRequest, ListResult, ListedItem};
pub use range::{RangeOrchestrator, RangeResult, TimeseriesRequest};
pub use search::{SearchOrchestrator, SearchResult};
pub use snapshot::{parse_symbols, SnapshotItem, SnapshotKind, SnapshotOrchestrator, SnapshotResult};

/// 指數與股票兩張序列表的存取
#[derive(Clone)]
pub struct SeriesStores {
    index: Arc<dyn TimeseriesRepository>,
    equity: Arc<dyn TimeseriesRepository>,
}

impl SeriesStores {
    pub fn new(index: Arc<dyn TimeseriesRepository>, equity: Arc<dyn TimeseriesRepository>) -> Self {
        Self { index, equity }
    }

    pub fn for_class(&self, asset: AssetClass) -> &Arc<dyn TimeseriesRepository> {
        match asset {
            AssetClass::Index => &self.index,
            AssetClass::Stock => &self.equity,
        }
    }

    /// `index`/`etf` 讀指數序列表，其餘讀股票序列表
    pub fn for_asset_type(&self, asset_type: AssetType) -> &Arc<dyn TimeseriesRepository> {
        if asset_type.uses_index_series() {
            &self.index
        } else {
            &self.equity
        }
    }
}
