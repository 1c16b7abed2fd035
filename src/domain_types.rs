//! 領域類型模組
//!
//! 目錄記錄、價格點、報價欄位，以及代碼解析器。

pub mod catalog;
pub mod quote;
pub mod symbol;
pub mod timeseries;

pub use catalog::{AssetType, CatalogRecord, Status};
pub use quote::QuoteFields;
pub use symbol::{analyze, SymbolCandidateSet};
pub use timeseries::{AssetClass, TimeseriesPoint};

use thiserror::Error;

/// 領域值解析錯誤
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("未知的資產類型: {0}")]
    UnknownAssetType(String),

    #[error("未知的上市狀態: {0}")]
    UnknownStatus(String),
}
