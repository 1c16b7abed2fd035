//! 儲存項目結構與正規化
//!
//! 將儲存層的原始屬性映射轉為領域類型，吸收歷次欄位調整造成的差異。

pub mod catalog;
pub mod timeseries;

pub use catalog::{extract_symbol, partition_key, record_from_item, CATALOG_SCOPE_PREFIX};
pub use timeseries::{
    coerce_number, date_sort_key, extract_date, merge_points, point_from_item, SortKeyLayout,
    DATE_KEY_PREFIX, SORT_KEY_LAYOUTS,
};
