//! 目錄資料表的項目結構與正規化

use tracing::debug;

use crate::domain_types::catalog::{AssetType, CatalogRecord, Status};
use crate::storage::store::{attribute_text, Item};

/// 目錄資料表屬性名稱
pub mod attr {
    pub const PK: &str = "pk";
    pub const SK: &str = "sk";
    pub const SYMBOL: &str = "symbol";
    pub const NAME: &str = "name";
    pub const EXCHANGE: &str = "exchange";
    pub const ASSET_TYPE: &str = "assetType";
    pub const MARKET: &str = "market";
    pub const STATUS: &str = "status";
    pub const MARKET_STATUS: &str = "marketStatus";
    pub const ENTITY_SCOPE: &str = "entityScope";
}

/// 分區索引排序鍵中標記目錄列的前綴，與同分區的報價列區分
pub const CATALOG_SCOPE_PREFIX: &str = "CATALOG#";

/// 鍵值中分隔實體類型與識別碼的字元
const KEY_SEPARATOR: char = '#';

/// `(market, status)` 分區索引的分區鍵值
pub fn partition_key(market: &str, status: Status) -> String {
    format!(
        "{}{}{}",
        market.trim().to_uppercase(),
        KEY_SEPARATOR,
        status.partition_token()
    )
}

type FieldExtractor = fn(&Item) -> Option<String>;

/// 代碼來源，依優先順序嘗試；新的欄位變體只需在此加一行
const SYMBOL_EXTRACTORS: &[FieldExtractor] = &[explicit_symbol, symbol_from_pk, symbol_from_scope];

fn explicit_symbol(item: &Item) -> Option<String> {
    non_empty(item, attr::SYMBOL)
}

fn symbol_from_pk(item: &Item) -> Option<String> {
    key_suffix(item, attr::PK)
}

fn symbol_from_scope(item: &Item) -> Option<String> {
    key_suffix(item, attr::ENTITY_SCOPE)
}

fn non_empty(item: &Item, name: &str) -> Option<String> {
    attribute_text(item.get(name))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 取鍵值中第一個分隔字元之後的部分
fn key_suffix(item: &Item, name: &str) -> Option<String> {
    let value = non_empty(item, name)?;
    let (_, rest) = value.split_once(KEY_SEPARATOR)?;
    let rest = rest.trim();
    (!rest.is_empty()).then(|| rest.to_uppercase())
}

/// 推導項目的標準代碼
pub fn extract_symbol(item: &Item) -> Option<String> {
    SYMBOL_EXTRACTORS
        .iter()
        .find_map(|extract| extract(item))
        .map(|s| s.to_uppercase())
}

/// 將儲存項目轉為目錄記錄；無法推導代碼時回傳 `None`
pub fn record_from_item(item: &Item) -> Option<CatalogRecord> {
    let symbol = extract_symbol(item)?;
    let market_status = non_empty(item, attr::MARKET_STATUS);
    let (partition_market, partition_status) =
        match market_status.as_deref().and_then(|v| v.split_once(KEY_SEPARATOR)) {
            Some((market, status)) => (Some(market.to_string()), Some(status.to_string())),
            None => (market_status, None),
        };

    let asset_type = match non_empty(item, attr::ASSET_TYPE) {
        Some(raw) => raw.parse::<AssetType>().unwrap_or_else(|_| {
            debug!("代碼 {} 的資產類型 {} 無法辨識，視為股票", symbol, raw);
            AssetType::Stock
        }),
        None => AssetType::Stock,
    };

    let status = non_empty(item, attr::STATUS)
        .or(partition_status)
        .and_then(|raw| raw.parse::<Status>().ok())
        .unwrap_or_default();

    Some(CatalogRecord {
        name: non_empty(item, attr::NAME).unwrap_or_default(),
        exchange: non_empty(item, attr::EXCHANGE).unwrap_or_default(),
        asset_type: asset_type.normalized(),
        market: non_empty(item, attr::MARKET)
            .or(partition_market)
            .unwrap_or_default(),
        status,
        symbol,
    })
}
