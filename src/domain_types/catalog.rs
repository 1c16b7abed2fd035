//! 商品目錄類型定義

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain_types::DomainError;

/// 商品資產類型
///
/// 儲存層可能出現 `etf`，對外一律正規化為 `index`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Index,
    Etf,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "stock",
            AssetType::Index => "index",
            AssetType::Etf => "etf",
        }
    }

    /// 對外邊界使用的正規化值
    pub fn normalized(self) -> Self {
        match self {
            AssetType::Etf => AssetType::Index,
            other => other,
        }
    }

    /// 儲存層中可能代表此類型的所有原始值
    pub fn stored_values(self) -> &'static [&'static str] {
        match self.normalized() {
            AssetType::Index => &["index", "etf"],
            _ => &["stock"],
        }
    }

    /// 是否讀取指數序列表
    pub fn uses_index_series(self) -> bool {
        matches!(self, AssetType::Index | AssetType::Etf)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stock" => Ok(AssetType::Stock),
            "index" => Ok(AssetType::Index),
            "etf" => Ok(AssetType::Etf),
            other => Err(DomainError::UnknownAssetType(other.to_string())),
        }
    }
}

/// 商品上市狀態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Inactive,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
        }
    }

    /// 分區鍵中使用的大寫形式
    pub fn partition_token(&self) -> &'static str {
        match self {
            Status::Active => "ACTIVE",
            Status::Inactive => "INACTIVE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Status::Active),
            "inactive" => Ok(Status::Inactive),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}

/// 單一可交易商品的目錄記錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub asset_type: AssetType,
    pub market: String,
    pub status: Status,
}

impl CatalogRecord {
    /// 是否符合呼叫端指定的市場與資產類型
    pub fn matches_scope(&self, market: Option<&str>, asset_type: Option<AssetType>) -> bool {
        let market_ok = market.map_or(true, |m| self.market.eq_ignore_ascii_case(m));
        let type_ok = asset_type.map_or(true, |t| self.asset_type.normalized() == t.normalized());
        market_ok && type_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(asset_type: AssetType) -> CatalogRecord {
        CatalogRecord {
            symbol: "SH000300".to_string(),
            name: "滬深300".to_string(),
            exchange: "SSE".to_string(),
            asset_type,
            market: "INDEX".to_string(),
            status: Status::Active,
        }
    }

    #[test]
    fn test_etf_normalizes_to_index() {
        assert_eq!(AssetType::Etf.normalized(), AssetType::Index);
        assert_eq!(AssetType::Stock.normalized(), AssetType::Stock);
        assert!(AssetType::Etf.uses_index_series());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("ETF".parse::<AssetType>().unwrap(), AssetType::Etf);
        assert_eq!(" Active ".parse::<Status>().unwrap(), Status::Active);
        assert!("bond".parse::<AssetType>().is_err());
    }

    #[test]
    fn test_matches_scope() {
        let rec = record(AssetType::Index);
        assert!(rec.matches_scope(Some("index"), Some(AssetType::Etf)));
        assert!(rec.matches_scope(None, None));
        assert!(!rec.matches_scope(Some("CN"), None));
        assert!(!rec.matches_scope(None, Some(AssetType::Stock)));
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(record(AssetType::Index)).unwrap();
        assert_eq!(json["assetType"], "index");
        assert_eq!(json["status"], "active");
    }
}
