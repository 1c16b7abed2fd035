//! 日頻價格序列類型定義

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain_types::DomainError;

/// 價格序列所屬的資產類別，決定讀取哪一張序列表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Index,
    Stock,
}

impl AssetClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetClass::Index => "index",
            AssetClass::Stock => "stock",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "index" | "etf" => Ok(AssetClass::Index),
            "stock" => Ok(AssetClass::Stock),
            other => Err(DomainError::UnknownAssetType(other.to_string())),
        }
    }
}

/// 單一交易日的價格點
///
/// 所有數值欄位在讀取時都經過容錯轉換，無法解析的值為 `None`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeseriesPoint {
    /// 交易日 `YYYY-MM-DD`，無法解析時為空字串
    pub date: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_close: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_close: Option<f64>,
    /// 舊資料中的 `last` / `price` 欄位
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last: Option<f64>,
}

impl TimeseriesPoint {
    /// 標準價格：close → adjustedClose → last/price
    pub fn price(&self) -> Option<f64> {
        self.close.or(self.adjusted_close).or(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_fallback_chain() {
        let mut point = TimeseriesPoint {
            date: "2024-03-01".to_string(),
            last: Some(9.0),
            ..Default::default()
        };
        assert_eq!(point.price(), Some(9.0));

        point.adjusted_close = Some(9.5);
        assert_eq!(point.price(), Some(9.5));

        point.close = Some(10.0);
        assert_eq!(point.price(), Some(10.0));
    }

    #[test]
    fn test_asset_class_accepts_etf_alias() {
        assert_eq!("ETF".parse::<AssetClass>().unwrap(), AssetClass::Index);
        assert_eq!("stock".parse::<AssetClass>().unwrap(), AssetClass::Stock);
        assert!("bond".parse::<AssetClass>().is_err());
    }
}
