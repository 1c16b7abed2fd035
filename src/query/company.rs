use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain_types::catalog::CatalogRecord;
use crate::domain_types::symbol::analyze;
use crate::monitor::QueryMetrics;
use crate::storage::repository::CatalogRepository;

/// 單一代碼查找
pub struct CompanyLookup {
    catalog: Arc<dyn CatalogRepository>,
}

impl CompanyLookup {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// 依代碼查找單一目錄記錄，查無資料時回傳 `None`
    pub async fn lookup(&self, code: &str) -> Option<CatalogRecord> {
        let analysis = analyze(code);
        if analysis.normalized.is_empty() {
            return None;
        }
        let candidates = if analysis.is_symbol_like {
            analysis.symbol_candidates
        } else {
            vec![analysis.normalized]
        };

        for candidate in &candidates {
            match self.catalog.get_by_symbol_exact(candidate, 1).await {
                Ok(records) => {
                    if let Some(record) = records.into_iter().next() {
                        return Some(record);
                    }
                }
                Err(e) => {
                    warn!("代碼 {} 查找失敗，略過: {}", candidate, e);
                    QueryMetrics::record_stage_failure("company.exact");
                }
            }
        }
        debug!("查無代碼 {:?}", code);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_types::catalog::{AssetType, Status};
    use crate::storage::repository::catalog::MockCatalogRepository;
    use crate::storage::store::StoreError;

    fn record(symbol: &str) -> CatalogRecord {
        CatalogRecord {
            symbol: symbol.to_string(),
            name: "中信证券".to_string(),
            exchange: "SSE".to_string(),
            asset_type: AssetType::Stock,
            market: "CN".to_string(),
            status: Status::Active,
        }
    }

    #[tokio::test]
    async fn test_failure_on_first_candidate_is_absorbed() {
        let mut mock = MockCatalogRepository::new();
        mock.expect_get_by_symbol_exact()
            .withf(|symbol, limit| symbol.to_string() == "600030" && *limit == 1)
            .returning(|_, _| Err(StoreError::Timeout {
                operation: "catalog.exact".into(),
                timeout_ms: 3000,
            }));
        mock.expect_get_by_symbol_exact()
            .withf(|symbol, _| symbol.to_string() == "SH600030")
            .returning(|symbol, _| Ok(vec![record(symbol)]));

        let found = CompanyLookup::new(Arc::new(mock)).lookup("600030").await;
        assert_eq!(found.map(|r| r.symbol), Some("SH600030".to_string()));
    }

    #[tokio::test]
    async fn test_not_found() {
        let mut mock = MockCatalogRepository::new();
        mock.expect_get_by_symbol_exact()
            .withf(|symbol, _| symbol.to_string() == "AAPL")
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let lookup = CompanyLookup::new(Arc::new(mock));
        assert!(lookup.lookup("aapl").await.is_none());
        assert!(lookup.lookup("   ").await.is_none());
    }
}
