//! 目錄搜尋
//!
//! 依序嘗試一組明確的階段：代碼型查詢先逐一精確查找候選代碼，命中即結束；
//! 否則在指定市場或預設分區清單中做模糊比對，後面的分區只要求剩餘的筆數。
//! 任一階段失敗只記錄並略過。

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{QueryError, QueryResult};
use crate::config::types::QueryConfig;
use crate::domain_types::catalog::CatalogRecord;
use crate::domain_types::symbol::analyze;
use crate::monitor::QueryMetrics;
use crate::storage::repository::CatalogRepository;

/// 搜尋結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub count: usize,
    pub items: Vec<CatalogRecord>,
}

/// 搜尋階段
#[derive(Debug, Clone, PartialEq, Eq)]
enum Stage {
    /// 以候選代碼精確查找，命中即結束
    Exact(String),
    /// 在一個市場分區內模糊比對
    Fuzzy(String),
}

impl Stage {
    fn kind(&self) -> &'static str {
        match self {
            Stage::Exact(_) => "search.exact",
            Stage::Fuzzy(_) => "search.fuzzy",
        }
    }
}

/// 依序去重收集結果
struct Collector {
    items: Vec<CatalogRecord>,
    seen: HashSet<String>,
    limit: usize,
}

impl Collector {
    fn new(limit: usize) -> Self {
        Self {
            items: Vec::with_capacity(limit),
            seen: HashSet::new(),
            limit,
        }
    }

    fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.items.len())
    }

    fn extend(&mut self, records: Vec<CatalogRecord>) {
        for record in records {
            if self.remaining() == 0 {
                break;
            }
            if self.seen.insert(record.symbol.clone()) {
                self.items.push(record);
            }
        }
    }
}

/// 目錄搜尋編排器
pub struct SearchOrchestrator {
    catalog: Arc<dyn CatalogRepository>,
    config: QueryConfig,
}

impl SearchOrchestrator {
    pub fn new(catalog: Arc<dyn CatalogRepository>, config: QueryConfig) -> Self {
        Self { catalog, config }
    }

    fn plan(&self, query: &str, market: Option<&str>) -> Vec<Stage> {
        let analysis = analyze(query);
        let mut stages: Vec<Stage> = analysis
            .symbol_candidates
            .into_iter()
            .map(Stage::Exact)
            .collect();

        match market.map(str::trim).filter(|m| !m.is_empty()) {
            Some(market) => stages.push(Stage::Fuzzy(market.to_uppercase())),
            None => stages.extend(
                self.config
                    .search_partitions
                    .iter()
                    .map(|p| Stage::Fuzzy(p.to_uppercase())),
            ),
        }
        stages
    }

    /// 搜尋目錄
    pub async fn search(&self, query: &str, market: Option<&str>) -> QueryResult<SearchResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(QueryError::validation("搜尋字串不可為空"));
        }

        let stages = self.plan(query, market);
        debug!("搜尋 {:?} 的階段: {:?}", query, stages);

        let mut collector = Collector::new(self.config.search_limit.max(1));
        for stage in stages {
            let remaining = collector.remaining();
            if remaining == 0 {
                break;
            }

            let outcome = match &stage {
                Stage::Exact(symbol) => self.catalog.get_by_symbol_exact(symbol, remaining).await,
                Stage::Fuzzy(partition) => {
                    self.catalog
                        .fuzzy_within_partition(partition, None, query, remaining, self.config.fuzzy_max_pages)
                        .await
                }
            };

            match outcome {
                Ok(records) => {
                    let hit = !records.is_empty();
                    collector.extend(records);
                    if hit && matches!(stage, Stage::Exact(_)) {
                        break;
                    }
                }
                Err(e) => {
                    warn!("搜尋階段 {:?} 失敗，略過: {}", stage, e);
                    QueryMetrics::record_stage_failure(stage.kind());
                }
            }
        }

        let items = collector.items;
        debug!("搜尋 {:?} 完成: {} 筆", query, items.len());
        Ok(SearchResult {
            count: items.len(),
            items,
        })
    }
}
