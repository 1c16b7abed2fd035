use metrics::{counter, histogram};
use std::time::Duration;

/// 監控指標命名空間
pub const METRIC_NAMESPACE: &str = "catalog_query";

/// 監控指標類型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// 儲存呼叫完成
    StoreCall { operation: &'static str, ok: bool },
    /// 儲存呼叫超時
    StoreTimeout { operation: &'static str },
    /// 回退鏈中的某一階段失敗並被略過
    StageFailure { stage: &'static str },
    /// 單一項目的報價補充失敗
    EnrichmentFailure,
}

/// 查詢引擎監控指標記錄器
///
/// 未安裝 recorder 時所有記錄都是空操作。
pub struct QueryMetrics;

impl QueryMetrics {
    /// 記錄查詢指標
    ///
    /// # Arguments
    /// * `metric_type` - 指標類型
    /// * `duration` - 可選的持續時間，用於延遲指標
    pub fn record(metric_type: MetricType, duration: Option<Duration>) {
        match metric_type {
            MetricType::StoreCall { operation, ok } => {
                counter!(
                    format!("{}.store_call", METRIC_NAMESPACE),
                    "operation" => operation,
                    "result" => if ok { "ok" } else { "error" }
                )
                .increment(1);

                if let Some(dur) = duration {
                    histogram!(
                        format!("{}.store_latency_ms", METRIC_NAMESPACE),
                        "operation" => operation
                    )
                    .record(dur.as_secs_f64() * 1000.0);
                }
            }
            MetricType::StoreTimeout { operation } => {
                counter!(
                    format!("{}.store_timeout", METRIC_NAMESPACE),
                    "operation" => operation
                )
                .increment(1);
            }
            MetricType::StageFailure { stage } => {
                counter!(
                    format!("{}.stage_failure", METRIC_NAMESPACE),
                    "stage" => stage
                )
                .increment(1);
            }
            MetricType::EnrichmentFailure => {
                counter!(format!("{}.enrichment_failure", METRIC_NAMESPACE)).increment(1);
            }
        }
    }

    /// 記錄儲存呼叫延遲與結果
    pub fn record_store_call(operation: &'static str, ok: bool, duration: Duration) {
        Self::record(MetricType::StoreCall { operation, ok }, Some(duration));
    }

    /// 記錄儲存呼叫超時
    pub fn record_store_timeout(operation: &'static str) {
        Self::record(MetricType::StoreTimeout { operation }, None);
    }

    /// 記錄回退階段失敗
    pub fn record_stage_failure(stage: &'static str) {
        Self::record(MetricType::StageFailure { stage }, None);
    }

    /// 記錄報價補充失敗
    pub fn record_enrichment_failure() {
        Self::record(MetricType::EnrichmentFailure, None);
    }
}
