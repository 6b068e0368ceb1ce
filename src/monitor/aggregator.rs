//! Diagnostics aggregation
//!
//! Process-scoped accumulation of observed warnings, deprecation warnings and
//! slow queries. All three lists live behind a single lock: mutations and
//! `reset()` take the write guard, readers the read guard, so `reset()` can
//! never expose a partially-cleared state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::MonitorConfig;
use crate::monitor::classifier::DeprecationMatcher;
use crate::monitor::records::{RawWarning, SlowQueryRecord, WarningRecord};
use crate::monitor::slow_query;

/// The three record lists, owned exclusively by the aggregator
#[derive(Debug, Default)]
struct MonitorState {
    warnings: Vec<WarningRecord>,
    deprecations: Vec<WarningRecord>,
    slow_queries: Vec<SlowQueryRecord>,
}

/// Read-only summary statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStats {
    pub total_warnings: usize,
    pub deprecation_warnings: usize,
    pub slow_queries: usize,
    pub avg_slow_query_time: f64,
}

/// Full serialized snapshot of the aggregator
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsExport {
    pub timestamp: DateTime<Utc>,
    pub stats: MonitorStats,
    pub warnings: Vec<WarningRecord>,
    pub deprecation_warnings: Vec<WarningRecord>,
    pub slow_queries: Vec<SlowQueryRecord>,
}

/// Thread-safe diagnostics accumulator.
///
/// Constructed once at process start and handed to consumers as an
/// `Arc<DiagnosticsAggregator>`; there is no ambient global instance.
pub struct DiagnosticsAggregator {
    config: MonitorConfig,
    matcher: DeprecationMatcher,
    state: RwLock<MonitorState>,
}

impl DiagnosticsAggregator {
    pub fn new(config: MonitorConfig) -> Self {
        let matcher = DeprecationMatcher::new(&config.deprecation_keywords);
        Self {
            config,
            matcher,
            state: RwLock::new(MonitorState::default()),
        }
    }

    /// Record the server warnings produced by one statement.
    ///
    /// Every warning lands in the general log; warnings the classifier marks
    /// as deprecation land in the deprecation log as well. An empty slice is
    /// a no-op. This never fails the observed query.
    pub async fn record_warnings(&self, query: &str, duration_ms: u64, warnings: &[RawWarning]) {
        if warnings.is_empty() {
            return;
        }

        let mut state = self.state.write().await;
        for raw in warnings {
            let record = WarningRecord::new(raw, query, duration_ms);
            let deprecation = self.matcher.is_deprecation(&raw.message);

            if self.config.log_warnings {
                if deprecation {
                    warn!(
                        code = raw.code,
                        level = %raw.level,
                        query = %query,
                        "deprecation warning: {}",
                        raw.message
                    );
                } else {
                    warn!(
                        code = raw.code,
                        level = %raw.level,
                        query = %query,
                        "server warning: {}",
                        raw.message
                    );
                }
            }

            if deprecation {
                state.deprecations.push(record.clone());
            }
            state.warnings.push(record);
        }
    }

    /// Record the execution duration of one statement, keeping it only when
    /// slow-query tracking is enabled and the strict threshold is exceeded.
    pub async fn record_duration(&self, query: &str, duration_ms: u64) {
        if !self.config.track_slow_queries {
            return;
        }

        let Some(record) = slow_query::maybe_record(query, duration_ms, self.config.slow_query_threshold_ms)
        else {
            return;
        };

        if self.config.log_warnings {
            debug!(
                duration_ms,
                threshold_ms = self.config.slow_query_threshold_ms,
                query = %query,
                "slow query recorded"
            );
        }

        let mut state = self.state.write().await;
        state.slow_queries.push(record);
    }

    /// Summary statistics; the average is 0 when no slow queries are recorded
    pub async fn stats(&self) -> MonitorStats {
        let state = self.state.read().await;
        Self::stats_of(&state)
    }

    /// Full snapshot: timestamp, stats and the three record lists
    pub async fn export(&self) -> DiagnosticsExport {
        let state = self.state.read().await;
        DiagnosticsExport {
            timestamp: Utc::now(),
            stats: Self::stats_of(&state),
            warnings: state.warnings.clone(),
            deprecation_warnings: state.deprecations.clone(),
            slow_queries: state.slow_queries.clone(),
        }
    }

    /// Clear all three lists under one write guard
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.warnings.clear();
        state.deprecations.clear();
        state.slow_queries.clear();
        debug!("diagnostics state reset");
    }

    fn stats_of(state: &MonitorState) -> MonitorStats {
        let slow = &state.slow_queries;
        let avg_slow_query_time = if slow.is_empty() {
            0.0
        } else {
            slow.iter().map(|r| r.duration_ms as f64).sum::<f64>() / slow.len() as f64
        };

        MonitorStats {
            total_warnings: state.warnings.len(),
            deprecation_warnings: state.deprecations.len(),
            slow_queries: slow.len(),
            avg_slow_query_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn aggregator() -> DiagnosticsAggregator {
        DiagnosticsAggregator::new(MonitorConfig::default())
    }

    fn deprecation_warning() -> RawWarning {
        RawWarning {
            level: "Warning".to_string(),
            code: 1287,
            message: "The 'authentication_string' column is deprecated".to_string(),
        }
    }

    fn generic_warning() -> RawWarning {
        RawWarning {
            level: "Warning".to_string(),
            code: 1265,
            message: "Data truncated for column 'name' at row 1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_deprecation_lands_in_both_logs_exactly_once() {
        let agg = aggregator();
        agg.record_warnings("SELECT * FROM mysql.user", 12, &[deprecation_warning()])
            .await;

        let stats = agg.stats().await;
        assert_eq!(stats.total_warnings, 1);
        assert_eq!(stats.deprecation_warnings, 1);

        let export = agg.export().await;
        assert_eq!(export.warnings.len(), 1);
        assert_eq!(export.deprecation_warnings.len(), 1);
        assert_eq!(export.warnings[0].code, 1287);
        assert_eq!(export.deprecation_warnings[0].code, 1287);
    }

    #[tokio::test]
    async fn test_generic_warning_stays_out_of_deprecation_log() {
        let agg = aggregator();
        agg.record_warnings("INSERT INTO t VALUES ('x')", 5, &[generic_warning()])
            .await;

        let stats = agg.stats().await;
        assert_eq!(stats.total_warnings, 1);
        assert_eq!(stats.deprecation_warnings, 0);
    }

    #[tokio::test]
    async fn test_empty_warning_slice_is_a_noop() {
        let agg = aggregator();
        agg.record_warnings("SELECT 1", 1, &[]).await;
        assert_eq!(agg.stats().await.total_warnings, 0);
    }

    #[tokio::test]
    async fn test_avg_is_zero_without_slow_queries() {
        let agg = aggregator();
        assert_eq!(agg.stats().await.avg_slow_query_time, 0.0);
    }

    #[tokio::test]
    async fn test_avg_is_arithmetic_mean() {
        let agg = aggregator();
        agg.record_duration("SELECT SLEEP(2)", 2000).await;
        agg.record_duration("SELECT SLEEP(3)", 3000).await;

        let stats = agg.stats().await;
        assert_eq!(stats.slow_queries, 2);
        assert_eq!(stats.avg_slow_query_time, 2500.0);
    }

    #[tokio::test]
    async fn test_duration_at_threshold_is_not_recorded() {
        let agg = aggregator();
        agg.record_duration("SELECT 1", 1000).await;
        assert_eq!(agg.stats().await.slow_queries, 0);

        agg.record_duration("SELECT 1", 1001).await;
        assert_eq!(agg.stats().await.slow_queries, 1);
    }

    #[tokio::test]
    async fn test_tracking_disabled_records_nothing() {
        let config = MonitorConfig {
            track_slow_queries: false,
            ..MonitorConfig::default()
        };
        let agg = DiagnosticsAggregator::new(config);
        agg.record_duration("SELECT SLEEP(10)", 10_000).await;
        assert_eq!(agg.stats().await.slow_queries, 0);
    }

    #[tokio::test]
    async fn test_reset_clears_everything() {
        let agg = aggregator();
        agg.record_warnings("q", 1, &[deprecation_warning(), generic_warning()])
            .await;
        agg.record_duration("q", 5000).await;

        agg.reset().await;

        let stats = agg.stats().await;
        assert_eq!(stats.total_warnings, 0);
        assert_eq!(stats.deprecation_warnings, 0);
        assert_eq!(stats.slow_queries, 0);
        assert_eq!(stats.avg_slow_query_time, 0.0);
    }

    #[tokio::test]
    async fn test_export_uses_wire_field_names() {
        let agg = aggregator();
        agg.record_warnings("q", 1, &[deprecation_warning()]).await;
        agg.record_duration("q", 1500).await;

        let value = serde_json::to_value(agg.export().await).unwrap();
        assert!(value.get("timestamp").is_some());
        assert_eq!(value["stats"]["totalWarnings"], 1);
        assert_eq!(value["stats"]["deprecationWarnings"], 1);
        assert_eq!(value["stats"]["slowQueries"], 1);
        assert_eq!(value["stats"]["avgSlowQueryTime"], 1500.0);
        assert_eq!(value["warnings"].as_array().unwrap().len(), 1);
        assert_eq!(value["deprecationWarnings"].as_array().unwrap().len(), 1);
        assert_eq!(value["slowQueries"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_custom_keywords_flow_through_config() {
        let config = MonitorConfig {
            deprecation_keywords: vec!["sunset".to_string()],
            ..MonitorConfig::default()
        };
        let agg = DiagnosticsAggregator::new(config);

        let warning = RawWarning {
            level: "Warning".to_string(),
            code: 1,
            message: "this feature will sunset next release".to_string(),
        };
        agg.record_warnings("q", 1, &[warning]).await;

        let stats = agg.stats().await;
        assert_eq!(stats.deprecation_warnings, 1);
    }
}
