//! Query interception
//!
//! Wraps an existing query-execution capability without changing its
//! contract. `Monitored` delegates to the inner executor, measures elapsed
//! time on both the success and failure paths, pulls the server warnings
//! from the same capability (and therefore the same connection), feeds both
//! into the aggregator, and hands the original result or error back to the
//! caller. Warning retrieval is a diagnostics concern: its failures are
//! logged and swallowed, never raised past this boundary.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::warn;

use crate::error::AppError;
use crate::monitor::aggregator::DiagnosticsAggregator;
use crate::monitor::records::RawWarning;

/// The query-execution capability the host hands to `instrument`.
///
/// `server_warnings` must report the warnings of the most recently executed
/// statement on the same underlying connection.
#[async_trait]
pub trait QueryExecutor: Send {
    /// Result type of the underlying execution path
    type Output: Send;

    async fn execute(&mut self, sql: &str) -> Result<Self::Output, AppError>;

    async fn server_warnings(&mut self) -> Result<Vec<RawWarning>, AppError>;
}

/// Decorator implementing the same capability as its inner executor
pub struct Monitored<E> {
    inner: E,
    monitor: Arc<DiagnosticsAggregator>,
}

/// Host integration point: returns an instrumented capability with the same
/// signature as the one passed in. Installed once by the hosting pipeline.
pub fn instrument<E: QueryExecutor>(inner: E, monitor: Arc<DiagnosticsAggregator>) -> Monitored<E> {
    Monitored { inner, monitor }
}

impl<E: QueryExecutor> Monitored<E> {
    /// Feed timing and warnings to the aggregator. Runs after the observed
    /// statement completes and before control returns, so a caller reading
    /// aggregator state right after `execute` sees this query's effects.
    async fn observe(&mut self, sql: &str, duration_ms: u64) {
        self.monitor.record_duration(sql, duration_ms).await;

        match self.inner.server_warnings().await {
            Ok(warnings) => {
                self.monitor.record_warnings(sql, duration_ms, &warnings).await;
            }
            Err(e) => {
                // Diagnostics collection failure, not a query failure
                warn!(query = %sql, "could not fetch server warnings: {}", e);
            }
        }
    }
}

#[async_trait]
impl<E: QueryExecutor> QueryExecutor for Monitored<E> {
    type Output = E::Output;

    async fn execute(&mut self, sql: &str) -> Result<Self::Output, AppError> {
        let started = Instant::now();
        let result = self.inner.execute(sql).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        self.observe(sql, duration_ms).await;

        result
    }

    async fn server_warnings(&mut self) -> Result<Vec<RawWarning>, AppError> {
        self.inner.server_warnings().await
    }
}
