//! Application state management
//!
//! Contains shared state accessible across all handlers.

use crate::config::MonitorConfig;
use crate::monitor::DiagnosticsAggregator;
use sqlx::mysql::MySqlPool;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Connection pool for the monitored MySQL target
    pub db_pool: MySqlPool,

    /// Diagnostics aggregator; explicitly owned here and handed out as an
    /// Arc rather than living as a hidden global
    pub monitor: Arc<DiagnosticsAggregator>,
}

impl AppState {
    /// Create new application state; the aggregator is constructed exactly
    /// once with the monitor configuration loaded at startup
    pub fn new(pool: MySqlPool, monitor_config: MonitorConfig) -> Self {
        Self {
            db_pool: pool,
            monitor: Arc::new(DiagnosticsAggregator::new(monitor_config)),
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
