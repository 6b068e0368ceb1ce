//! Diagnostics route handlers
//!
//! Read-only views over the aggregator plus the explicit reset operation.

use crate::monitor::DiagnosticsExport;
use crate::state::SharedState;
use axum::extract::State;
use axum::Json;

/// Summary statistics snapshot
pub async fn stats(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let stats = state.monitor.stats().await;
    Json(serde_json::json!({
        "success": true,
        "stats": stats,
    }))
}

/// Full export: timestamp, stats and all recorded warnings/slow queries
pub async fn export(State(state): State<SharedState>) -> Json<DiagnosticsExport> {
    Json(state.monitor.export().await)
}

/// Clear all diagnostics state
pub async fn reset(State(state): State<SharedState>) -> Json<serde_json::Value> {
    state.monitor.reset().await;
    Json(serde_json::json!({
        "success": true,
        "message": "Diagnostics state cleared.",
    }))
}
