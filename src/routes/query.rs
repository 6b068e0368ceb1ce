//! Monitored query execution handler
//!
//! Every statement accepted here runs through the instrumented executor, so
//! its timing and server warnings land in the diagnostics aggregator before
//! the response is produced.

use crate::db::MySqlExecutor;
use crate::error::{validation_error, ApiResult};
use crate::monitor::{instrument, QueryExecutor};
use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub sql: String,
}

/// Execute a statement against the monitored target
pub async fn execute_query(
    State(state): State<SharedState>,
    Json(payload): Json<QueryRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let sql = payload.sql.trim();
    if sql.is_empty() {
        return Err(validation_error("sql must not be empty"));
    }

    let executor = MySqlExecutor::acquire(&state.db_pool).await?;
    let mut executor = instrument(executor, state.monitor.clone());

    let output = executor.execute(sql).await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "columns": output.columns,
        "rows": output.rows,
        "rowCount": output.row_count,
    })))
}
