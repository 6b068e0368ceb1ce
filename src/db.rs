//! MySQL execution layer
//!
//! Concrete `QueryExecutor` over a pooled sqlx connection. Each executor owns
//! one connection for its lifetime so the `SHOW WARNINGS` follow-up runs on
//! the same session as the statement it describes.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::mysql::{MySql, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::pool::PoolConnection;
use sqlx::{Column, Row, TypeInfo};
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::monitor::interceptor::QueryExecutor;
use crate::monitor::records::RawWarning;

/// Result of one statement execution, shaped for the JSON API surface
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutput {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub row_count: usize,
}

/// Create the connection pool for the monitored target and verify it works
pub async fn connect_pool(config: &DatabaseConfig) -> Result<MySqlPool, AppError> {
    let pool = connect_pool_with_url(&config.url(), config.max_pool_size).await?;
    info!(
        "Connected to mysql://{}@{}:{}/{}",
        config.user, config.host, config.port, config.database
    );
    Ok(pool)
}

/// Pool construction from a raw URL, shared with the scanner binary
pub async fn connect_pool_with_url(url: &str, max_connections: u32) -> Result<MySqlPool, AppError> {
    let pool = MySqlPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|e| AppError::Connection(format!("Failed to connect: {}", e)))?;

    // Simple test query to verify the connection works
    sqlx::query("SELECT 1")
        .fetch_one(&pool)
        .await
        .map_err(|e| AppError::Connection(format!("Connection test failed: {}", e)))?;

    Ok(pool)
}

/// One pooled connection exposed as a query-execution capability
pub struct MySqlExecutor {
    conn: PoolConnection<MySql>,
}

impl MySqlExecutor {
    /// Check a connection out of the pool for the duration of one request
    pub async fn acquire(pool: &MySqlPool) -> Result<Self, AppError> {
        let conn = pool.acquire().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl QueryExecutor for MySqlExecutor {
    type Output = QueryOutput;

    async fn execute(&mut self, sql: &str) -> Result<QueryOutput, AppError> {
        let rows = sqlx::query(sql).fetch_all(&mut *self.conn).await?;
        Ok(rows_to_output(&rows))
    }

    async fn server_warnings(&mut self) -> Result<Vec<RawWarning>, AppError> {
        let rows = sqlx::query("SHOW WARNINGS")
            .fetch_all(&mut *self.conn)
            .await?;

        rows.iter().map(row_to_warning).collect()
    }
}

fn row_to_warning(row: &MySqlRow) -> Result<RawWarning, AppError> {
    Ok(RawWarning {
        level: row.try_get("Level")?,
        code: warning_code(row)?,
        message: row.try_get("Message")?,
    })
}

/// The Code column's signedness differs across server versions; accept both
fn warning_code(row: &MySqlRow) -> Result<u32, AppError> {
    if let Ok(code) = row.try_get::<u64, _>("Code") {
        return Ok(code as u32);
    }
    let code: i64 = row.try_get("Code")?;
    Ok(code as u32)
}

fn rows_to_output(rows: &[MySqlRow]) -> QueryOutput {
    let columns: Vec<String> = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();

    let converted: Vec<Vec<serde_json::Value>> = rows
        .iter()
        .map(|row| {
            (0..row.columns().len())
                .map(|i| column_value(row, i))
                .collect()
        })
        .collect();

    QueryOutput {
        columns,
        row_count: converted.len(),
        rows: converted,
    }
}

/// Convert one cell into a JSON value based on the column's declared type.
/// Unknown types fall back to a string decode and finally to null.
fn column_value(row: &MySqlRow, index: usize) -> serde_json::Value {
    use serde_json::Value;

    let type_name = row.column(index).type_info().name();

    match type_name {
        "BOOLEAN" => row
            .try_get::<Option<bool>, _>(index)
            .map(|v| v.map(Value::Bool).unwrap_or(Value::Null))
            .unwrap_or(Value::Null),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR" => row
            .try_get::<Option<i64>, _>(index)
            .map(|v| v.map(Value::from).unwrap_or(Value::Null))
            .unwrap_or(Value::Null),
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row
            .try_get::<Option<u64>, _>(index)
            .map(|v| v.map(Value::from).unwrap_or(Value::Null))
            .unwrap_or(Value::Null),
        "FLOAT" => row
            .try_get::<Option<f32>, _>(index)
            .map(|v| v.map(|f| Value::from(f as f64)).unwrap_or(Value::Null))
            .unwrap_or(Value::Null),
        "DOUBLE" => row
            .try_get::<Option<f64>, _>(index)
            .map(|v| v.map(Value::from).unwrap_or(Value::Null))
            .unwrap_or(Value::Null),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)
            .map(|v| v.map(|d| Value::String(d.to_string())).unwrap_or(Value::Null))
            .unwrap_or(Value::Null),
        "TIME" => row
            .try_get::<Option<chrono::NaiveTime>, _>(index)
            .map(|v| v.map(|t| Value::String(t.to_string())).unwrap_or(Value::Null))
            .unwrap_or(Value::Null),
        "DATETIME" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(index)
            .map(|v| v.map(|dt| Value::String(dt.to_string())).unwrap_or(Value::Null))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index)
            .map(|v| v.map(|ts| Value::String(ts.to_rfc3339())).unwrap_or(Value::Null))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<Option<String>, _>(index)
            .map(|v| v.map(Value::String).unwrap_or(Value::Null))
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_output_wire_shape() {
        let output = QueryOutput {
            columns: vec!["id".to_string()],
            rows: vec![vec![serde_json::Value::from(1)]],
            row_count: 1,
        };

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["columns"][0], "id");
        assert_eq!(value["rowCount"], 1);
        assert_eq!(value["rows"][0][0], 1);
    }

    #[test]
    fn test_empty_result_set_has_no_columns() {
        let output = rows_to_output(&[]);
        assert!(output.columns.is_empty());
        assert_eq!(output.row_count, 0);
    }
}
