//! Padding-symptom scanner
//!
//! Metadata-driven: tables and columns are enumerated from
//! information_schema, and only those enumerated names are ever interpolated
//! into scan SQL, after validation against a strict identifier pattern.
//! Caller input never reaches query text.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::scanner::report::{ColumnScanFailure, ColumnScanResult, SampleRow, ScanReport};

/// Bounded number of offending rows fetched per affected column
pub const DEFAULT_SAMPLE_LIMIT: usize = 5;

/// Character/text family types subject to NO PAD semantics
const STRING_DATA_TYPES: &str = "'char','varchar','tinytext','text','mediumtext','longtext'";

static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_$]+$").expect("valid regex"));

/// Backtick-quote an identifier enumerated from the metadata catalog.
/// Anything outside the allow-list pattern is rejected outright.
pub(crate) fn quote_ident(name: &str) -> Result<String, AppError> {
    if IDENT_RE.is_match(name) {
        Ok(format!("`{}`", name))
    } else {
        Err(AppError::Validation(format!(
            "Unsafe identifier rejected: {:?}",
            name
        )))
    }
}

/// `schema`.`table`
pub(crate) fn qualified_name(schema: &str, table: &str) -> Result<String, AppError> {
    Ok(format!("{}.{}", quote_ident(schema)?, quote_ident(table)?))
}

/// Rows whose trimmed value differs from the stored value. PAD SPACE
/// collations compare 'abc ' equal to 'abc', so the predicate compares
/// character lengths instead of the values themselves.
pub(crate) fn padding_predicate(quoted_column: &str) -> String {
    format!(
        "CHAR_LENGTH({col}) <> CHAR_LENGTH(TRIM({col}))",
        col = quoted_column
    )
}

fn build_count_sql(schema: &str, table: &str, column: &str) -> Result<String, AppError> {
    let table = qualified_name(schema, table)?;
    let column = quote_ident(column)?;
    Ok(format!(
        "SELECT COUNT({col}) AS total_rows, \
         COUNT(CASE WHEN {pred} THEN 1 END) AS padded_rows \
         FROM {table}",
        col = column,
        pred = padding_predicate(&column),
        table = table,
    ))
}

fn build_sample_sql(
    schema: &str,
    table: &str,
    column: &str,
    primary_key: Option<&str>,
    limit: usize,
) -> Result<String, AppError> {
    let table = qualified_name(schema, table)?;
    let column = quote_ident(column)?;

    let row_id = match primary_key {
        Some(pk) => format!("CAST({} AS CHAR) AS row_id, ", quote_ident(pk)?),
        None => String::new(),
    };

    Ok(format!(
        "SELECT {row_id}{col} AS value, \
         CHAR_LENGTH({col}) AS char_len, LENGTH({col}) AS byte_len \
         FROM {table} WHERE {pred} LIMIT {limit}",
        row_id = row_id,
        col = column,
        pred = padding_predicate(&column),
        table = table,
        limit = limit,
    ))
}

/// Sequential batch scanner over one target schema.
///
/// Uses its own pool and shares no state with live interception; columns are
/// scanned independently, so one failing column never aborts the rest.
pub struct PaddingScanner {
    pool: MySqlPool,
    schema: String,
    sample_limit: usize,
    cancelled: Arc<AtomicBool>,
}

impl PaddingScanner {
    pub fn new(pool: MySqlPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Override the per-column sample bound; 0 disables sampling
    pub fn with_sample_limit(mut self, limit: usize) -> Self {
        self.sample_limit = limit;
        self
    }

    /// Handle for requesting cancellation; checked between columns
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    /// Run the full scan. Fails only when the schema itself cannot be
    /// enumerated; per-column errors become failure entries in the report.
    pub async fn scan(&self) -> Result<ScanReport, AppError> {
        let started_at = Utc::now();
        let tables = self.list_tables().await?;
        info!(
            schema = %self.schema,
            tables = tables.len(),
            "starting padding scan"
        );

        let mut results = Vec::new();
        let mut failures = Vec::new();
        let mut scanned_columns: Vec<(String, String)> = Vec::new();
        let mut cancelled = false;

        'tables: for table in &tables {
            let columns = match self.string_columns(table).await {
                Ok(columns) => columns,
                Err(e) => {
                    warn!(table = %table, "column enumeration failed: {}", e);
                    failures.push(ColumnScanFailure {
                        table: table.clone(),
                        column: "*".to_string(),
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            for column in columns {
                if self.cancelled.load(Ordering::Relaxed) {
                    cancelled = true;
                    info!("cancellation requested; returning partial report");
                    break 'tables;
                }

                debug!(table = %table, column = %column, "scanning column");
                scanned_columns.push((table.clone(), column.clone()));

                match self.scan_column(table, &column).await {
                    Ok(Some(result)) => {
                        info!(
                            table = %table,
                            column = %column,
                            padded_rows = result.padded_rows,
                            "padding symptom found"
                        );
                        results.push(result);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(table = %table, column = %column, "column scan failed: {}", e);
                        failures.push(ColumnScanFailure {
                            table: table.clone(),
                            column: column.clone(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        let total_affected_rows = results.iter().map(|r| r.padded_rows).sum();
        Ok(ScanReport {
            id: Uuid::new_v4(),
            schema: self.schema.clone(),
            started_at,
            finished_at: Utc::now(),
            tables_scanned: tables.len(),
            columns_scanned: scanned_columns.len(),
            total_affected_rows,
            results,
            failures,
            cancelled,
            schema_fingerprint: ScanReport::compute_fingerprint(&scanned_columns),
        })
    }

    /// Base tables of the target schema
    async fn list_tables(&self) -> Result<Vec<String>, AppError> {
        let tables = sqlx::query_scalar::<_, String>(
            "SELECT TABLE_NAME FROM information_schema.TABLES \
             WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE' \
             ORDER BY TABLE_NAME",
        )
        .bind(&self.schema)
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    /// Columns of the char/text family for one table
    async fn string_columns(&self, table: &str) -> Result<Vec<String>, AppError> {
        let sql = format!(
            "SELECT COLUMN_NAME FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
             AND DATA_TYPE IN ({}) \
             ORDER BY ORDINAL_POSITION",
            STRING_DATA_TYPES
        );

        let columns = sqlx::query_scalar::<_, String>(&sql)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await?;

        Ok(columns)
    }

    /// The table's primary key column, only when it is a single column
    async fn single_primary_key(&self, table: &str) -> Result<Option<String>, AppError> {
        let mut keys = sqlx::query_scalar::<_, String>(
            "SELECT COLUMN_NAME FROM information_schema.COLUMNS \
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_KEY = 'PRI' \
             ORDER BY ORDINAL_POSITION",
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        if keys.len() == 1 {
            Ok(Some(keys.remove(0)))
        } else {
            Ok(None)
        }
    }

    /// Count padded rows in one column; None when the column is clean
    async fn scan_column(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnScanResult>, AppError> {
        let sql = build_count_sql(&self.schema, table, column)?;
        let row = sqlx::query(&sql).fetch_one(&self.pool).await?;

        let total_rows: i64 = row.try_get("total_rows")?;
        let padded_rows: i64 = row.try_get("padded_rows")?;

        if padded_rows == 0 {
            return Ok(None);
        }

        let samples = if self.sample_limit > 0 {
            match self.fetch_samples(table, column).await {
                Ok(samples) => samples,
                Err(e) => {
                    // The count stands on its own; sampling is best-effort
                    warn!(table = %table, column = %column, "sample fetch failed: {}", e);
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        Ok(Some(ColumnScanResult {
            table: table.to_string(),
            column: column.to_string(),
            total_rows,
            padded_rows,
            samples,
        }))
    }

    /// Bounded sample of offending rows with char/byte lengths, so multi-byte
    /// encoding effects can be told apart from true padding
    async fn fetch_samples(&self, table: &str, column: &str) -> Result<Vec<SampleRow>, AppError> {
        let primary_key = self.single_primary_key(table).await?;
        let sql = build_sample_sql(
            &self.schema,
            table,
            column,
            primary_key.as_deref(),
            self.sample_limit,
        )?;

        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| {
                Ok(SampleRow {
                    row_id: row.try_get::<Option<String>, _>("row_id").unwrap_or(None),
                    value: row.try_get("value")?,
                    char_length: row.try_get("char_len")?,
                    byte_length: row.try_get("byte_len")?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_ident_accepts_catalog_names() {
        assert_eq!(quote_ident("orders").unwrap(), "`orders`");
        assert_eq!(quote_ident("customer_name2").unwrap(), "`customer_name2`");
        assert_eq!(quote_ident("tmp$col").unwrap(), "`tmp$col`");
    }

    #[test]
    fn test_quote_ident_rejects_structural_injection() {
        for name in ["", "a`b", "a;DROP TABLE users", "a b", "a.b", "a--", "naïve"] {
            assert!(quote_ident(name).is_err(), "{:?} should be rejected", name);
        }
    }

    #[test]
    fn test_qualified_name() {
        assert_eq!(qualified_name("shop", "orders").unwrap(), "`shop`.`orders`");
        assert!(qualified_name("shop", "or`ders").is_err());
    }

    #[test]
    fn test_count_sql_shape() {
        let sql = build_count_sql("shop", "orders", "name").unwrap();
        assert_eq!(
            sql,
            "SELECT COUNT(`name`) AS total_rows, \
             COUNT(CASE WHEN CHAR_LENGTH(`name`) <> CHAR_LENGTH(TRIM(`name`)) THEN 1 END) AS padded_rows \
             FROM `shop`.`orders`"
        );
    }

    #[test]
    fn test_sample_sql_with_primary_key() {
        let sql = build_sample_sql("shop", "orders", "name", Some("id"), 5).unwrap();
        assert_eq!(
            sql,
            "SELECT CAST(`id` AS CHAR) AS row_id, `name` AS value, \
             CHAR_LENGTH(`name`) AS char_len, LENGTH(`name`) AS byte_len \
             FROM `shop`.`orders` WHERE CHAR_LENGTH(`name`) <> CHAR_LENGTH(TRIM(`name`)) LIMIT 5"
        );
    }

    #[test]
    fn test_sample_sql_without_primary_key_omits_row_id() {
        let sql = build_sample_sql("shop", "audit_log", "detail", None, 3).unwrap();
        assert!(!sql.contains("row_id"));
        assert!(sql.ends_with("LIMIT 3"));
    }

    #[test]
    fn test_unsafe_table_name_never_reaches_sql() {
        assert!(build_count_sql("shop", "orders; --", "name").is_err());
        assert!(build_sample_sql("shop", "orders", "na`me", None, 5).is_err());
    }
}
