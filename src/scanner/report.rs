//! Scan report types and rendering
//!
//! A report carries only columns with nonzero hits; clean columns count
//! toward the scan totals but are omitted from the result list.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use uuid::Uuid;

use crate::scanner::padding::{padding_predicate, qualified_name, quote_ident};

/// One offending row, bounded by the sample limit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleRow {
    /// Primary-key value when the table has a single-column primary key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_id: Option<String>,
    pub value: String,
    /// Character count; differs from byte_length only for multi-byte content
    pub char_length: i64,
    pub byte_length: i64,
}

/// Nonzero scan outcome for one (table, column) pair
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnScanResult {
    pub table: String,
    pub column: String,
    /// Non-null row count at scan time
    pub total_rows: i64,
    /// Rows whose trimmed value differs from the stored value
    pub padded_rows: i64,
    pub samples: Vec<SampleRow>,
}

/// A column whose scan query failed; distinct from a zero-hit result
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnScanFailure {
    pub table: String,
    /// "*" when the table's column enumeration itself failed
    pub column: String,
    pub error: String,
}

/// Complete output of one scanner run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub id: Uuid,
    pub schema: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tables_scanned: usize,
    pub columns_scanned: usize,
    /// Sum of padded_rows across all results
    pub total_affected_rows: i64,
    pub results: Vec<ColumnScanResult>,
    pub failures: Vec<ColumnScanFailure>,
    /// True when the run was interrupted; prior results remain valid
    pub cancelled: bool,
    /// Fingerprint of the scanned (table, column) set, for drift detection
    /// between runs
    pub schema_fingerprint: String,
}

impl ScanReport {
    /// A clean scan: nothing found and nothing failed
    pub fn is_clean(&self) -> bool {
        self.results.is_empty() && self.failures.is_empty()
    }

    /// Ready-to-review UPDATE statements, one per affected column.
    /// Never executed by the scanner itself.
    pub fn remediation_statements(&self) -> Vec<String> {
        self.results
            .iter()
            .filter_map(|r| {
                let table = qualified_name(&self.schema, &r.table).ok()?;
                let column = quote_ident(&r.column).ok()?;
                Some(format!(
                    "UPDATE {table} SET {column} = TRIM({column}) WHERE {};",
                    padding_predicate(&column)
                ))
            })
            .collect()
    }

    /// Compute a stable fingerprint over the scanned (table, column) set
    pub fn compute_fingerprint(columns: &[(String, String)]) -> String {
        let mut names: Vec<String> = columns
            .iter()
            .map(|(table, column)| format!("{}.{}", table, column))
            .collect();
        names.sort();

        let mut hasher = Sha256::new();
        for name in &names {
            hasher.update(name.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    /// Human-readable breakdown for the CLI
    pub fn render(&self) -> String {
        let mut out = String::new();
        let elapsed = self.finished_at - self.started_at;

        let _ = writeln!(
            out,
            "Padding scan of schema '{}' ({} tables, {} string columns, {}.{:03}s)",
            self.schema,
            self.tables_scanned,
            self.columns_scanned,
            elapsed.num_seconds(),
            elapsed.num_milliseconds().rem_euclid(1000),
        );
        if self.cancelled {
            let _ = writeln!(out, "NOTE: scan cancelled early; report is partial");
        }

        if self.results.is_empty() {
            let _ = writeln!(out, "No padding-sensitive values found.");
        } else {
            let _ = writeln!(
                out,
                "{} affected column(s), {} affected row(s):",
                self.results.len(),
                self.total_affected_rows
            );
            for result in &self.results {
                let _ = writeln!(
                    out,
                    "  {}.{}: {} of {} non-null rows carry padding",
                    result.table, result.column, result.padded_rows, result.total_rows
                );
                for sample in &result.samples {
                    let row_id = sample.row_id.as_deref().unwrap_or("?");
                    let _ = writeln!(
                        out,
                        "    [{}] {:?} (chars {}, bytes {})",
                        row_id, sample.value, sample.char_length, sample.byte_length
                    );
                }
            }
        }

        if !self.failures.is_empty() {
            let _ = writeln!(out, "{} column(s) could not be scanned:", self.failures.len());
            for failure in &self.failures {
                let _ = writeln!(out, "  {}.{}: {}", failure.table, failure.column, failure.error);
            }
        }

        let statements = self.remediation_statements();
        if !statements.is_empty() {
            let _ = writeln!(out, "Suggested remediation (review before running):");
            for statement in statements {
                let _ = writeln!(out, "  {}", statement);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn report_with(results: Vec<ColumnScanResult>, failures: Vec<ColumnScanFailure>) -> ScanReport {
        let total_affected_rows = results.iter().map(|r| r.padded_rows).sum();
        let now = Utc::now();
        ScanReport {
            id: Uuid::new_v4(),
            schema: "shop".to_string(),
            started_at: now,
            finished_at: now,
            tables_scanned: 2,
            columns_scanned: 5,
            total_affected_rows,
            results,
            failures,
            cancelled: false,
            schema_fingerprint: "deadbeef".to_string(),
        }
    }

    fn result(table: &str, column: &str, total: i64, padded: i64) -> ColumnScanResult {
        ColumnScanResult {
            table: table.to_string(),
            column: column.to_string(),
            total_rows: total,
            padded_rows: padded,
            samples: vec![],
        }
    }

    #[test]
    fn test_clean_report_has_no_remediation() {
        let report = report_with(vec![], vec![]);
        assert!(report.is_clean());
        assert!(report.remediation_statements().is_empty());
    }

    #[test]
    fn test_remediation_statement_shape() {
        let report = report_with(vec![result("orders", "customer_name", 10, 3)], vec![]);
        let statements = report.remediation_statements();
        assert_eq!(statements.len(), 1);
        assert_eq!(
            statements[0],
            "UPDATE `shop`.`orders` SET `customer_name` = TRIM(`customer_name`) \
             WHERE CHAR_LENGTH(`customer_name`) <> CHAR_LENGTH(TRIM(`customer_name`));"
        );
    }

    #[test]
    fn test_failures_alone_are_not_clean() {
        let report = report_with(
            vec![],
            vec![ColumnScanFailure {
                table: "orders".to_string(),
                column: "notes".to_string(),
                error: "permission denied".to_string(),
            }],
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn test_total_affected_rows_sums_results() {
        let report = report_with(
            vec![result("orders", "name", 10, 3), result("users", "email", 4, 1)],
            vec![],
        );
        assert_eq!(report.total_affected_rows, 4);
    }

    #[test]
    fn test_fingerprint_is_order_insensitive() {
        let a = ScanReport::compute_fingerprint(&[
            ("orders".to_string(), "name".to_string()),
            ("users".to_string(), "email".to_string()),
        ]);
        let b = ScanReport::compute_fingerprint(&[
            ("users".to_string(), "email".to_string()),
            ("orders".to_string(), "name".to_string()),
        ]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_changes_with_column_set() {
        let a = ScanReport::compute_fingerprint(&[("orders".to_string(), "name".to_string())]);
        let b = ScanReport::compute_fingerprint(&[("orders".to_string(), "notes".to_string())]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_render_mentions_failures_and_samples() {
        let mut affected = result("orders", "customer_name", 10, 1);
        affected.samples.push(SampleRow {
            row_id: Some("17".to_string()),
            value: "Alice ".to_string(),
            char_length: 6,
            byte_length: 6,
        });
        let report = report_with(
            vec![affected],
            vec![ColumnScanFailure {
                table: "orders".to_string(),
                column: "notes".to_string(),
                error: "permission denied".to_string(),
            }],
        );

        let rendered = report.render();
        assert!(rendered.contains("orders.customer_name"));
        assert!(rendered.contains("[17]"));
        assert!(rendered.contains("orders.notes: permission denied"));
        assert!(rendered.contains("Suggested remediation"));
    }
}
