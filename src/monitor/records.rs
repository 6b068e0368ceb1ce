//! Diagnostic record types
//!
//! Immutable once created; appended to the aggregator's logs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One row of MySQL's `SHOW WARNINGS` result set
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawWarning {
    /// "Note", "Warning" or "Error"
    pub level: String,
    pub code: u32,
    pub message: String,
}

/// A server warning tied to the statement that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarningRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub code: u32,
    pub message: String,
    pub query: String,
    pub duration_ms: u64,
}

impl WarningRecord {
    pub fn new(warning: &RawWarning, query: &str, duration_ms: u64) -> Self {
        Self {
            timestamp: Utc::now(),
            level: warning.level.clone(),
            code: warning.code,
            message: warning.message.clone(),
            query: query.to_string(),
            duration_ms,
        }
    }
}

/// A query whose execution exceeded the configured threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowQueryRecord {
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub duration_ms: u64,
}
