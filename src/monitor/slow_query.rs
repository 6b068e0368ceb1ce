//! Slow query tracking
//!
//! Pure decision: a query is recorded iff its duration is strictly greater
//! than the threshold. Equal durations are never recorded.

use chrono::Utc;

use crate::monitor::records::SlowQueryRecord;

/// Build a record when `duration_ms` exceeds `threshold_ms`
pub fn maybe_record(query: &str, duration_ms: u64, threshold_ms: u64) -> Option<SlowQueryRecord> {
    if duration_ms > threshold_ms {
        Some(SlowQueryRecord {
            timestamp: Utc::now(),
            query: query.to_string(),
            duration_ms,
        })
    } else {
        None
    }
}
