//! Schema padding-sensitivity scanner
//!
//! Walks every string-typed column of a target schema via the metadata
//! catalog and counts values whose trailing whitespace would change
//! comparison semantics under a NO PAD collation. Read-only by design:
//! remediation statements are reported, never executed.

pub mod padding;
pub mod report;

pub use padding::{PaddingScanner, DEFAULT_SAMPLE_LIMIT};
pub use report::{ColumnScanFailure, ColumnScanResult, SampleRow, ScanReport};
