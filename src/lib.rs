//! CompatWatch - MySQL Upgrade Compatibility Monitor
//!
//! Two cooperating surfaces over one core:
//! - the monitor: a transparent query-interception layer that classifies
//!   server warnings (deprecations in particular), tracks slow queries and
//!   aggregates diagnostics for export (`compatwatch-api` binary);
//! - the scanner: a schema-wide padding-sensitivity batch job that walks
//!   every string column of a target schema and reports values whose
//!   trailing whitespace changes meaning under NO PAD collations
//!   (`padscan` binary).

pub mod config;
pub mod db;
pub mod error;
pub mod monitor;
pub mod routes;
pub mod scanner;
pub mod state;
