//! Outlay Core Library
//!
//! Shared functionality for the Outlay statement analyzer:
//! - Header row location for exports with banner rows
//! - Column schema inference (date, description, amount patterns)
//! - Ledger normalization into signed transactions
//! - Subscription and overspending detection
//! - Session-scoped ledger storage (in-memory and SQLite)

pub mod db;
pub mod detect;
pub mod error;
pub mod header;
pub mod import;
pub mod models;
pub mod schema;
pub mod store;

/// Ledger builders shared by the server and CLI tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use db::Database;
pub use detect::{detect_overspending, detect_subscriptions, DetectionConfig};
pub use error::{Error, FormatError, Result, RowError};
pub use header::locate_header_row;
pub use import::{normalize, normalize_bytes, preview, NormalizedLedger, Preview};
pub use models::{
    Frequency, MappingSummary, OverspendingRecord, OverspendingSummary, SessionId,
    SpendingStatus, SubscriptionRecord, Transaction, YearMonth,
};
pub use schema::{infer_schema, AmountRepresentation, Column, ColumnSchema};
pub use store::{LedgerStore, MemoryStore};
