//! Error types for Outlay

use thiserror::Error;

/// Structural problems that abort a whole statement load.
///
/// Every variant carries the columns actually present so an operator can see
/// why detection failed without opening the file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error(
        "No date column found. Columns present: [{}]. Expected one of: [{}]",
        .found.join(", "),
        .expected.join(", ")
    )]
    NoDateColumn {
        found: Vec<String>,
        expected: Vec<String>,
    },

    #[error(
        "No usable amount columns found. Columns present: [{}]. Expected one of: {}",
        .found.join(", "),
        .expected.join("; ")
    )]
    NoAmountPattern {
        found: Vec<String>,
        expected: Vec<String>,
    },

    #[error("Statement has no data rows below the header. Columns present: [{}]", .found.join(", "))]
    NoDataRows { found: Vec<String> },
}

/// Problems local to a single row. These never abort a load: the row is
/// skipped and counted in the mapping summary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("unparseable date '{0}'")]
    UnparseableDate(String),

    #[error("non-numeric amount '{0}'")]
    NonNumericAmount(String),

    #[error("cannot tell debit from credit for type '{0}'")]
    UndeterminedDirection(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported statement format: {0}")]
    Format(#[from] FormatError),

    #[error(
        "No valid transactions found: all {rows_skipped} data rows were rejected. \
         The detected column mapping is probably wrong for this file"
    )]
    EmptyResult { rows_skipped: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Session store error: {0}")]
    Storage(String),
}

impl Error {
    /// True for errors caused by the uploaded file rather than the system
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Format(_) | Self::EmptyResult { .. } | Self::Csv(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
