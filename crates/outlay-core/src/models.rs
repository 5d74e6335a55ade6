//! Domain models for Outlay

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Description used when the statement has no description column at all
pub const NO_DESCRIPTION_COLUMN: &str = "TRANSACTION";

/// Description used when the column exists but the cell is empty
pub const EMPTY_DESCRIPTION: &str = "UNKNOWN";

/// Whether a description is one of the normalizer's placeholders
pub fn is_placeholder_description(description: &str) -> bool {
    description == NO_DESCRIPTION_COLUMN || description == EMPTY_DESCRIPTION
}

/// A canonical ledger record
///
/// `amount` is negative for money leaving the account and positive for money
/// entering it, whatever representation the source file used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
}

impl Transaction {
    pub fn new(date: NaiveDate, description: impl Into<String>, amount: f64) -> Self {
        Self {
            date,
            description: description.into(),
            amount,
        }
    }

    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }
}

/// Recurrence bucket for a detected subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "WEEKLY",
            Self::Monthly => "MONTHLY",
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WEEKLY" => Ok(Self::Weekly),
            "MONTHLY" => Ok(Self::Monthly),
            _ => Err(format!("Unknown frequency: {}", s)),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurring charge found in a ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub description: String,
    /// Charged amount (always negative)
    pub amount: f64,
    pub frequency: Frequency,
    /// Mean days between charges, rounded to one decimal
    pub avg_gap_days: f64,
    pub occurrences: usize,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
}

/// A calendar month, ordered chronologically and rendered as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month: {}", s))?;
        let year: i32 = year.parse().map_err(|_| format!("Invalid year: {}", s))?;
        let month: u32 = month.parse().map_err(|_| format!("Invalid month: {}", s))?;
        if !(1..=12).contains(&month) {
            return Err(format!("Month out of range: {}", s));
        }
        Ok(Self { year, month })
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Classification of a month against its trailing baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpendingStatus {
    Overspending,
    Normal,
}

impl SpendingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overspending => "OVERSPENDING",
            Self::Normal => "NORMAL",
        }
    }
}

impl std::fmt::Display for SpendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One analysed month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverspendingRecord {
    pub month: YearMonth,
    /// Total expenses for the month (positive)
    pub spending: f64,
    /// Mean of all earlier months
    pub avg_spending: f64,
    /// Sample standard deviation of all earlier months (after the floor is applied)
    pub std_spending: f64,
    pub pct_deviation: f64,
    pub status: SpendingStatus,
    /// `spending - avg_spending`, only for overspending months
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excess: Option<f64>,
}

/// Counts over a set of analysed months
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverspendingSummary {
    pub total_analyzed: usize,
    pub overspending_count: usize,
    pub normal_count: usize,
}

impl OverspendingSummary {
    pub fn from_records(records: &[OverspendingRecord]) -> Self {
        let overspending_count = records
            .iter()
            .filter(|r| r.status == SpendingStatus::Overspending)
            .count();
        Self {
            total_analyzed: records.len(),
            overspending_count,
            normal_count: records.len() - overspending_count,
        }
    }
}

/// Which column played which role in a load, and how many rows were dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingSummary {
    /// Zero-based row index where the column headers were found
    pub header_row: usize,
    pub date_column: String,
    pub description_column: Option<String>,
    pub amount_pattern: String,
    pub day_first: bool,
    pub rows_loaded: usize,
    pub rows_skipped: usize,
}

/// Opaque identifier for one analytic session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh identifier from the clock and a process-local counter
    pub fn generate() -> Self {
        use sha2::{Digest, Sha256};
        use std::sync::atomic::{AtomicU64, Ordering};
        use std::time::{SystemTime, UNIX_EPOCH};

        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut hasher = Sha256::new();
        hasher.update(timestamp.to_le_bytes());
        hasher.update(COUNTER.fetch_add(1, Ordering::SeqCst).to_le_bytes());
        hasher.update(std::process::id().to_le_bytes());
        Self(hex::encode(&hasher.finalize()[..16]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.trim().to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s.trim().to_string())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
