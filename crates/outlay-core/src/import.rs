//! Ledger normalization for arbitrary bank statement CSVs
//!
//! The pipeline is: read the raw table with no header assumption, locate the
//! header row, infer the column schema, then fold the remaining rows into
//! canonical [`Transaction`]s. Bad rows are skipped and counted; only
//! file-level problems abort the load.

use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Read;
use tracing::{debug, info};

use crate::error::{Error, FormatError, Result, RowError};
use crate::header::locate_header_row;
use crate::models::{MappingSummary, Transaction, EMPTY_DESCRIPTION, NO_DESCRIPTION_COLUMN};
use crate::schema::{infer_schema, AmountRepresentation, ColumnSchema};

/// Rows of trimmed cell text, as read from the file
pub type RawTable = Vec<Vec<String>>;

/// Default number of sample rows in a preview
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

const DEBIT_TOKENS: &[&str] = &["DB", "DR", "D", "DEBIT", "WITHDRAWAL", "W"];
const CREDIT_TOKENS: &[&str] = &["CR", "C", "CREDIT", "DEPOSIT", "DEP"];

/// A successfully normalized statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLedger {
    pub transactions: Vec<Transaction>,
    pub summary: MappingSummary,
}

/// Accumulator for the per-row pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFold {
    pub transactions: Vec<Transaction>,
    pub skipped: usize,
}

/// First rows of a statement, for checking the mapping before an upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preview {
    pub header_row: usize,
    pub columns: Vec<String>,
    pub sample_rows: Vec<Map<String, Value>>,
    pub total_columns: usize,
    /// Inferred schema, absent when the columns cannot be mapped
    pub schema: Option<ColumnSchema>,
}

/// Read every CSV row without treating any of them as a header
pub fn read_raw_table<R: Read>(reader: R) -> Result<RawTable> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let row: Vec<String> = record
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let cell = if rows.is_empty() && i == 0 {
                    cell.trim_start_matches('\u{feff}')
                } else {
                    cell
                };
                cell.trim().to_string()
            })
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// Normalize a statement into a ledger plus its mapping summary
pub fn normalize<R: Read>(reader: R) -> Result<NormalizedLedger> {
    let table = read_raw_table(reader)?;
    normalize_table(table)
}

pub fn normalize_bytes(data: &[u8]) -> Result<NormalizedLedger> {
    normalize(data)
}

/// Normalize an already-read raw table
pub fn normalize_table(mut table: RawTable) -> Result<NormalizedLedger> {
    let header_row = locate_header_row(&table);
    let (headers, data) = split_at_header(&mut table, header_row);

    let schema = infer_schema(&headers, &data)?;

    if data.is_empty() {
        return Err(FormatError::NoDataRows {
            found: headers.into_iter().filter(|h| !h.is_empty()).collect(),
        }
        .into());
    }

    let fold = normalize_rows(&data, &schema);
    if fold.transactions.is_empty() {
        return Err(Error::EmptyResult {
            rows_skipped: fold.skipped,
        });
    }

    let summary = MappingSummary {
        header_row,
        date_column: schema.date_column.name.clone(),
        description_column: schema.description_column.as_ref().map(|c| c.name.clone()),
        amount_pattern: schema.amount_representation.describe(),
        day_first: schema.date_is_day_first,
        rows_loaded: fold.transactions.len(),
        rows_skipped: fold.skipped,
    };

    info!(
        header_row,
        loaded = summary.rows_loaded,
        skipped = summary.rows_skipped,
        pattern = %summary.amount_pattern,
        "Normalized statement"
    );

    Ok(NormalizedLedger {
        transactions: fold.transactions,
        summary,
    })
}

/// Split a table into its header row and the non-blank rows below it
fn split_at_header(table: &mut RawTable, header_row: usize) -> (Vec<String>, RawTable) {
    let mut body = table.split_off(header_row.min(table.len())).into_iter();
    let headers = body.next().unwrap_or_default();
    let data = body.filter(|row| !is_blank_row(row)).collect();
    (headers, data)
}

/// Fold data rows into transactions, counting the rows that cannot be used
pub fn normalize_rows(rows: &[Vec<String>], schema: &ColumnSchema) -> RowFold {
    rows.iter()
        .enumerate()
        .fold(RowFold::default(), |mut acc, (i, row)| {
            match normalize_row(row, schema) {
                Ok(tx) => acc.transactions.push(tx),
                Err(e) => {
                    debug!(row = i, error = %e, "Skipping row");
                    acc.skipped += 1;
                }
            }
            acc
        })
}

fn normalize_row(row: &[String], schema: &ColumnSchema) -> std::result::Result<Transaction, RowError> {
    let date_cell = cell(row, schema.date_column.index);
    let date = parse_date(date_cell, schema.date_is_day_first)
        .ok_or_else(|| RowError::UnparseableDate(date_cell.to_string()))?;

    let description = match &schema.description_column {
        None => NO_DESCRIPTION_COLUMN.to_string(),
        Some(col) => match cell(row, col.index) {
            "" => EMPTY_DESCRIPTION.to_string(),
            text => text.to_string(),
        },
    };

    let amount = resolve_amount(row, &schema.amount_representation)?;

    Ok(Transaction::new(date, description, amount))
}

/// Apply the statement's amount representation to one row
fn resolve_amount(
    row: &[String],
    representation: &AmountRepresentation,
) -> std::result::Result<f64, RowError> {
    match representation {
        AmountRepresentation::SignedAmount { amount } => {
            let raw = cell(row, amount.index);
            parse_amount(raw).ok_or_else(|| RowError::NonNumericAmount(raw.to_string()))
        }
        AmountRepresentation::DebitCredit { debit, credit } => {
            let debit = optional_amount(cell(row, debit.index))?;
            let credit = optional_amount(cell(row, credit.index))?;
            Ok(credit - debit)
        }
        AmountRepresentation::TypeTagged {
            type_column,
            amount,
        } => {
            let raw_type = cell(row, type_column.index);
            let token: String = raw_type
                .chars()
                .filter(|c| c.is_alphabetic())
                .collect::<String>()
                .to_uppercase();

            let raw = cell(row, amount.index);
            let magnitude = parse_amount(raw)
                .ok_or_else(|| RowError::NonNumericAmount(raw.to_string()))?
                .abs();

            if DEBIT_TOKENS.contains(&token.as_str()) {
                Ok(-magnitude)
            } else if CREDIT_TOKENS.contains(&token.as_str()) {
                Ok(magnitude)
            } else {
                Err(RowError::UndeterminedDirection(raw_type.to_string()))
            }
        }
    }
}

/// Debit/credit cells: blank means zero, anything else must be numeric
fn optional_amount(raw: &str) -> std::result::Result<f64, RowError> {
    if raw.is_empty() || raw == "-" {
        return Ok(0.0);
    }
    parse_amount(raw).ok_or_else(|| RowError::NonNumericAmount(raw.to_string()))
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(|s| s.trim()).unwrap_or("")
}

fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

const YEAR_FIRST_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

// Two-digit year formats come first: "%Y" would read "24" as year 24, while
// "%y" rejects four-digit years as trailing input.
const DAY_FIRST_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d-%m-%y", "%d.%m.%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y",
];

const MONTH_FIRST_FORMATS: &[&str] = &[
    "%m/%d/%y", "%m-%d-%y", "%m.%d.%y", "%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y",
];

// Same "%y" before "%Y" ordering as the numeric families
const TEXTUAL_FORMATS: &[&str] = &[
    "%d %b %y", "%d-%b-%y", "%d/%b/%y", "%b %d, %y", "%b %d %y",
    "%d %b %Y", "%d-%b-%Y", "%d/%b/%Y", "%b %d, %Y", "%b %d %Y",
];

/// Parse a statement date using the file-wide day/month convention
pub fn parse_date(s: &str, day_first: bool) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let numeric = if day_first {
        DAY_FIRST_FORMATS
    } else {
        MONTH_FIRST_FORMATS
    };

    [s, strip_time(s)].into_iter().find_map(|candidate| {
        // "%Y" would happily read "05/01/24" as year 5
        let year_first: &[&str] = if starts_with_year(candidate) {
            YEAR_FIRST_FORMATS
        } else {
            &[]
        };
        year_first
            .iter()
            .chain(numeric)
            .chain(TEXTUAL_FORMATS)
            .find_map(|fmt| NaiveDate::parse_from_str(candidate, fmt).ok())
    })
}

fn starts_with_year(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() > 4 && bytes[..4].iter().all(u8::is_ascii_digit) && !bytes[4].is_ascii_digit()
}

/// Drop a trailing time of day: `2024-01-15 10:30:00`, `2024-01-15T10:30`
fn strip_time(s: &str) -> &str {
    if let Some((date, time)) = s.rsplit_once(' ') {
        if time.contains(':') {
            return date.trim_end();
        }
    }
    if let Some((date, time)) = s.split_once('T') {
        if time.contains(':') {
            return date;
        }
    }
    s
}

/// Parse an amount cell, handling currency symbols, separators and parentheses
pub fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '£' | '€' | '₹' | ',') && !c.is_whitespace())
        .collect();

    let (negative, digits) = match cleaned
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    {
        Some(inner) => (true, inner),
        None => (false, cleaned.as_str()),
    };

    if digits.is_empty() {
        return None;
    }

    let value = digits.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if negative { -value.abs() } else { value })
}

/// Show the located header and the first `rows` data rows of a statement
pub fn preview<R: Read>(reader: R, rows: usize) -> Result<Preview> {
    let mut table = read_raw_table(reader)?;
    let header_row = locate_header_row(&table);

    let (columns, data) = split_at_header(&mut table, header_row);

    let schema = infer_schema(&columns, &data).ok();

    let sample_rows = data
        .iter()
        .take(rows)
        .map(|row| {
            columns
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), Value::String(cell(row, i).to_string())))
                .collect::<Map<String, Value>>()
        })
        .collect();

    Ok(Preview {
        header_row,
        total_columns: columns.len(),
        columns,
        sample_rows,
        schema,
    })
}
