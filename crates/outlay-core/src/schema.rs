//! Column schema inference
//!
//! Maps bank-specific column names onto the three canonical roles (date,
//! description, signed amount). Column names are normalized before matching,
//! so `"Txn Date"`, `"txn_date"` and `"TXN-DATE"` are the same column.
//!
//! Each role has an ordered alias table. Within a table, earlier aliases win:
//! a file with both `Transaction Date` and `Post Date` uses the former.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FormatError, Result};

/// Number of date cells sampled for day/month order inference
pub const DATE_SAMPLE_SIZE: usize = 10;

/// Canonical role a statement column can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Date,
    Description,
    /// Debit/credit indicator column (`Dr/Cr`, `Type`)
    TypeTag,
    /// Unsigned amount paired with a type indicator
    TaggedAmount,
    Debit,
    Credit,
    SignedAmount,
}

impl Role {
    /// Normalized column names for this role, highest priority first
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Date => &[
                "date",
                "transactiondate",
                "txndate",
                "postingdate",
                "valuedate",
                "transdate",
                "postdate",
                "bookingdate",
            ],
            Self::Description => &[
                "description",
                "name",
                "narration",
                "merchant",
                "details",
                "particulars",
                "transactiondescription",
                "transactiondetails",
                "payee",
                "remarks",
            ],
            Self::TypeTag => &["drcr", "type", "transactiontype", "txntype", "crdr"],
            Self::TaggedAmount => &["amount", "amt", "value", "transactionamount"],
            Self::Debit => &[
                "debit",
                "withdrawal",
                "debitamount",
                "dr",
                "withdrawalamount",
                "withdrawalamt",
                "withdrawals",
                "debits",
                "moneyout",
                "paidout",
            ],
            Self::Credit => &[
                "credit",
                "deposit",
                "creditamount",
                "cr",
                "depositamount",
                "depositamt",
                "deposits",
                "credits",
                "moneyin",
                "paidin",
            ],
            Self::SignedAmount => &["amount", "amt", "value", "transactionamount", "balance"],
        }
    }
}

/// Human-readable shapes listed when no amount pattern matches
const EXPECTED_AMOUNT_SHAPES: &[&str] = &[
    "a type/indicator column plus an amount column (e.g. Dr/Cr + Amount)",
    "separate debit and credit columns (e.g. Withdrawal + Deposit)",
    "a single signed amount column (e.g. Amount)",
];

/// A column identified by position and original header text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub index: usize,
    pub name: String,
}

/// How a statement encodes the direction of money movement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum AmountRepresentation {
    /// One column, negative for debits
    SignedAmount { amount: Column },
    /// Separate unsigned debit and credit columns
    DebitCredit { debit: Column, credit: Column },
    /// An unsigned amount with a DR/CR style indicator column
    TypeTagged { type_column: Column, amount: Column },
}

impl AmountRepresentation {
    /// Short description for the mapping summary
    pub fn describe(&self) -> String {
        match self {
            Self::SignedAmount { amount } => format!("Signed amount ({})", amount.name),
            Self::DebitCredit { debit, credit } => {
                format!("Debit/Credit columns ({} / {})", debit.name, credit.name)
            }
            Self::TypeTagged {
                type_column,
                amount,
            } => format!("Type-tagged amount ({} + {})", type_column.name, amount.name),
        }
    }
}

/// Inferred mapping for one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub date_column: Column,
    pub description_column: Option<Column>,
    pub amount_representation: AmountRepresentation,
    pub date_is_day_first: bool,
}

/// Lower-case, trim, and drop separators so alias matching ignores styling
pub fn normalize_column_name(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '/'))
        .collect()
}

/// Find the first column (by alias priority) that plays `role`
pub fn find_column(headers: &[String], role: Role) -> Option<Column> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_column_name(h)).collect();

    role.aliases().iter().find_map(|alias| {
        normalized
            .iter()
            .position(|name| name == alias)
            .map(|index| Column {
                index,
                name: headers[index].trim().to_string(),
            })
    })
}

/// Infer the schema from a header row and the data rows beneath it
///
/// Fails when no date column or no amount pattern can be found; a missing
/// description column is tolerated.
pub fn infer_schema(headers: &[String], rows: &[Vec<String>]) -> Result<ColumnSchema> {
    let date_column = find_column(headers, Role::Date).ok_or_else(|| FormatError::NoDateColumn {
        found: present_columns(headers),
        expected: Role::Date.aliases().iter().map(|s| s.to_string()).collect(),
    })?;

    let description_column = find_column(headers, Role::Description);
    let amount_representation = infer_amount_representation(headers)?;

    let samples = rows
        .iter()
        .filter_map(|row| row.get(date_column.index))
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .take(DATE_SAMPLE_SIZE);
    let date_is_day_first = infer_day_first(samples);

    debug!(
        date = %date_column.name,
        description = ?description_column.as_ref().map(|c| &c.name),
        amount = %amount_representation.describe(),
        day_first = date_is_day_first,
        "Inferred column schema"
    );

    Ok(ColumnSchema {
        date_column,
        description_column,
        amount_representation,
        date_is_day_first,
    })
}

/// Try the three amount patterns in priority order
fn infer_amount_representation(headers: &[String]) -> Result<AmountRepresentation> {
    if let (Some(type_column), Some(amount)) = (
        find_column(headers, Role::TypeTag),
        find_column(headers, Role::TaggedAmount),
    ) {
        return Ok(AmountRepresentation::TypeTagged {
            type_column,
            amount,
        });
    }

    if let (Some(debit), Some(credit)) = (
        find_column(headers, Role::Debit),
        find_column(headers, Role::Credit),
    ) {
        return Ok(AmountRepresentation::DebitCredit { debit, credit });
    }

    if let Some(amount) = find_column(headers, Role::SignedAmount) {
        return Ok(AmountRepresentation::SignedAmount { amount });
    }

    Err(FormatError::NoAmountPattern {
        found: present_columns(headers),
        expected: EXPECTED_AMOUNT_SHAPES.iter().map(|s| s.to_string()).collect(),
    }
    .into())
}

/// Decide day-first vs month-first from sample date strings
///
/// The first sample whose leading component exceeds 12 means day-first; one
/// whose second component exceeds 12 means month-first. Later samples are not
/// consulted. With no decisive sample the international day-first order is
/// assumed.
pub fn infer_day_first<'a>(samples: impl IntoIterator<Item = &'a str>) -> bool {
    for sample in samples.into_iter().take(DATE_SAMPLE_SIZE) {
        let parts: Vec<&str> = sample.trim().split(['/', '-']).collect();

        let first = parts.first().and_then(|p| leading_number(p));
        let second = parts.get(1).and_then(|p| leading_number(p));

        if first.is_some_and(|n| n > 12) {
            return true;
        }
        if second.is_some_and(|n| n > 12) {
            return false;
        }
    }
    true
}

fn leading_number(part: &str) -> Option<u32> {
    let digits: String = part
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn present_columns(headers: &[String]) -> Vec<String> {
    headers
        .iter()
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
        .map(|h| h.to_string())
        .collect()
}
