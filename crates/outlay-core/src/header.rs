//! Header row location
//!
//! Bank exports often open with banner rows (account holder, statement
//! period, branch address) before the real column headers. We scan the top of
//! the file for the first row that looks like a header.

/// Maximum number of leading rows examined
pub const HEADER_SCAN_ROWS: usize = 20;

const DATE_KEYWORDS: &[&str] = &["date", "transaction", "txn", "posting", "value"];

const DESCRIPTION_KEYWORDS: &[&str] = &[
    "description",
    "name",
    "narration",
    "merchant",
    "details",
    "particulars",
];

const AMOUNT_KEYWORDS: &[&str] = &[
    "amount",
    "debit",
    "credit",
    "balance",
    "value",
    "withdrawal",
    "deposit",
];

/// Return the zero-based index of the row most likely to hold column headers
///
/// The first row (within the first [`HEADER_SCAN_ROWS`]) whose text matches at
/// least two of the date, description and amount vocabularies wins. Falls back
/// to row 0 when nothing qualifies.
pub fn locate_header_row(rows: &[Vec<String>]) -> usize {
    rows.iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| vocabulary_hits(row) >= 2)
        .unwrap_or(0)
}

/// Count how many keyword vocabularies a row touches
fn vocabulary_hits(row: &[String]) -> usize {
    let text = row
        .iter()
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .map(|cell| cell.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    [DATE_KEYWORDS, DESCRIPTION_KEYWORDS, AMOUNT_KEYWORDS]
        .iter()
        .filter(|vocabulary| vocabulary.iter().any(|kw| text.contains(kw)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&[&str]]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|cells| cells.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_header_on_first_row() {
        let table = rows(&[
            &["Date", "Description", "Amount"],
            &["01/02/2024", "Coffee", "-3.50"],
        ]);
        assert_eq!(locate_header_row(&table), 0);
    }

    #[test]
    fn test_header_below_banner_rows() {
        let table = rows(&[
            &["HDFC Bank Ltd", "", ""],
            &["Statement for account 0012345", "", ""],
            &["Txn Date", "Narration", "Withdrawal Amt", "Deposit Amt"],
            &["01/02/2024", "UPI-SWIGGY", "250.00", ""],
        ]);
        assert_eq!(locate_header_row(&table), 2);
    }

    #[test]
    fn test_single_vocabulary_is_not_enough() {
        // "Statement balance" only hits the amount vocabulary
        let table = rows(&[
            &["Statement balance", "1200.00"],
            &["Posting Date", "Details", "Debit", "Credit"],
        ]);
        assert_eq!(locate_header_row(&table), 1);
    }

    #[test]
    fn test_falls_back_to_first_row() {
        let table = rows(&[&["foo", "bar"], &["1", "2"]]);
        assert_eq!(locate_header_row(&table), 0);
        assert_eq!(locate_header_row(&[]), 0);
    }

    #[test]
    fn test_scan_window_is_bounded() {
        let mut table: Vec<Vec<String>> = (0..HEADER_SCAN_ROWS)
            .map(|i| vec![format!("banner {}", i)])
            .collect();
        table.push(vec!["Date".into(), "Description".into(), "Amount".into()]);
        assert_eq!(locate_header_row(&table), 0);
    }

    #[test]
    fn test_idempotent() {
        let table = rows(&[
            &["Account summary"],
            &["Value Date", "Particulars", "Dr/Cr", "Amount"],
        ]);
        assert_eq!(locate_header_row(&table), locate_header_row(&table));
    }
}
