//! Ledger and statement builders for tests
//!
//! Enabled for this crate's own tests and, through the `test-utils` feature,
//! for the server and CLI test suites.

use chrono::{Months, NaiveDate};

use crate::models::Transaction;

/// A fixed reference date: 2024-01-01
pub fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date")
}

/// `count` charges of `amount` on the same day of consecutive months
pub fn monthly_charges(
    description: &str,
    amount: f64,
    start: NaiveDate,
    count: u32,
) -> Vec<Transaction> {
    (0..count)
        .filter_map(|i| start.checked_add_months(Months::new(i)))
        .map(|date| Transaction::new(date, description, amount))
        .collect()
}

/// `count` charges of `amount` exactly seven days apart
pub fn weekly_charges(
    description: &str,
    amount: f64,
    start: NaiveDate,
    count: u32,
) -> Vec<Transaction> {
    (0..count)
        .map(|i| start + chrono::Duration::days(7 * i as i64))
        .map(|date| Transaction::new(date, description, amount))
        .collect()
}

/// One expense per month totalling each value in `totals`, starting January 2024
pub fn monthly_spending_ledger(totals: &[f64]) -> Vec<Transaction> {
    totals
        .iter()
        .enumerate()
        .filter_map(|(i, &total)| {
            let month = base_date().checked_add_months(Months::new(i as u32))?;
            let date = month + chrono::Duration::days(9);
            Some(Transaction::new(date, "GROCERIES", -total))
        })
        .collect()
}

/// Render a ledger as a simple `Date,Description,Amount` statement (day-first dates)
pub fn signed_amount_csv(ledger: &[Transaction]) -> String {
    let mut csv = String::from("Date,Description,Amount\n");
    for tx in ledger {
        csv.push_str(&format!(
            "{},{},{:.2}\n",
            tx.date.format("%d/%m/%Y"),
            tx.description,
            tx.amount
        ));
    }
    csv
}

/// Render a ledger as a banner-prefixed debit/credit statement (day-first dates)
pub fn debit_credit_csv(ledger: &[Transaction]) -> String {
    let mut csv = String::from(
        "Example Bank Ltd,,,\n\
         Account statement,,,\n\
         Txn Date,Narration,Withdrawal Amt,Deposit Amt\n",
    );
    for tx in ledger {
        let (debit, credit) = if tx.amount < 0.0 {
            (format!("{:.2}", -tx.amount), String::new())
        } else {
            (String::new(), format!("{:.2}", tx.amount))
        };
        csv.push_str(&format!(
            "{},{},{},{}\n",
            tx.date.format("%d/%m/%Y"),
            tx.description,
            debit,
            credit
        ));
    }
    csv
}
