//! Detection commands: one-shot analysis and per-session detectors

use std::path::Path;

use anyhow::{Context, Result};
use outlay_core::{
    db::Database, detect_overspending, detect_subscriptions, MappingSummary, OverspendingRecord,
    OverspendingSummary, SpendingStatus, SubscriptionRecord, Transaction,
};

use super::{parse_session, read_statement, truncate};

/// Normalize a statement and run both detectors in memory
pub fn cmd_analyze(file: &Path, json: bool) -> Result<()> {
    let ledger = read_statement(file)?;
    let subscriptions = detect_subscriptions(&ledger.transactions);
    let months = detect_overspending(&ledger.transactions);
    let summary = OverspendingSummary::from_records(&months);

    if json {
        let output = serde_json::json!({
            "mapping_info": ledger.summary,
            "transactions_loaded": ledger.transactions.len(),
            "subscriptions": subscriptions,
            "overspending": {
                "summary": summary,
                "months": months,
            },
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("📊 Analysis of {}", file.display());
    print_mapping(&ledger.summary);
    print_subscriptions(&subscriptions);
    print_overspending(&months, &summary);
    Ok(())
}

/// Detect subscriptions for a stored session and persist the result
pub fn cmd_subscriptions(db: &Database, session: &str, json: bool) -> Result<()> {
    let session = parse_session(session)?;
    let ledger = stored_ledger(db, &session)?;

    let subscriptions = detect_subscriptions(&ledger);
    db.replace_subscriptions(&session, &subscriptions)
        .context("Failed to store subscriptions")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&subscriptions)?);
    } else {
        print_subscriptions(&subscriptions);
    }
    Ok(())
}

/// Classify the months of a stored session
pub fn cmd_overspending(db: &Database, session: &str, json: bool) -> Result<()> {
    let session = parse_session(session)?;
    let ledger = stored_ledger(db, &session)?;

    let months = detect_overspending(&ledger);
    let summary = OverspendingSummary::from_records(&months);

    if json {
        let output = serde_json::json!({ "summary": summary, "months": months });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_overspending(&months, &summary);
    }
    Ok(())
}

fn stored_ledger(db: &Database, session: &outlay_core::SessionId) -> Result<Vec<Transaction>> {
    db.load_ledger(session)
        .with_context(|| format!("Session not found: {}", session))?
        .ok_or_else(|| anyhow::anyhow!("No statement has been imported for session {}", session))
}

pub(crate) fn print_mapping(summary: &MappingSummary) {
    println!();
    println!("🗂  Column Mapping");
    println!("   Header row:   {}", summary.header_row);
    println!("   Date:         {}", summary.date_column);
    println!(
        "   Description:  {}",
        summary.description_column.as_deref().unwrap_or("(none)")
    );
    println!("   Amount:       {}", summary.amount_pattern);
    println!(
        "   Date order:   {}",
        if summary.day_first {
            "day-first"
        } else {
            "month-first"
        }
    );
    println!(
        "   Rows:         {} loaded, {} skipped",
        summary.rows_loaded, summary.rows_skipped
    );
}

fn print_subscriptions(subscriptions: &[SubscriptionRecord]) {
    println!();
    if subscriptions.is_empty() {
        println!("📋 No subscriptions detected");
        return;
    }

    println!("📋 Detected Subscriptions ({})", subscriptions.len());
    println!("   ─────────────────────────────────────────────────────────────");
    for sub in subscriptions {
        println!(
            "   {:24} │ {:>10.2} │ {:<7} │ every {:>5.1} days │ {}x since {}",
            truncate(&sub.description, 24),
            sub.amount.abs(),
            sub.frequency.as_str(),
            sub.avg_gap_days,
            sub.occurrences,
            sub.first_seen
        );
    }
}

fn print_overspending(months: &[OverspendingRecord], summary: &OverspendingSummary) {
    println!();
    if months.is_empty() {
        println!("📈 Not enough monthly history for an overspending baseline");
        return;
    }

    println!(
        "📈 Monthly Spending ({} analyzed, {} over)",
        summary.total_analyzed, summary.overspending_count
    );
    println!("   ─────────────────────────────────────────────────────────────");
    for record in months {
        let (icon, excess) = match record.status {
            SpendingStatus::Overspending => (
                "⚠️ ",
                format!("+{:.2}", record.excess.unwrap_or_default()),
            ),
            SpendingStatus::Normal => ("✅", String::new()),
        };
        println!(
            "   {} {} │ {:>10.2} │ avg {:>10.2} │ {:>+7.1}% {}",
            icon, record.month, record.spending, record.avg_spending, record.pct_deviation, excess
        );
    }
}
