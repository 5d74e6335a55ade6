//! Monthly overspending classification against a trailing baseline
//!
//! Month `i` is judged only against months `0..i`. The first
//! `history_months` months never appear in the output.

use std::collections::BTreeMap;
use tracing::debug;

use super::DetectionConfig;
use crate::models::{OverspendingRecord, SpendingStatus, Transaction, YearMonth};

pub fn detect_overspending(ledger: &[Transaction]) -> Vec<OverspendingRecord> {
    detect_overspending_with_config(ledger, &DetectionConfig::default())
}

pub fn detect_overspending_with_config(
    ledger: &[Transaction],
    config: &DetectionConfig,
) -> Vec<OverspendingRecord> {
    let months = monthly_spending(ledger);

    let records: Vec<OverspendingRecord> = months
        .iter()
        .enumerate()
        .skip(config.history_months.max(1))
        .map(|(i, &(month, spending))| {
            let history: Vec<f64> = months[..i].iter().map(|&(_, s)| s).collect();
            classify_month(month, spending, &history, config)
        })
        .collect();

    debug!(
        months = months.len(),
        analyzed = records.len(),
        "Computed overspending baseline"
    );
    records
}

/// Total expenses per calendar month, chronologically
///
/// Months without a single expense are absent rather than zero.
pub fn monthly_spending(ledger: &[Transaction]) -> Vec<(YearMonth, f64)> {
    let mut totals: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for tx in ledger.iter().filter(|tx| tx.is_expense()) {
        *totals.entry(YearMonth::of(tx.date)).or_default() += tx.amount.abs();
    }
    totals.into_iter().collect()
}

fn classify_month(
    month: YearMonth,
    spending: f64,
    history: &[f64],
    config: &DetectionConfig,
) -> OverspendingRecord {
    let mean = history.iter().sum::<f64>() / history.len() as f64;

    let std = sample_std_dev(history, mean)
        .filter(|s| *s > 0.0)
        .unwrap_or(mean * config.spread_floor_ratio);

    // A baseline with no spending gives no meaningful ratio
    if mean <= 0.0 {
        return OverspendingRecord {
            month,
            spending,
            avg_spending: mean,
            std_spending: std,
            pct_deviation: 0.0,
            status: SpendingStatus::Normal,
            excess: None,
        };
    }

    // Heuristic: either threshold is enough to trigger
    let flat_threshold = mean * config.flat_headroom;
    let spread_threshold = mean + std;
    let over = spending > flat_threshold || spending > spread_threshold;

    OverspendingRecord {
        month,
        spending,
        avg_spending: mean,
        std_spending: std,
        pct_deviation: (spending - mean) / mean * 100.0,
        status: if over {
            SpendingStatus::Overspending
        } else {
            SpendingStatus::Normal
        },
        excess: over.then(|| spending - mean),
    }
}

/// Sample (n - 1) standard deviation; `None` below two points
fn sample_std_dev(values: &[f64], mean: f64) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}
