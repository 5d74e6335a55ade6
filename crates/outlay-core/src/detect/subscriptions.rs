//! Recurring charge detection
//!
//! A subscription is the same description charged the same amount at a
//! steady weekly or monthly cadence. Merchants that vary the amount are not
//! detected.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::debug;

use super::DetectionConfig;
use crate::models::{is_placeholder_description, Frequency, SubscriptionRecord, Transaction};

pub fn detect_subscriptions(ledger: &[Transaction]) -> Vec<SubscriptionRecord> {
    detect_subscriptions_with_config(ledger, &DetectionConfig::default())
}

pub fn detect_subscriptions_with_config(
    ledger: &[Transaction],
    config: &DetectionConfig,
) -> Vec<SubscriptionRecord> {
    // Amounts are grouped by bit pattern: the same cell text always parses
    // to the same f64.
    let mut groups: HashMap<(&str, u64), Vec<NaiveDate>> = HashMap::new();
    for tx in ledger
        .iter()
        .filter(|tx| tx.is_expense() && !is_placeholder_description(&tx.description))
    {
        groups
            .entry((tx.description.as_str(), tx.amount.to_bits()))
            .or_default()
            .push(tx.date);
    }

    let mut records: Vec<SubscriptionRecord> = groups
        .into_iter()
        .filter_map(|((description, bits), dates)| {
            classify_group(description, f64::from_bits(bits), dates, config)
        })
        .collect();

    records.sort_by(|a, b| {
        a.description
            .cmp(&b.description)
            .then(a.amount.total_cmp(&b.amount))
    });

    debug!(count = records.len(), "Detected subscriptions");
    records
}

fn classify_group(
    description: &str,
    amount: f64,
    mut dates: Vec<NaiveDate>,
    config: &DetectionConfig,
) -> Option<SubscriptionRecord> {
    if dates.len() < config.min_occurrences.max(2) {
        return None;
    }
    dates.sort();

    let gaps: Vec<i64> = dates.windows(2).map(|w| (w[1] - w[0]).num_days()).collect();
    let min_gap = *gaps.iter().min()?;
    let max_gap = *gaps.iter().max()?;
    if max_gap - min_gap > config.max_gap_spread_days {
        return None;
    }

    let mean_gap = gaps.iter().sum::<i64>() as f64 / gaps.len() as f64;
    let avg_gap_days = (mean_gap * 10.0).round() / 10.0;

    let within = |(lo, hi): (f64, f64)| avg_gap_days >= lo && avg_gap_days <= hi;
    let frequency = if within(config.monthly_gap_days) {
        Frequency::Monthly
    } else if within(config.weekly_gap_days) {
        Frequency::Weekly
    } else {
        return None;
    };

    Some(SubscriptionRecord {
        description: description.to_string(),
        amount,
        frequency,
        avg_gap_days,
        occurrences: dates.len(),
        first_seen: dates[0],
        last_seen: dates[dates.len() - 1],
    })
}
