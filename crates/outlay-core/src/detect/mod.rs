//! Detection over a normalized ledger
//!
//! Both detectors are pure functions of the full ledger: every call recomputes
//! from scratch and keeps no state between runs.

pub mod overspending;
pub mod subscriptions;

pub use overspending::{detect_overspending, detect_overspending_with_config};
pub use subscriptions::{detect_subscriptions, detect_subscriptions_with_config};

/// Thresholds shared by the detectors
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionConfig {
    /// Minimum charges in a group before a periodicity claim is made
    pub min_occurrences: usize,
    /// Largest allowed difference between the longest and shortest gap
    pub max_gap_spread_days: i64,
    /// Inclusive mean-gap range classified as monthly
    pub monthly_gap_days: (f64, f64),
    /// Inclusive mean-gap range classified as weekly
    pub weekly_gap_days: (f64, f64),

    /// Leading months that only feed the baseline
    pub history_months: usize,
    /// Flat threshold as a multiple of the baseline mean
    pub flat_headroom: f64,
    /// Spread used when the baseline deviation is zero, as a share of the mean
    pub spread_floor_ratio: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_occurrences: 3,
            max_gap_spread_days: 5,
            monthly_gap_days: (25.0, 35.0),
            weekly_gap_days: (6.0, 8.0),
            history_months: 3,
            flat_headroom: 1.2,      // 20% over the mean
            spread_floor_ratio: 0.1, // 10% of the mean
        }
    }
}
