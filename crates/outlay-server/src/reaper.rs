//! Background task that expires old sessions
//!
//! Each upload creates a session; nothing else ever removes one unless the
//! client calls `DELETE /api/sessions/:id`. The reaper wakes up on a fixed
//! interval and purges sessions older than the configured TTL.
//!
//! - `OUTLAY_SESSION_TTL_MINUTES`: session lifetime (default: 60)
//! - `OUTLAY_REAPER_INTERVAL_SECS`: how often to sweep (default: 300)

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info};

use outlay_core::LedgerStore;

use crate::DEFAULT_SESSION_TTL_MINUTES;

const DEFAULT_INTERVAL_SECS: u64 = 300;

/// Configuration for the session reaper
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Sessions older than this are purged
    pub max_age: chrono::Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self::with_ttl(chrono::Duration::minutes(DEFAULT_SESSION_TTL_MINUTES))
    }
}

impl ReaperConfig {
    pub fn with_ttl(max_age: chrono::Duration) -> Self {
        let interval_secs = std::env::var("OUTLAY_REAPER_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|secs: &u64| *secs > 0)
            .unwrap_or(DEFAULT_INTERVAL_SECS);

        Self {
            interval: Duration::from_secs(interval_secs),
            max_age,
        }
    }
}

/// Spawn the reaper; it runs until the runtime shuts down
pub fn start_session_reaper(store: Arc<dyn LedgerStore>, config: ReaperConfig) -> JoinHandle<()> {
    info!(
        "Starting session reaper: every {}s, max age {} minutes",
        config.interval.as_secs(),
        config.max_age.num_minutes()
    );

    tokio::spawn(async move {
        let mut ticker = interval(config.interval);

        // Skip the first immediate tick - nothing can have expired at startup
        ticker.tick().await;

        loop {
            ticker.tick().await;
            sweep(store.as_ref(), config.max_age);
        }
    })
}

/// Run a single purge pass
pub(crate) fn sweep(store: &dyn LedgerStore, max_age: chrono::Duration) -> usize {
    match store.purge_expired(max_age) {
        Ok(purged) => {
            debug!(purged, "Session sweep complete");
            purged
        }
        Err(e) => {
            error!("Session sweep failed: {}", e);
            0
        }
    }
}
