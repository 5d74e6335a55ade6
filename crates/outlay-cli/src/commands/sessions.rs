//! Session management commands

use anyhow::Result;
use chrono::Duration;
use outlay_core::db::Database;

use super::parse_session;

pub fn cmd_sessions_list(db: &Database) -> Result<()> {
    let sessions = db.list_sessions()?;

    if sessions.is_empty() {
        println!("No sessions stored. Run:");
        println!("  outlay import --file statement.csv");
        return Ok(());
    }

    println!();
    println!("🗃  Sessions");
    println!("   ─────────────────────────────────────────────────────────────");
    for session in sessions {
        println!(
            "   {} │ {} │ {:>6} txns │ {}",
            session.id,
            session.created_at,
            session.transaction_count,
            if session.has_subscriptions {
                "subscriptions stored"
            } else {
                ""
            }
        );
    }

    Ok(())
}

pub fn cmd_sessions_delete(db: &Database, id: &str) -> Result<()> {
    let session = parse_session(id)?;
    if !db.remove_session(&session)? {
        anyhow::bail!("Session not found: {}", session);
    }
    println!("🗑  Deleted session {}", session);
    Ok(())
}

pub fn cmd_sessions_purge(db: &Database, older_than_minutes: i64) -> Result<usize> {
    if older_than_minutes < 0 {
        anyhow::bail!("--older-than-minutes must not be negative");
    }
    let max_age = Duration::try_minutes(older_than_minutes).ok_or_else(|| {
        anyhow::anyhow!("--older-than-minutes {} is out of range", older_than_minutes)
    })?;
    let purged = db.purge_sessions_older_than(max_age)?;
    println!(
        "🧹 Purged {} session(s) older than {} minutes",
        purged, older_than_minutes
    );
    Ok(purged)
}
