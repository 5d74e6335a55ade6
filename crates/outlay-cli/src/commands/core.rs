//! Shared utilities for commands
//!
//! - `open_db` - Open the session database
//! - `read_statement` - Load and normalize a statement file
//! - `parse_session` - Validate a session id argument

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use outlay_core::{db::Database, normalize, NormalizedLedger, SessionId};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .ok_or_else(|| anyhow::anyhow!("Database path must be valid UTF-8"))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Normalize a statement file into a ledger
pub fn read_statement(file: &Path) -> Result<NormalizedLedger> {
    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    normalize(csv_file).with_context(|| format!("Failed to load statement {}", file.display()))
}

pub fn parse_session(id: &str) -> Result<SessionId> {
    let session = SessionId::from(id);
    if session.as_str().is_empty() {
        anyhow::bail!("Session id must not be empty");
    }
    Ok(session)
}
