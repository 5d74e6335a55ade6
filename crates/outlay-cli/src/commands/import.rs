//! Import and preview command implementations

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use outlay_core::{db::Database, preview, SessionId};
use tracing::warn;

use super::analyze::print_mapping;
use super::{read_statement, truncate};

/// Normalize a statement into a new session, returning its id
///
/// The statement is normalized before a session is created, so a file that
/// fails to load leaves nothing behind.
pub fn cmd_import(db: &Database, file: &Path) -> Result<SessionId> {
    println!("📥 Importing {}...", file.display());

    let ledger = read_statement(file)?;

    let session = db.insert_session().context("Failed to create session")?;
    if let Err(e) = db.replace_ledger(&session, &ledger.transactions) {
        if let Err(cleanup) = db.remove_session(&session) {
            warn!(session = %session, error = %cleanup, "Failed to remove half-created session");
        }
        return Err(e).context("Failed to store ledger");
    }

    print_mapping(&ledger.summary);
    println!();
    println!("✅ Session {}", session);
    println!("   {} transactions stored", ledger.transactions.len());
    println!();
    println!("Next steps:");
    println!("  outlay subscriptions --session {}", session);
    println!("  outlay overspending --session {}", session);

    Ok(session)
}

/// Show the detected header and first rows of a statement
pub fn cmd_preview(file: &Path, rows: usize) -> Result<()> {
    let csv_file =
        File::open(file).with_context(|| format!("Failed to open file: {}", file.display()))?;
    let preview = preview(csv_file, rows).context("Failed to read statement")?;

    println!("🔎 Preview of {}", file.display());
    println!(
        "   Header row {} ({} columns)",
        preview.header_row, preview.total_columns
    );
    println!();
    println!(
        "   {}",
        preview
            .columns
            .iter()
            .map(|c| format!("{:16}", truncate(c, 16)))
            .collect::<Vec<_>>()
            .join(" │ ")
    );
    for row in &preview.sample_rows {
        let cells: Vec<String> = preview
            .columns
            .iter()
            .map(|c| {
                let value = row.get(c).and_then(|v| v.as_str()).unwrap_or("");
                format!("{:16}", truncate(value, 16))
            })
            .collect();
        println!("   {}", cells.join(" │ "));
    }

    println!();
    match &preview.schema {
        Some(schema) => {
            println!("   Date column:   {}", schema.date_column.name);
            println!(
                "   Description:   {}",
                schema
                    .description_column
                    .as_ref()
                    .map(|c| c.name.as_str())
                    .unwrap_or("(none)")
            );
            println!(
                "   Amount:        {}",
                schema.amount_representation.describe()
            );
        }
        None => println!("   ⚠️  Columns could not be mapped; import will fail"),
    }

    Ok(())
}
