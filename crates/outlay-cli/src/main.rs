//! Outlay CLI - Bank statement analyzer
//!
//! Usage:
//!   outlay analyze --file CSV        Normalize and detect in one pass
//!   outlay import --file CSV         Store a statement as a new session
//!   outlay subscriptions --session S Detect recurring charges for a session
//!   outlay serve --port 3000         Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Analyze { file, json } => commands::cmd_analyze(&file, json),
        Commands::Preview { file, rows } => commands::cmd_preview(&file, rows),
        Commands::Import { file } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_import(&db, &file).map(|_| ())
        }
        Commands::Subscriptions { session, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_subscriptions(&db, &session, json)
        }
        Commands::Overspending { session, json } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_overspending(&db, &session, json)
        }
        Commands::Sessions { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(SessionsAction::List) => commands::cmd_sessions_list(&db),
                Some(SessionsAction::Delete { id }) => commands::cmd_sessions_delete(&db, &id),
                Some(SessionsAction::Purge { older_than_minutes }) => {
                    commands::cmd_sessions_purge(&db, older_than_minutes).map(|_| ())
                }
            }
        }
        Commands::Serve { port, host, memory } => {
            commands::cmd_serve(&cli.db, &host, port, memory, cli.no_encrypt).await
        }
    }
}
