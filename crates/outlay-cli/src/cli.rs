//! CLI argument definitions using clap
//!
//! Command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Outlay - Find subscriptions and overspending in bank statements
#[derive(Parser)]
#[command(name = "outlay")]
#[command(about = "Bank statement normalizer and spending analyzer", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (session storage)
    #[arg(long, default_value = "outlay.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set OUTLAY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Normalize a statement and run both detectors without storing anything
    Analyze {
        /// CSV statement
        #[arg(short, long)]
        file: PathBuf,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the detected header row and first rows of a statement
    Preview {
        /// CSV statement
        #[arg(short, long)]
        file: PathBuf,

        /// Number of sample rows
        #[arg(short, long, default_value = "5")]
        rows: usize,
    },

    /// Normalize a statement into a new stored session
    Import {
        /// CSV statement
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Detect subscriptions for a stored session
    Subscriptions {
        /// Session id printed by `outlay import`
        #[arg(short, long)]
        session: String,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify months of a stored session against their trailing baseline
    Overspending {
        /// Session id printed by `outlay import`
        #[arg(short, long)]
        session: String,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage stored sessions
    Sessions {
        #[command(subcommand)]
        action: Option<SessionsAction>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Keep sessions in memory instead of the database
        #[arg(long)]
        memory: bool,
    },
}

#[derive(Subcommand)]
pub enum SessionsAction {
    /// List stored sessions
    List,

    /// Delete one session and everything stored under it
    Delete {
        /// Session id
        id: String,
    },

    /// Delete sessions older than a given age
    Purge {
        /// Maximum session age in minutes
        #[arg(long, default_value = "60")]
        older_than_minutes: i64,
    },
}
