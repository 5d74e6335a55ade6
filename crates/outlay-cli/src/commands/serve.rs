//! Server command implementation

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use outlay_core::{LedgerStore, MemoryStore};
use outlay_server::ServerConfig;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    memory: bool,
    no_encrypt: bool,
) -> Result<()> {
    let config = ServerConfig::from_env().context("Invalid server configuration")?;

    println!("🚀 Starting Outlay web server...");
    let store: Arc<dyn LedgerStore> = if memory {
        println!("   Sessions: in memory (lost on restart)");
        Arc::new(MemoryStore::new())
    } else {
        let db = open_db(db_path, no_encrypt)?;
        println!("   Database: {}", db_path.display());
        if db.is_encrypted() {
            println!("   🔒 Encryption: ENABLED");
        } else {
            println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
        }
        Arc::new(db)
    };
    println!("   Listening: http://{}:{}", host, port);
    println!(
        "   Session TTL: {} minutes (OUTLAY_SESSION_TTL_MINUTES)",
        config.session_ttl.num_minutes()
    );
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} (OUTLAY_ALLOWED_ORIGINS)",
            config.allowed_origins.join(", ")
        );
    }
    println!();
    println!("   Press Ctrl+C to stop");

    outlay_server::serve_with_config(store, host, port, config).await
}
