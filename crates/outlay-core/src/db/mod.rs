//! SQLite session storage with connection pooling
//!
//! This module is organized by domain:
//! - `sessions` - Session lifecycle and ledger rows
//! - `subscriptions` - Detected subscription sets per session
//!
//! Every row is keyed by `session_id`; deleting a session cascades to its
//! ledger and subscriptions.

use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use tracing::info;

use crate::error::{Error, Result};

mod sessions;
mod subscriptions;

pub use sessions::SessionInfo;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "OUTLAY_DB_KEY";

/// Timestamp layout used for `created_at` columns (matches SQLite `datetime('now')`)
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"outlay-salt-v1-x";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Read a `YYYY-MM-DD` text column as a date
pub(crate) fn date_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Whether connections were opened with a SQLCipher key
    encrypted: bool,
}

impl Database {
    /// Open an encrypted database
    ///
    /// Requires `OUTLAY_DB_KEY` to be set; the SQLCipher key is derived from
    /// it with Argon2. Use `new_unencrypted()` for development and tests.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Open an unencrypted database
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open a database with an explicit encryption passphrase
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let mut init = String::new();
        if let Some(pass) = passphrase {
            init.push_str(&format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?));
        }
        // Connection-scoped, so it has to run on every pooled connection
        init.push_str("PRAGMA foreign_keys = ON;");

        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            conn.execute_batch(&init)?;
            Ok(())
        });
        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self {
            pool,
            encrypted: passphrase.is_some(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` because every pooled
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "outlay_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().into_owned();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Whether this database was opened with an encryption key
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the writer replacing a ledger
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- One row per analytic session (one uploaded statement)
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                created_at DATETIME NOT NULL DEFAULT (datetime('now')),
                ledger_loaded_at DATETIME,          -- NULL until a ledger is stored
                subscriptions_detected_at DATETIME  -- NULL until detection results are stored
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_created ON sessions(created_at);

            -- Normalized ledger rows, in statement order
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                seq INTEGER NOT NULL,
                date DATE NOT NULL,
                description TEXT NOT NULL,
                amount REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_session ON transactions(session_id, seq);

            -- Last detected subscription set per session
            CREATE TABLE IF NOT EXISTS subscriptions (
                id INTEGER PRIMARY KEY,
                session_id TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
                description TEXT NOT NULL,
                amount REAL NOT NULL,
                frequency TEXT NOT NULL,
                avg_gap_days REAL NOT NULL,
                occurrences INTEGER NOT NULL,
                first_seen DATE NOT NULL,
                last_seen DATE NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_subscriptions_session ON subscriptions(session_id);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
