//! Session and ledger operations

use chrono::{Duration, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{date_column, Database, TIMESTAMP_FORMAT};
use crate::error::{Error, Result};
use crate::models::{SessionId, SubscriptionRecord, Transaction};
use crate::store::{ExpiryCutoff, LedgerStore};

/// Session row as stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub id: SessionId,
    pub created_at: String,
    pub transaction_count: usize,
    pub has_subscriptions: bool,
}

impl Database {
    /// Insert a fresh session row
    pub fn insert_session(&self) -> Result<SessionId> {
        let id = SessionId::generate();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (id, created_at) VALUES (?, ?)",
            params![id.as_str(), Utc::now().format(TIMESTAMP_FORMAT).to_string()],
        )?;
        debug!(session = %id, "Created session");
        Ok(id)
    }

    pub fn session_exists(&self, session: &SessionId) -> Result<bool> {
        let conn = self.conn()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM sessions WHERE id = ?",
                params![session.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn require_session(&self, session: &SessionId) -> Result<()> {
        if self.session_exists(session)? {
            Ok(())
        } else {
            Err(Error::NotFound(format!("session {}", session)))
        }
    }

    /// Replace a session's ledger in a single SQL transaction
    ///
    /// Stored subscriptions are cleared, since they were derived from the
    /// previous ledger.
    pub fn replace_ledger(&self, session: &SessionId, ledger: &[Transaction]) -> Result<()> {
        self.require_session(session)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM transactions WHERE session_id = ?",
            params![session.as_str()],
        )?;
        tx.execute(
            "DELETE FROM subscriptions WHERE session_id = ?",
            params![session.as_str()],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO transactions (session_id, seq, date, description, amount)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )?;
            for (seq, t) in ledger.iter().enumerate() {
                stmt.execute(params![
                    session.as_str(),
                    seq as i64,
                    t.date.to_string(),
                    t.description,
                    t.amount,
                ])?;
            }
        }

        tx.execute(
            r#"
            UPDATE sessions
            SET ledger_loaded_at = datetime('now'), subscriptions_detected_at = NULL
            WHERE id = ?
            "#,
            params![session.as_str()],
        )?;
        tx.commit()?;

        debug!(session = %session, rows = ledger.len(), "Stored ledger");
        Ok(())
    }

    /// Load a session's ledger in statement order
    pub fn load_ledger(&self, session: &SessionId) -> Result<Option<Vec<Transaction>>> {
        let conn = self.conn()?;

        let loaded: Option<Option<String>> = conn
            .query_row(
                "SELECT ledger_loaded_at FROM sessions WHERE id = ?",
                params![session.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match loaded {
            None => return Err(Error::NotFound(format!("session {}", session))),
            Some(None) => return Ok(None),
            Some(Some(_)) => {}
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT date, description, amount
            FROM transactions
            WHERE session_id = ?
            ORDER BY seq
            "#,
        )?;

        let ledger = stmt
            .query_map(params![session.as_str()], |row| {
                Ok(Transaction {
                    date: date_column(row, 0)?,
                    description: row.get(1)?,
                    amount: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(ledger))
    }

    /// Delete a session and everything stored under it
    pub fn remove_session(&self, session: &SessionId) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE id = ?",
            params![session.as_str()],
        )?;
        Ok(deleted > 0)
    }

    /// Delete sessions created before `now - max_age`
    pub fn purge_sessions_older_than(&self, max_age: Duration) -> Result<usize> {
        let conn = self.conn()?;
        let purged = match ExpiryCutoff::from_max_age(max_age) {
            ExpiryCutoff::Nothing => 0,
            ExpiryCutoff::Everything => conn.execute("DELETE FROM sessions", [])?,
            ExpiryCutoff::Before(cutoff) => conn.execute(
                "DELETE FROM sessions WHERE created_at < ?",
                params![cutoff.format(TIMESTAMP_FORMAT).to_string()],
            )?,
        };
        if purged > 0 {
            info!(purged, "Purged expired sessions");
        }
        Ok(purged)
    }

    /// List sessions, newest first
    pub fn list_sessions(&self) -> Result<Vec<SessionInfo>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT s.id, s.created_at, s.subscriptions_detected_at IS NOT NULL,
                   (SELECT COUNT(*) FROM transactions t WHERE t.session_id = s.id)
            FROM sessions s
            ORDER BY s.created_at DESC, s.id
            "#,
        )?;

        let sessions = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let count: i64 = row.get(3)?;
                Ok(SessionInfo {
                    id: SessionId::from(id),
                    created_at: row.get(1)?,
                    has_subscriptions: row.get(2)?,
                    transaction_count: count as usize,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(sessions)
    }
}

impl LedgerStore for Database {
    fn create_session(&self) -> Result<SessionId> {
        self.insert_session()
    }

    fn put_ledger(&self, session: &SessionId, ledger: &[Transaction]) -> Result<()> {
        self.replace_ledger(session, ledger)
    }

    fn get_ledger(&self, session: &SessionId) -> Result<Option<Vec<Transaction>>> {
        self.load_ledger(session)
    }

    fn put_subscriptions(
        &self,
        session: &SessionId,
        subscriptions: &[SubscriptionRecord],
    ) -> Result<()> {
        self.replace_subscriptions(session, subscriptions)
    }

    fn get_subscriptions(&self, session: &SessionId) -> Result<Option<Vec<SubscriptionRecord>>> {
        self.load_subscriptions(session)
    }

    fn delete_session(&self, session: &SessionId) -> Result<bool> {
        self.remove_session(session)
    }

    fn purge_expired(&self, max_age: Duration) -> Result<usize> {
        self.purge_sessions_older_than(max_age)
    }
}
