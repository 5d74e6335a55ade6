//! Session-scoped ledger storage
//!
//! Each upload gets its own session. A session holds at most one ledger and
//! the last subscription set computed from it; overspending results are never
//! stored. Writers replace a session's ledger as a whole, so a reader sees
//! either the previous ledger or the new one, never a mix.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{SessionId, SubscriptionRecord, Transaction};

/// Key-value store for session ledgers
pub trait LedgerStore: Send + Sync {
    /// Open a new, empty session
    fn create_session(&self) -> Result<SessionId>;

    /// Replace the session's ledger
    fn put_ledger(&self, session: &SessionId, ledger: &[Transaction]) -> Result<()>;

    /// The session's ledger, or `None` if nothing has been loaded yet
    fn get_ledger(&self, session: &SessionId) -> Result<Option<Vec<Transaction>>>;

    /// Replace the session's detected subscriptions
    fn put_subscriptions(
        &self,
        session: &SessionId,
        subscriptions: &[SubscriptionRecord],
    ) -> Result<()>;

    /// The last stored subscription set, or `None` if detection never ran
    fn get_subscriptions(&self, session: &SessionId) -> Result<Option<Vec<SubscriptionRecord>>>;

    /// Drop a session and everything stored under it
    fn delete_session(&self, session: &SessionId) -> Result<bool>;

    /// Drop sessions created more than `max_age` ago, returning how many went
    fn purge_expired(&self, max_age: Duration) -> Result<usize>;
}

/// Which sessions a purge with a given `max_age` removes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExpiryCutoff {
    /// The cutoff lies before any stored session
    Nothing,
    /// The cutoff lies after any stored session
    Everything,
    /// Sessions created strictly before this instant
    Before(DateTime<Utc>),
}

impl ExpiryCutoff {
    /// `now - max_age`, saturated to the four-digit years a stored timestamp can hold
    pub(crate) fn from_max_age(max_age: Duration) -> Self {
        match Utc::now().checked_sub_signed(max_age) {
            Some(cutoff) if cutoff.year() < 1 => Self::Nothing,
            Some(cutoff) if cutoff.year() > 9999 => Self::Everything,
            Some(cutoff) => Self::Before(cutoff),
            None if max_age < Duration::zero() => Self::Everything,
            None => Self::Nothing,
        }
    }

    pub(crate) fn expires(&self, created_at: DateTime<Utc>) -> bool {
        match self {
            Self::Nothing => false,
            Self::Everything => true,
            Self::Before(cutoff) => created_at <= *cutoff,
        }
    }
}

#[derive(Debug, Clone)]
struct SessionData {
    created_at: DateTime<Utc>,
    ledger: Option<Vec<Transaction>>,
    subscriptions: Option<Vec<SubscriptionRecord>>,
}

/// In-process store, one map entry per session
#[derive(Debug, Default)]
pub struct MemoryStore {
    sessions: RwLock<HashMap<SessionId, SessionData>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<SessionId, SessionData>>> {
        self.sessions
            .read()
            .map_err(|_| Error::Storage("session map lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<SessionId, SessionData>>> {
        self.sessions
            .write()
            .map_err(|_| Error::Storage("session map lock poisoned".to_string()))
    }
}

fn unknown_session(session: &SessionId) -> Error {
    Error::NotFound(format!("session {}", session))
}

impl LedgerStore for MemoryStore {
    fn create_session(&self) -> Result<SessionId> {
        let id = SessionId::generate();
        self.write()?.insert(
            id.clone(),
            SessionData {
                created_at: Utc::now(),
                ledger: None,
                subscriptions: None,
            },
        );
        debug!(session = %id, "Created session");
        Ok(id)
    }

    fn put_ledger(&self, session: &SessionId, ledger: &[Transaction]) -> Result<()> {
        let mut sessions = self.write()?;
        let data = sessions
            .get_mut(session)
            .ok_or_else(|| unknown_session(session))?;
        data.ledger = Some(ledger.to_vec());
        // A new ledger invalidates anything derived from the old one
        data.subscriptions = None;
        Ok(())
    }

    fn get_ledger(&self, session: &SessionId) -> Result<Option<Vec<Transaction>>> {
        let sessions = self.read()?;
        let data = sessions.get(session).ok_or_else(|| unknown_session(session))?;
        Ok(data.ledger.clone())
    }

    fn put_subscriptions(
        &self,
        session: &SessionId,
        subscriptions: &[SubscriptionRecord],
    ) -> Result<()> {
        let mut sessions = self.write()?;
        let data = sessions
            .get_mut(session)
            .ok_or_else(|| unknown_session(session))?;
        data.subscriptions = Some(subscriptions.to_vec());
        Ok(())
    }

    fn get_subscriptions(&self, session: &SessionId) -> Result<Option<Vec<SubscriptionRecord>>> {
        let sessions = self.read()?;
        let data = sessions.get(session).ok_or_else(|| unknown_session(session))?;
        Ok(data.subscriptions.clone())
    }

    fn delete_session(&self, session: &SessionId) -> Result<bool> {
        Ok(self.write()?.remove(session).is_some())
    }

    fn purge_expired(&self, max_age: Duration) -> Result<usize> {
        let cutoff = ExpiryCutoff::from_max_age(max_age);
        let mut sessions = self.write()?;
        let before = sessions.len();
        sessions.retain(|_, data| !cutoff.expires(data.created_at));
        let purged = before - sessions.len();
        if purged > 0 {
            info!(purged, "Purged expired sessions");
        }
        Ok(purged)
    }
}
