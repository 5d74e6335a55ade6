//! Subscription set operations

use rusqlite::{params, types::Type, OptionalExtension};

use super::{date_column, Database};
use crate::error::{Error, Result};
use crate::models::{Frequency, SessionId, SubscriptionRecord};

impl Database {
    /// Replace the stored subscription set for a session
    pub fn replace_subscriptions(
        &self,
        session: &SessionId,
        subscriptions: &[SubscriptionRecord],
    ) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE sessions SET subscriptions_detected_at = datetime('now') WHERE id = ?",
            params![session.as_str()],
        )?;
        if updated == 0 {
            return Err(Error::NotFound(format!("session {}", session)));
        }

        tx.execute(
            "DELETE FROM subscriptions WHERE session_id = ?",
            params![session.as_str()],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO subscriptions
                    (session_id, description, amount, frequency, avg_gap_days, occurrences, first_seen, last_seen)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )?;
            for sub in subscriptions {
                stmt.execute(params![
                    session.as_str(),
                    sub.description,
                    sub.amount,
                    sub.frequency.as_str(),
                    sub.avg_gap_days,
                    sub.occurrences as i64,
                    sub.first_seen.to_string(),
                    sub.last_seen.to_string(),
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Load the stored subscription set, `None` if detection never ran
    pub fn load_subscriptions(
        &self,
        session: &SessionId,
    ) -> Result<Option<Vec<SubscriptionRecord>>> {
        let conn = self.conn()?;

        let detected: Option<Option<String>> = conn
            .query_row(
                "SELECT subscriptions_detected_at FROM sessions WHERE id = ?",
                params![session.as_str()],
                |row| row.get(0),
            )
            .optional()?;

        match detected {
            None => return Err(Error::NotFound(format!("session {}", session))),
            Some(None) => return Ok(None),
            Some(Some(_)) => {}
        }

        let mut stmt = conn.prepare(
            r#"
            SELECT description, amount, frequency, avg_gap_days, occurrences, first_seen, last_seen
            FROM subscriptions
            WHERE session_id = ?
            ORDER BY id
            "#,
        )?;

        let subscriptions = stmt
            .query_map(params![session.as_str()], |row| {
                let freq_str: String = row.get(2)?;
                let frequency: Frequency = freq_str.parse().map_err(|e: String| {
                    rusqlite::Error::FromSqlConversionFailure(2, Type::Text, e.into())
                })?;
                let occurrences: i64 = row.get(4)?;

                Ok(SubscriptionRecord {
                    description: row.get(0)?,
                    amount: row.get(1)?,
                    frequency,
                    avg_gap_days: row.get(3)?,
                    occurrences: occurrences as usize,
                    first_seen: date_column(row, 5)?,
                    last_seen: date_column(row, 6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(subscriptions))
    }
}
