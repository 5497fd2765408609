//! SQLite transcript store implementation.

use crate::{Error, NewRecord, Record, Result, SessionKey};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

/// Summary of one session's transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub key: SessionKey,
    pub turn_count: usize,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// SQLite-backed transcript store.
///
/// The connection is guarded by a mutex so one store can be shared by
/// concurrent exchanges; each append runs in its own transaction.
pub struct TranscriptStore {
    conn: Mutex<Connection>,
}

impl TranscriptStore {
    /// Open or create a transcript store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory transcript store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                id TEXT PRIMARY KEY,
                session TEXT NOT NULL,
                seq INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                data TEXT NOT NULL,
                UNIQUE (session, seq)
            );
            CREATE INDEX IF NOT EXISTS idx_turns_session
                ON turns(session, seq);
            "#,
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-written
        // transaction behind, so the connection is still usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append records to a session in one transaction.
    ///
    /// Sequence numbers continue from the session's current tail.
    pub fn append(&self, session: &SessionKey, records: &[NewRecord]) -> Result<Vec<Record>> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let tail: i64 = tx.query_row(
            "SELECT COALESCE(MAX(seq), 0) FROM turns WHERE session = ?1",
            [session.as_str()],
            |row| row.get(0),
        )?;

        let mut stored = Vec::with_capacity(records.len());
        for (offset, record) in records.iter().enumerate() {
            let stored_record = Record {
                id: Uuid::new_v4(),
                session: session.clone(),
                seq: tail + offset as i64 + 1,
                timestamp: Utc::now(),
                kind: record.kind.clone(),
                data: record.data.clone(),
            };
            tx.execute(
                "INSERT INTO turns (id, session, seq, timestamp, kind, data) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    stored_record.id.to_string(),
                    session.as_str(),
                    stored_record.seq,
                    stored_record.timestamp.to_rfc3339(),
                    stored_record.kind,
                    serde_json::to_string(&stored_record.data)?,
                ],
            )?;
            stored.push(stored_record);
        }

        tx.commit()?;
        tracing::debug!(session = %session, count = stored.len(), "appended transcript records");
        Ok(stored)
    }

    /// Load all records for a session, ordered by sequence.
    pub fn load(&self, session: &SessionKey) -> Result<Vec<Record>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, seq, timestamp, kind, data FROM turns
             WHERE session = ?1 ORDER BY seq",
        )?;

        let rows = stmt.query_map([session.as_str()], |row| {
            let id: String = row.get(0)?;
            let seq: i64 = row.get(1)?;
            let timestamp: String = row.get(2)?;
            let kind: String = row.get(3)?;
            let data: String = row.get(4)?;
            Ok((id, seq, timestamp, kind, data))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, seq, timestamp, kind, data) = row?;
            records.push(Record {
                id: id.parse().map_err(|e: uuid::Error| invalid(&id, e))?,
                session: session.clone(),
                seq,
                timestamp: parse_timestamp(&id, &timestamp)?,
                kind,
                data: serde_json::from_str(&data).map_err(|e| invalid(&id, e))?,
            });
        }
        Ok(records)
    }

    /// List sessions, most recently updated first.
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT session, COUNT(*), MIN(timestamp), MAX(timestamp) FROM turns
             GROUP BY session ORDER BY MAX(timestamp) DESC",
        )?;

        let rows = stmt.query_map([], |row| {
            let session: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            let started: String = row.get(2)?;
            let updated: String = row.get(3)?;
            Ok((session, count, started, updated))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (session, count, started, updated) = row?;
            sessions.push(SessionSummary {
                turn_count: usize::try_from(count).unwrap_or_default(),
                started_at: parse_timestamp(&session, &started)?,
                updated_at: parse_timestamp(&session, &updated)?,
                key: SessionKey::from(session),
            });
        }
        Ok(sessions)
    }

    /// Delete a session's transcript, returning how many records were removed.
    pub fn clear(&self, session: &SessionKey) -> Result<usize> {
        let removed = self
            .conn()
            .execute("DELETE FROM turns WHERE session = ?1", [session.as_str()])?;
        tracing::info!(session = %session, removed, "cleared transcript");
        Ok(removed)
    }
}

fn parse_timestamp(id: &str, raw: &str) -> Result<DateTime<Utc>> {
    raw.parse().map_err(|e: chrono::ParseError| invalid(id, e))
}

fn invalid(id: &str, reason: impl std::fmt::Display) -> Error {
    Error::InvalidRecord {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}
