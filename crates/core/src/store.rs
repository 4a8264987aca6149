// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! SQLite-backed offline queue.
//!
//! Envelopes are stored as JSON bodies in a single table keyed by
//! (recipient, envelope_id). An autoincrement sequence column gives
//! insertion order; an upsert keeps the original sequence on re-store.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use rusqlite::{params, Connection};

use crate::envelope::Envelope;
use crate::error::{Error, Result};
use crate::queue::OfflineQueue;

/// SQL schema for the offline queue.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS offline_envelopes (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient TEXT NOT NULL,
    envelope_id TEXT NOT NULL,
    category TEXT NOT NULL,
    body TEXT NOT NULL,
    stored_at TEXT NOT NULL,
    UNIQUE (recipient, envelope_id)
);

CREATE INDEX IF NOT EXISTS idx_offline_recipient ON offline_envelopes(recipient, seq);
"#;

/// Offline queue persisted in a SQLite database.
pub struct SqliteQueue {
    conn: Mutex<Connection>,
}

impl SqliteQueue {
    /// Opens (or creates) the queue database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL keeps readers from blocking the single writer
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        conn.execute_batch(SCHEMA)?;

        Ok(SqliteQueue {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory queue.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(SqliteQueue {
            conn: Mutex::new(conn),
        })
    }

    /// Returns every recipient with at least one queued envelope.
    pub fn recipients(&self) -> Result<Vec<String>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT DISTINCT recipient FROM offline_envelopes ORDER BY recipient")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<String>, _>>()?)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl OfflineQueue for SqliteQueue {
    fn store(&self, recipient: &str, envelopes: &[Envelope]) -> Result<()> {
        if envelopes.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO offline_envelopes (recipient, envelope_id, category, body, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (recipient, envelope_id) DO UPDATE SET
                     category = excluded.category,
                     body = excluded.body",
            )?;
            let stored_at = Utc::now().to_rfc3339();
            for envelope in envelopes {
                stmt.execute(params![
                    recipient,
                    envelope.id,
                    envelope.category.as_str(),
                    envelope.to_json()?,
                    stored_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete(&self, recipient: &str, ids: &[String]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "DELETE FROM offline_envelopes WHERE recipient = ?1 AND envelope_id = ?2",
            )?;
            for id in ids {
                stmt.execute(params![recipient, id])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_all(&self, recipient: &str) -> Result<Vec<Envelope>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT envelope_id, body FROM offline_envelopes WHERE recipient = ?1 ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![recipient], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut envelopes = Vec::new();
        for row in rows {
            let (id, body) = row?;
            let envelope = Envelope::from_json(&body).map_err(|e| {
                Error::CorruptedData(format!("queued envelope '{}' for '{}': {}", id, recipient, e))
            })?;
            envelopes.push(envelope);
        }
        Ok(envelopes)
    }

    fn len(&self, recipient: &str) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM offline_envelopes WHERE recipient = ?1",
            params![recipient],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
