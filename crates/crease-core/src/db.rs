// SQLite persistence layer: whole-aggregate JSON documents plus an
// append-only match history.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// One row of the match history table.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub seq: i64,
    pub tournament_id: String,
    pub match_id: String,
    pub body: serde_json::Value,
    pub recorded_at: String,
}

/// SQLite-backed key-value document store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS documents (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE IF NOT EXISTS match_history (
                seq           INTEGER PRIMARY KEY AUTOINCREMENT,
                tournament_id TEXT NOT NULL,
                match_id      TEXT NOT NULL,
                body          TEXT NOT NULL,
                recorded_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX IF NOT EXISTS idx_match_history_tournament
                ON match_history(tournament_id);
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    /// Persist a JSON document under `key`, replacing any previous value.
    pub fn save_document(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let conn = self.conn();
        let json_str =
            serde_json::to_string(value).context("failed to serialize document")?;
        conn.execute(
            "INSERT OR REPLACE INTO documents (key, value, updated_at)
             VALUES (?1, ?2, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
            params![key, json_str],
        )
        .context("failed to save document")?;
        Ok(())
    }

    /// Load a previously saved document by `key`. Returns `None` if the key
    /// does not exist.
    pub fn load_document(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let json_str: Option<String> = conn
            .query_row(
                "SELECT value FROM documents WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .context("failed to query document")?;

        match json_str {
            Some(s) => {
                let value = serde_json::from_str(&s).context("failed to deserialize document")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Read-modify-write a stored document inside one transaction.
    ///
    /// Fails if no document exists under `key`; the closure's error aborts
    /// the transaction and leaves the stored value untouched.
    pub fn update_document<F>(&self, key: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut serde_json::Value) -> Result<()>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        rewrite_document(&tx, key, apply)?;
        tx.commit().context("failed to commit document update")?;
        Ok(())
    }

    /// `update_document` plus a match history row, committed together or not
    /// at all.
    pub fn update_document_with_history<F>(
        &self,
        key: &str,
        entry: &NewHistoryEntry<'_>,
        apply: F,
    ) -> Result<()>
    where
        F: FnOnce(&mut serde_json::Value) -> Result<()>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        rewrite_document(&tx, key, apply)?;
        insert_history(&tx, entry)?;
        tx.commit().context("failed to commit document update")?;
        Ok(())
    }

    /// Load the match history for one tournament, oldest first.
    pub fn load_match_history(&self, tournament_id: &str) -> Result<Vec<HistoryEntry>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT seq, tournament_id, match_id, body, recorded_at
                 FROM match_history WHERE tournament_id = ?1 ORDER BY seq",
            )
            .context("failed to prepare load_match_history query")?;

        let rows = stmt
            .query_map(params![tournament_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })
            .context("failed to query match history")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map match history rows")?;

        rows.into_iter()
            .map(|(seq, tournament_id, match_id, body, recorded_at)| {
                let body = serde_json::from_str(&body)
                    .context("failed to deserialize match history body")?;
                Ok(HistoryEntry {
                    seq,
                    tournament_id,
                    match_id,
                    body,
                    recorded_at,
                })
            })
            .collect()
    }

    /// Wipe every document and all history, then store `value` under `key`.
    /// Uses a transaction with automatic rollback on error.
    pub fn replace_all(&self, key: &str, value: &serde_json::Value) -> Result<()> {
        let json_str = serde_json::to_string(value).context("failed to serialize document")?;
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin transaction")?;
        tx.execute("DELETE FROM documents", [])
            .context("failed to delete documents")?;
        tx.execute("DELETE FROM match_history", [])
            .context("failed to delete match history")?;
        tx.execute(
            "INSERT INTO documents (key, value) VALUES (?1, ?2)",
            params![key, json_str],
        )
        .context("failed to save document")?;
        tx.commit().context("failed to commit replace_all")?;
        Ok(())
    }
}

/// A match history row waiting to be written.
#[derive(Debug, Clone, Copy)]
pub struct NewHistoryEntry<'a> {
    pub tournament_id: &'a str,
    pub match_id: &'a str,
    pub body: &'a serde_json::Value,
}

fn rewrite_document<F>(conn: &Connection, key: &str, apply: F) -> Result<()>
where
    F: FnOnce(&mut serde_json::Value) -> Result<()>,
{
    let json_str: String = conn
        .query_row(
            "SELECT value FROM documents WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .context("failed to query document")?
        .with_context(|| format!("no document stored under '{key}'"))?;

    let mut value: serde_json::Value =
        serde_json::from_str(&json_str).context("failed to deserialize document")?;
    apply(&mut value)?;

    let json_str = serde_json::to_string(&value).context("failed to serialize document")?;
    conn.execute(
        "UPDATE documents SET value = ?2, updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE key = ?1",
        params![key, json_str],
    )
    .context("failed to update document")?;
    Ok(())
}

fn insert_history(conn: &Connection, entry: &NewHistoryEntry<'_>) -> Result<()> {
    let json_str = serde_json::to_string(entry.body).context("failed to serialize match")?;
    conn.execute(
        "INSERT INTO match_history (tournament_id, match_id, body) VALUES (?1, ?2, ?3)",
        params![entry.tournament_id, entry.match_id, json_str],
    )
    .context("failed to append match history")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
