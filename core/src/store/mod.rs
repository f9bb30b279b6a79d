//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database.
//! The engine calls store methods; it never executes SQL directly.

use crate::{
    error::{LootError, LootResult},
    event::{EventLogEntry, LootEvent},
};
use rusqlite::{params, Connection};

mod documents;

pub use documents::{BackupOutcome, DocumentLoad, RestoreOutcome};

pub struct CatalogStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl CatalogStore {
    pub fn open(path: &str) -> LootResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL only applies to real files.
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> LootResult<Self> {
        let conn = Connection::open(":memory:")?;
        Ok(Self { conn, path: None })
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> LootResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_catalog.sql"))?;
        Ok(())
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, event: &LootEvent) -> LootResult<()> {
        let payload = serde_json::to_string(event)?;
        self.conn.execute(
            "INSERT INTO event_log (event_type, payload, created_at) VALUES (?1, ?2, ?3)",
            params![event.event_type(), payload, now()],
        )?;
        Ok(())
    }

    pub fn events(&self) -> LootResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_type, payload, created_at
             FROM event_log ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok(EventLogEntry {
                    id: Some(row.get(0)?),
                    event_type: row.get(1)?,
                    payload: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn events_of_type(&self, event_type: &str) -> LootResult<Vec<LootEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT payload FROM event_log WHERE event_type = ?1 ORDER BY id ASC",
        )?;
        let payloads = stmt
            .query_map(params![event_type], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        payloads
            .iter()
            .map(|p| serde_json::from_str(p).map_err(LootError::from))
            .collect()
    }
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
