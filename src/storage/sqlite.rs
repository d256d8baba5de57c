//! `SQLite` implementation of the durable store.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::{MemoryRow, MemoryStore};
use crate::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memories (
    id            TEXT PRIMARY KEY,
    agent_id      TEXT NOT NULL,
    org_id        TEXT NOT NULL,
    category      TEXT NOT NULL,
    title         TEXT NOT NULL,
    content       TEXT NOT NULL,
    source        TEXT NOT NULL,
    importance    TEXT NOT NULL,
    confidence    REAL NOT NULL,
    access_count  INTEGER NOT NULL DEFAULT 0,
    last_accessed INTEGER,
    expires_at    INTEGER,
    tags          TEXT NOT NULL DEFAULT '[]',
    metadata      TEXT NOT NULL DEFAULT '{}',
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memories_agent ON memories(agent_id);
";

/// Durable store over a single `SQLite` database.
///
/// The connection sits behind a mutex so the store can be shared between
/// the rehydrating manager and the background persistence thread.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (creating if necessary) a file-backed store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the database cannot be opened
    /// or the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::OperationFailed {
            operation: "open_store".to_string(),
            cause: e.to_string(),
        })?;
        Self::init(conn)
    }

    /// Opens an in-memory store, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the database cannot be opened.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::OperationFailed {
            operation: "open_store".to_string(),
            cause: e.to_string(),
        })?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).map_err(|e| Error::OperationFailed {
            operation: "create_schema".to_string(),
            cause: e.to_string(),
        })?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| Error::OperationFailed {
            operation: "lock_store".to_string(),
            cause: e.to_string(),
        })
    }
}

impl MemoryStore for SqliteStore {
    fn upsert(&self, row: &MemoryRow) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO memories
                (id, agent_id, org_id, category, title, content, source, importance,
                 confidence, access_count, last_accessed, expires_at, tags, metadata,
                 created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                row.id,
                row.agent_id,
                row.org_id,
                row.category,
                row.title,
                row.content,
                row.source,
                row.importance,
                row.confidence,
                row.access_count,
                row.last_accessed,
                row.expires_at,
                row.tags,
                row.metadata,
                row.created_at,
                row.updated_at,
            ],
        )
        .map_err(|e| Error::OperationFailed {
            operation: "upsert_memory".to_string(),
            cause: e.to_string(),
        })?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn
            .execute("DELETE FROM memories WHERE id = ?1", params![id])
            .map_err(|e| Error::OperationFailed {
                operation: "delete_memory".to_string(),
                cause: e.to_string(),
            })?;
        Ok(changed > 0)
    }

    fn load_all(&self) -> Result<Vec<MemoryRow>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, agent_id, org_id, category, title, content, source, importance,
                        confidence, access_count, last_accessed, expires_at, tags, metadata,
                        created_at, updated_at
                 FROM memories",
            )
            .map_err(|e| Error::OperationFailed {
                operation: "prepare_load_all".to_string(),
                cause: e.to_string(),
            })?;

        let rows = stmt
            .query_map([], |row| {
                Ok(MemoryRow {
                    id: row.get(0)?,
                    agent_id: row.get(1)?,
                    org_id: row.get(2)?,
                    category: row.get(3)?,
                    title: row.get(4)?,
                    content: row.get(5)?,
                    source: row.get(6)?,
                    importance: row.get(7)?,
                    confidence: row.get(8)?,
                    access_count: row.get(9)?,
                    last_accessed: row.get(10)?,
                    expires_at: row.get(11)?,
                    tags: row.get(12)?,
                    metadata: row.get(13)?,
                    created_at: row.get(14)?,
                    updated_at: row.get(15)?,
                })
            })
            .map_err(|e| Error::OperationFailed {
                operation: "load_all".to_string(),
                cause: e.to_string(),
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::OperationFailed {
                operation: "load_all".to_string(),
                cause: e.to_string(),
            })?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, agent: &str) -> MemoryRow {
        MemoryRow {
            id: id.to_string(),
            agent_id: agent.to_string(),
            org_id: "org-1".to_string(),
            category: "context".to_string(),
            title: format!("title {id}"),
            content: "content".to_string(),
            source: "interaction".to_string(),
            importance: "normal".to_string(),
            confidence: 1.0,
            access_count: 0,
            last_accessed: None,
            expires_at: None,
            tags: "[]".to_string(),
            metadata: "{}".to_string(),
            created_at: 1_600_000_000,
            updated_at: 1_600_000_000,
        }
    }

    #[test]
    fn test_upsert_and_load_all() {
        let store = SqliteStore::in_memory().expect("in-memory store");
        store.upsert(&row("m1", "agent-1")).expect("upsert");
        store.upsert(&row("m2", "agent-2")).expect("upsert");

        let rows = store.load_all().expect("load");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_upsert_replaces() {
        let store = SqliteStore::in_memory().expect("in-memory store");
        store.upsert(&row("m1", "agent-1")).expect("upsert");

        let mut updated = row("m1", "agent-1");
        updated.title = "new title".to_string();
        store.upsert(&updated).expect("upsert");

        let rows = store.load_all().expect("load");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "new title");
    }

    #[test]
    fn test_delete_returns_existed() {
        let store = SqliteStore::in_memory().expect("in-memory store");
        store.upsert(&row("m1", "agent-1")).expect("upsert");

        assert!(store.delete("m1").expect("delete"));
        assert!(!store.delete("m1").expect("delete"));
        assert!(store.load_all().expect("load").is_empty());
    }

    #[test]
    fn test_file_backed_store_persists() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("memories.db");

        {
            let store = SqliteStore::open(&path).expect("open");
            store.upsert(&row("m1", "agent-1")).expect("upsert");
        }

        let reopened = SqliteStore::open(&path).expect("reopen");
        assert_eq!(reopened.load_all().expect("load").len(), 1);
    }
}
