//! Background persistence writer.
//!
//! The manager applies every mutation in memory first and then hands the
//! durable write to this writer. Writes are executed on a dedicated thread;
//! a failed write is logged and dropped, never rolled back — the running
//! process's in-memory state stays authoritative until restart. Callers
//! that need a durability checkpoint (shutdown, tests) can [`flush`].
//!
//! [`flush`]: PersistWriter::flush

use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use super::{MemoryRow, MemoryStore};

/// A queued durable write.
enum WriteOp {
    Upsert(Box<MemoryRow>),
    Delete(String),
    /// Barrier: acknowledges once every earlier op has been attempted.
    Flush(Sender<()>),
}

/// Fire-and-forget persistence queue backed by one writer thread.
pub struct PersistWriter {
    tx: Option<Sender<WriteOp>>,
    handle: Option<JoinHandle<()>>,
}

impl PersistWriter {
    /// Spawns the writer thread over `store`.
    #[must_use]
    pub fn spawn(store: Arc<dyn MemoryStore>) -> Self {
        let (tx, rx) = mpsc::channel::<WriteOp>();
        let handle = thread::Builder::new()
            .name("mnemon-persist".to_string())
            .spawn(move || {
                while let Ok(op) = rx.recv() {
                    match op {
                        WriteOp::Upsert(row) => {
                            if let Err(e) = store.upsert(&row) {
                                warn!(memory_id = %row.id, error = %e, "Persist upsert failed; in-memory state remains authoritative");
                            }
                        }
                        WriteOp::Delete(id) => {
                            if let Err(e) = store.delete(&id) {
                                warn!(memory_id = %id, error = %e, "Persist delete failed; in-memory state remains authoritative");
                            }
                        }
                        WriteOp::Flush(ack) => {
                            let _ = ack.send(());
                        }
                    }
                }
                debug!("Persistence writer stopped");
            })
            .ok();

        if handle.is_none() {
            warn!("Failed to spawn persistence writer; durable writes will be dropped");
        }

        Self {
            tx: Some(tx),
            handle,
        }
    }

    fn send(&self, op: WriteOp) {
        if let Some(tx) = &self.tx {
            if tx.send(op).is_err() {
                warn!("Persistence writer unavailable; dropping durable write");
            }
        }
    }

    /// Enqueues an upsert.
    pub fn upsert(&self, row: MemoryRow) {
        self.send(WriteOp::Upsert(Box::new(row)));
    }

    /// Enqueues a delete.
    pub fn delete(&self, id: String) {
        self.send(WriteOp::Delete(id));
    }

    /// Blocks until every previously enqueued write has been attempted.
    pub fn flush(&self) {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.send(WriteOp::Flush(ack_tx));
        let _ = ack_rx.recv();
    }
}

impl Drop for PersistWriter {
    fn drop(&mut self) {
        // Closing the channel lets the thread drain and exit.
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    fn sample_row(id: &str) -> MemoryRow {
        MemoryRow {
            id: id.to_string(),
            agent_id: "agent-1".to_string(),
            org_id: "org-1".to_string(),
            category: "context".to_string(),
            title: "title".to_string(),
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
    fn test_writes_drain_through_flush() {
        let store = Arc::new(SqliteStore::in_memory().expect("store"));
        let writer = PersistWriter::spawn(Arc::clone(&store) as Arc<dyn MemoryStore>);

        writer.upsert(sample_row("m1"));
        writer.upsert(sample_row("m2"));
        writer.delete("m1".to_string());
        writer.flush();

        let rows = store.load_all().expect("load");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "m2");
    }

    #[test]
    fn test_drop_joins_writer() {
        let store = Arc::new(SqliteStore::in_memory().expect("store"));
        {
            let writer = PersistWriter::spawn(Arc::clone(&store) as Arc<dyn MemoryStore>);
            writer.upsert(sample_row("m1"));
            // Dropping the writer drains the queue before joining.
        }
        assert_eq!(store.load_all().expect("load").len(), 1);
    }
}
