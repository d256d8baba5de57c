//! Durable storage behind the memory manager.
//!
//! The manager treats the store as a consumed collaborator: on startup every
//! row is loaded and decoded to fully rehydrate the in-memory state, and all
//! later writes flow through the background [`writer::PersistWriter`] so the
//! in-memory mutation is never blocked on (or rolled back by) persistence.

mod row;
mod sqlite;
pub mod writer;

pub use row::MemoryRow;
pub use sqlite::SqliteStore;

use crate::Result;

/// Durable row store consumed by the memory manager.
///
/// Implementations must be safe to call from the background persistence
/// thread (`Send + Sync`). Failures are logged by the writer, never
/// propagated to the mutating caller.
pub trait MemoryStore: Send + Sync {
    /// Inserts or fully replaces a row.
    fn upsert(&self, row: &MemoryRow) -> Result<()>;

    /// Deletes a row, returning whether it existed.
    fn delete(&self, id: &str) -> Result<bool>;

    /// Loads every stored row for rehydration. No partial or lazy loading.
    fn load_all(&self) -> Result<Vec<MemoryRow>>;
}
