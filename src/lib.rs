//! # Mnemon
//!
//! Agent memory retrieval and lifecycle engine for AI workforce platforms.
//!
//! Mnemon stores the facts an agent accumulates — onboarding knowledge,
//! interaction patterns, corrections, preferences — and turns them back into
//! a bounded natural-language context block for prompt injection. Retrieval
//! is backed by a from-scratch full-text index: suffix-stripping stemmer,
//! inverted postings with field-weighted term frequencies, BM25F scoring,
//! prefix expansion, and a bigram proximity bonus.
//!
//! ## Architecture
//!
//! - [`index`] — tokenizer, stemmer, and the inverted index with its lazily
//!   recomputed IDF cache.
//! - [`manager`] — the [`MemoryManager`], which owns the entries and the
//!   index, blends textual relevance with confidence, importance, recency,
//!   and access frequency, and drives the decay/prune lifecycle.
//! - [`storage`] — the durable store behind the manager: a typed row schema
//!   over `SQLite` plus a background writer for fire-and-forget persistence.
//!
//! The manager is single-writer by design: no internal locking is provided,
//! so concurrent mutation must be externally serialized.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mnemon::{MemoryConfig, MemoryManager, NewMemory};
//! use mnemon::storage::SqliteStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(SqliteStore::open("memories.db")?);
//! let mut manager = MemoryManager::load(store, MemoryConfig::default())?;
//! manager.create(NewMemory::new("agent-1", "org-1", "Deploy process", "..."));
//! let context = manager.generate_memory_context("agent-1", Some("deploy"), None);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod index;
pub mod manager;
pub mod models;
pub mod storage;

// Re-exports for convenience
pub use config::MemoryConfig;
pub use index::{InvertedIndex, SearchHit};
pub use manager::{DecayReport, MemoryManager, PruneReport};
pub use models::{
    Enforcement, Importance, MemoryCategory, MemoryEntry, MemoryFilter, MemoryId, MemoryPatch,
    MemorySource, NewMemory, PolicyDocument, ScoredMemory,
};
pub use storage::{MemoryStore, SqliteStore};

/// Error type for mnemon operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait
/// implementations. Not-found conditions are expressed as `Option`, never as
/// an error, and an empty result set is a normal outcome.
#[derive(Debug, ThisError)]
pub enum Error {
    /// An operation failed.
    ///
    /// Raised when `SQLite` statements fail to prepare or execute, or the
    /// persistence writer cannot be reached.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A stored column failed to decode.
    ///
    /// Raised when a JSON-encoded column (tags, metadata) does not parse.
    /// Rehydration catches this, logs it, and degrades the field to its
    /// empty default rather than aborting the pass.
    #[error("failed to decode stored field '{field}': {cause}")]
    Decode {
        /// The column that failed to decode.
        field: String,
        /// The underlying cause.
        cause: String,
    },
}

/// Result type alias for mnemon operations.
pub type Result<T> = std::result::Result<T, Error>;
