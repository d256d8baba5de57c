//! Domain models: memory entries, policies, and query types.

mod memory;
mod policy;
mod query;

pub use memory::{
    Importance, MemoryCategory, MemoryEntry, MemoryId, MemoryPatch, MemorySource, NewMemory,
};
pub use policy::{Enforcement, PolicyDocument};
pub use query::{MemoryFilter, ScoredMemory};
