//! Query filters and scored results.

use super::{Importance, MemoryCategory, MemoryEntry, MemorySource};

/// Equality filters applied before scoring.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilter {
    /// Restrict to one category.
    pub category: Option<MemoryCategory>,
    /// Restrict to one importance level.
    pub importance: Option<Importance>,
    /// Restrict to one source.
    pub source: Option<MemorySource>,
}

impl MemoryFilter {
    /// Creates an empty filter (matches all).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            category: None,
            importance: None,
            source: None,
        }
    }

    /// Restricts to a category.
    #[must_use]
    pub const fn with_category(mut self, category: MemoryCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Restricts to an importance level.
    #[must_use]
    pub const fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = Some(importance);
        self
    }

    /// Restricts to a source.
    #[must_use]
    pub const fn with_source(mut self, source: MemorySource) -> Self {
        self.source = Some(source);
        self
    }

    /// Whether `entry` passes every set filter.
    #[must_use]
    pub fn matches(&self, entry: &MemoryEntry) -> bool {
        if self.category.is_some_and(|c| c != entry.category) {
            return false;
        }
        if self.importance.is_some_and(|i| i != entry.importance) {
            return false;
        }
        if self.source.is_some_and(|s| s != entry.source) {
            return false;
        }
        true
    }
}

/// A memory entry paired with its ranking score.
#[derive(Debug, Clone)]
pub struct ScoredMemory {
    /// The matched entry.
    pub entry: MemoryEntry,
    /// Blended score (index relevance × importance weight for text queries,
    /// importance weight alone otherwise).
    pub score: f64,
}
