//! The memory manager: entry ownership, index mutation, ranking, lifecycle.
//!
//! One manager instance exclusively owns its entries and inverted index.
//! It is single-writer by design: no internal locking is provided, and
//! concurrent mutation must be externally serialized (one owning task, or an
//! external mutex). Every mutation is applied in memory first and then
//! enqueued to the background persistence writer; a persistence failure is
//! logged, never propagated or rolled back.

mod context;
mod lifecycle;
mod query;

pub use lifecycle::{DecayReport, PruneReport};

use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::MemoryConfig;
use crate::index::{DocumentFields, IndexStats, InvertedIndex};
use crate::models::{
    Enforcement, Importance, MemoryCategory, MemoryEntry, MemoryId, MemoryPatch, MemorySource,
    NewMemory, PolicyDocument,
};
use crate::storage::writer::PersistWriter;
use crate::storage::{MemoryRow, MemoryStore};
use crate::Result;

/// Owns an agent population's memory entries and their retrieval index.
pub struct MemoryManager {
    config: MemoryConfig,
    entries: HashMap<MemoryId, MemoryEntry>,
    by_agent: HashMap<String, HashSet<MemoryId>>,
    index: InvertedIndex,
    writer: PersistWriter,
}

impl MemoryManager {
    /// Loads a manager from the durable store, fully rehydrating the
    /// per-agent index and the inverted index. Rows with malformed JSON
    /// columns degrade to empty defaults rather than aborting the pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(store: Arc<dyn MemoryStore>, config: MemoryConfig) -> Result<Self> {
        let rows = store.load_all()?;
        let mut manager = Self {
            config,
            entries: HashMap::with_capacity(rows.len()),
            by_agent: HashMap::new(),
            index: InvertedIndex::new(),
            writer: PersistWriter::spawn(store),
        };

        let count = rows.len();
        for row in rows {
            let entry = row.into_entry();
            manager.attach(entry);
        }
        info!(entries = count, "Rehydrated memory manager");
        Ok(manager)
    }

    /// Inserts an entry into the in-memory maps and the inverted index.
    fn attach(&mut self, entry: MemoryEntry) {
        self.index.add_document(
            &entry.id,
            DocumentFields {
                title: &entry.title,
                content: &entry.content,
                tags: &entry.tags,
            },
        );
        self.by_agent
            .entry(entry.agent_id.clone())
            .or_default()
            .insert(entry.id.clone());
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Enqueues a durable write for `entry`.
    fn persist(&self, entry: &MemoryEntry) {
        self.writer.upsert(MemoryRow::from_entry(entry));
    }

    /// Creates a new entry and returns its ID.
    pub fn create(&mut self, request: NewMemory) -> MemoryId {
        let now = Utc::now();
        let entry = MemoryEntry {
            id: MemoryId::generate(),
            agent_id: request.agent_id,
            org_id: request.org_id,
            category: request.category,
            title: request.title,
            content: request.content,
            source: request.source,
            importance: request.importance,
            confidence: request.confidence,
            access_count: 0,
            last_accessed: None,
            expires_at: request.expires_at,
            tags: request.tags,
            metadata: request.metadata,
            created_at: now,
            updated_at: now,
        };
        let id = entry.id.clone();
        debug!(memory_id = %id, agent_id = %entry.agent_id, "Created memory entry");

        // In-memory state first; the durable write is fire-and-forget.
        let row = MemoryRow::from_entry(&entry);
        self.attach(entry);
        self.writer.upsert(row);
        id
    }

    /// Seeds a memory entry from a policy document.
    ///
    /// Enforcement maps to importance (mandatory → critical, recommended →
    /// high, optional → normal); confidence starts at 1.0 and the entry is
    /// tagged `policy` plus the policy's category.
    pub fn create_from_policy(&mut self, agent_id: &str, policy: &PolicyDocument) -> MemoryId {
        let importance = match policy.enforcement {
            Enforcement::Mandatory => Importance::Critical,
            Enforcement::Recommended => Importance::High,
            Enforcement::Optional => Importance::Normal,
        };

        let mut metadata = BTreeMap::new();
        metadata.insert(
            "policy_id".to_string(),
            serde_json::Value::String(policy.id.clone()),
        );

        let mut request = NewMemory::new(agent_id, &*policy.org_id, &*policy.name, &*policy.content)
            .with_category(MemoryCategory::OrganizationalKnowledge)
            .with_source(MemorySource::Onboarding)
            .with_importance(importance)
            .with_confidence(1.0)
            .with_tags(vec!["policy".to_string(), policy.category.clone()]);
        request.metadata = metadata;

        self.create(request)
    }

    /// Returns an entry by ID, or `None` if unknown. Does not count as an
    /// access; use [`record_access`](Self::record_access) for that.
    #[must_use]
    pub fn get(&self, id: &MemoryId) -> Option<&MemoryEntry> {
        self.entries.get(id)
    }

    /// Applies a partial update. Text edits (title/content/tags) trigger a
    /// full reindex of the entry; other edits only touch the record.
    ///
    /// Returns the updated entry, or `None` if the ID is unknown.
    pub fn update(&mut self, id: &MemoryId, patch: MemoryPatch) -> Option<MemoryEntry> {
        let reindex = patch.touches_text();
        let entry = self.entries.get_mut(id)?;

        if let Some(title) = patch.title {
            entry.title = title;
        }
        if let Some(content) = patch.content {
            entry.content = content;
        }
        if let Some(tags) = patch.tags {
            entry.tags = tags;
        }
        if let Some(category) = patch.category {
            entry.category = category;
        }
        if let Some(importance) = patch.importance {
            entry.importance = importance;
        }
        if let Some(confidence) = patch.confidence {
            entry.confidence = confidence;
        }
        if let Some(expires_at) = patch.expires_at {
            entry.expires_at = expires_at;
        }
        entry.updated_at = Utc::now();

        let snapshot = entry.clone();
        if reindex {
            self.index.add_document(
                id,
                DocumentFields {
                    title: &snapshot.title,
                    content: &snapshot.content,
                    tags: &snapshot.tags,
                },
            );
        }
        self.persist(&snapshot);
        debug!(memory_id = %id, reindexed = reindex, "Updated memory entry");
        Some(snapshot)
    }

    /// Deletes an entry, returning whether it existed.
    pub fn delete(&mut self, id: &MemoryId) -> bool {
        let Some(entry) = self.entries.remove(id) else {
            return false;
        };
        if let Some(ids) = self.by_agent.get_mut(&entry.agent_id) {
            ids.remove(id);
            if ids.is_empty() {
                self.by_agent.remove(&entry.agent_id);
            }
        }
        self.index.remove_document(id);
        self.writer.delete(id.as_str().to_string());
        debug!(memory_id = %id, "Deleted memory entry");
        true
    }

    /// Number of entries currently held.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Inverted-index statistics, exposed for dashboards.
    #[must_use]
    pub fn index_stats(&self) -> IndexStats {
        self.index.stats()
    }

    /// Blocks until all enqueued durable writes have been attempted.
    ///
    /// The default write path is fire-and-forget; this barrier exists for
    /// shutdown paths and tests that assert on the durable state.
    pub fn flush_persistence(&self) {
        self.writer.flush();
    }

    /// IDs owned by `agent_id`.
    fn agent_ids(&self, agent_id: &str) -> HashSet<MemoryId> {
        self.by_agent.get(agent_id).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::storage::SqliteStore;

    /// Manager over a throwaway in-memory store.
    pub fn manager() -> MemoryManager {
        let store = Arc::new(SqliteStore::in_memory().expect("in-memory store"));
        MemoryManager::load(store, MemoryConfig::default()).expect("load")
    }

    pub fn request(agent: &str, title: &str, content: &str) -> NewMemory {
        NewMemory::new(agent, "org-1", title, content)
    }
}
