//! Row conversion between the durable store schema and [`MemoryEntry`].
//!
//! The schema keeps enums as strings and tags/metadata as JSON-encoded text
//! columns. Decoding is explicit and fallible: a malformed JSON column
//! surfaces [`Error::Decode`], and rehydration degrades that field to its
//! empty default instead of aborting the pass. Unknown enum strings degrade
//! to the enum's default the same way.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

use crate::models::{Importance, MemoryCategory, MemoryEntry, MemoryId, MemorySource};
use crate::{Error, Result};

/// One row of the `memories` table, all columns in their stored form.
#[derive(Debug, Clone)]
pub struct MemoryRow {
    /// Entry identifier.
    pub id: String,
    /// Owning agent.
    pub agent_id: String,
    /// Owning organization.
    pub org_id: String,
    /// Category string form.
    pub category: String,
    /// Entry title.
    pub title: String,
    /// Entry content.
    pub content: String,
    /// Source string form.
    pub source: String,
    /// Importance string form.
    pub importance: String,
    /// Confidence value.
    pub confidence: f64,
    /// Access counter.
    pub access_count: i64,
    /// Last access, Unix epoch seconds.
    pub last_accessed: Option<i64>,
    /// Expiry, Unix epoch seconds.
    pub expires_at: Option<i64>,
    /// JSON-encoded tag list.
    pub tags: String,
    /// JSON-encoded metadata map.
    pub metadata: String,
    /// Creation time, Unix epoch seconds.
    pub created_at: i64,
    /// Last update, Unix epoch seconds.
    pub updated_at: i64,
}

fn to_datetime(secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or_else(Utc::now)
}

fn encode_json<T: serde::Serialize>(value: &T, empty: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| empty.to_string())
}

impl MemoryRow {
    /// Converts an entry into its stored row form.
    #[must_use]
    pub fn from_entry(entry: &MemoryEntry) -> Self {
        Self {
            id: entry.id.as_str().to_string(),
            agent_id: entry.agent_id.clone(),
            org_id: entry.org_id.clone(),
            category: entry.category.as_str().to_string(),
            title: entry.title.clone(),
            content: entry.content.clone(),
            source: entry.source.as_str().to_string(),
            importance: entry.importance.as_str().to_string(),
            confidence: entry.confidence,
            access_count: i64::try_from(entry.access_count).unwrap_or(i64::MAX),
            last_accessed: entry.last_accessed.map(|t| t.timestamp()),
            expires_at: entry.expires_at.map(|t| t.timestamp()),
            tags: encode_json(&entry.tags, "[]"),
            metadata: encode_json(&entry.metadata, "{}"),
            created_at: entry.created_at.timestamp(),
            updated_at: entry.updated_at.timestamp(),
        }
    }

    /// Decodes the JSON-encoded tags column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the column does not parse as a string
    /// list.
    pub fn decode_tags(&self) -> Result<Vec<String>> {
        serde_json::from_str(&self.tags).map_err(|e| Error::Decode {
            field: "tags".to_string(),
            cause: e.to_string(),
        })
    }

    /// Decodes the JSON-encoded metadata column.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the column does not parse as an object.
    pub fn decode_metadata(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        serde_json::from_str(&self.metadata).map_err(|e| Error::Decode {
            field: "metadata".to_string(),
            cause: e.to_string(),
        })
    }

    /// Converts the row back into a [`MemoryEntry`].
    ///
    /// Malformed JSON columns and unknown enum strings degrade to their
    /// defaults with a warning, so one bad row never aborts rehydration.
    #[must_use]
    pub fn into_entry(self) -> MemoryEntry {
        let tags = self.decode_tags().unwrap_or_else(|e| {
            warn!(memory_id = %self.id, error = %e, "Degrading malformed tags column to empty");
            Vec::new()
        });
        let metadata = self.decode_metadata().unwrap_or_else(|e| {
            warn!(memory_id = %self.id, error = %e, "Degrading malformed metadata column to empty");
            BTreeMap::new()
        });

        let category = MemoryCategory::parse(&self.category).unwrap_or_default();
        let source = MemorySource::parse(&self.source).unwrap_or_default();
        let importance = Importance::parse(&self.importance).unwrap_or_default();

        MemoryEntry {
            id: MemoryId::new(self.id),
            agent_id: self.agent_id,
            org_id: self.org_id,
            category,
            title: self.title,
            content: self.content,
            source,
            importance,
            confidence: self.confidence,
            access_count: u64::try_from(self.access_count).unwrap_or(0),
            last_accessed: self.last_accessed.map(to_datetime),
            expires_at: self.expires_at.map(to_datetime),
            tags,
            metadata,
            created_at: to_datetime(self.created_at),
            updated_at: to_datetime(self.updated_at),
        }
    }
}
