//! Memory entry types and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::PRUNE_CONFIDENCE_FLOOR;

/// Unique identifier for a memory entry.
///
/// Implements `Ord` so that score ties can be broken deterministically by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryId(String);

impl MemoryId {
    /// Creates a new memory ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MemoryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MemoryId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Category of knowledge a memory entry captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryCategory {
    /// Facts about the organization: processes, policies, structure.
    #[default]
    OrganizationalKnowledge,
    /// Recurring patterns observed in interactions.
    InteractionPattern,
    /// Stated preferences of users or the organization.
    Preference,
    /// Corrections issued to the agent.
    Correction,
    /// Skills and capabilities the agent has learned.
    Skill,
    /// Situational context for ongoing work.
    Context,
    /// The agent's own reflections.
    Reflection,
}

impl MemoryCategory {
    /// Returns the category as its stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OrganizationalKnowledge => "organizational-knowledge",
            Self::InteractionPattern => "interaction-pattern",
            Self::Preference => "preference",
            Self::Correction => "correction",
            Self::Skill => "skill",
            Self::Context => "context",
            Self::Reflection => "reflection",
        }
    }

    /// Human-readable heading used when rendering context sections.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::OrganizationalKnowledge => "Organizational Knowledge",
            Self::InteractionPattern => "Interaction Patterns",
            Self::Preference => "Preferences",
            Self::Correction => "Corrections",
            Self::Skill => "Skills",
            Self::Context => "Context",
            Self::Reflection => "Reflections",
        }
    }

    /// Parses a stored string form; unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "organizational-knowledge" => Some(Self::OrganizationalKnowledge),
            "interaction-pattern" => Some(Self::InteractionPattern),
            "preference" => Some(Self::Preference),
            "correction" => Some(Self::Correction),
            "skill" => Some(Self::Skill),
            "context" => Some(Self::Context),
            "reflection" => Some(Self::Reflection),
            _ => None,
        }
    }
}

/// Origin of a memory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MemorySource {
    /// Seeded during agent onboarding (including policy documents).
    Onboarding,
    /// Captured from a live interaction.
    #[default]
    Interaction,
    /// Entered by an administrator.
    Admin,
    /// Produced by the agent's own reflection pass.
    SelfReflection,
    /// Recorded from an explicit correction.
    Correction,
}

impl MemorySource {
    /// Returns the source as its stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Onboarding => "onboarding",
            Self::Interaction => "interaction",
            Self::Admin => "admin",
            Self::SelfReflection => "self-reflection",
            Self::Correction => "correction",
        }
    }

    /// Parses a stored string form; unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "onboarding" => Some(Self::Onboarding),
            "interaction" => Some(Self::Interaction),
            "admin" => Some(Self::Admin),
            "self-reflection" => Some(Self::SelfReflection),
            "correction" => Some(Self::Correction),
            _ => None,
        }
    }
}

/// Importance level assigned to a memory entry.
///
/// Critical entries are exempt from confidence decay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    /// Must never be forgotten; exempt from decay.
    Critical,
    /// Strongly weighted in ranking.
    High,
    /// Baseline importance.
    #[default]
    Normal,
    /// Weakly weighted; first to fade.
    Low,
}

impl Importance {
    /// Ranking weight applied when blending with index scores.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        match self {
            Self::Critical => 4.0,
            Self::High => 3.0,
            Self::Normal => 2.0,
            Self::Low => 1.0,
        }
    }

    /// Returns the importance as its stored string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    /// Parses a stored string form; unknown values yield `None`.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "normal" => Some(Self::Normal),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// A stored memory fact owned by one agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    /// Unique identifier.
    pub id: MemoryId,
    /// The agent that owns this entry.
    pub agent_id: String,
    /// The organization the agent belongs to.
    pub org_id: String,
    /// Knowledge category.
    pub category: MemoryCategory,
    /// Short title, weighted highest by the index.
    pub title: String,
    /// Full content.
    pub content: String,
    /// Where the entry came from.
    pub source: MemorySource,
    /// Importance level; critical entries never decay.
    pub importance: Importance,
    /// Confidence in `0.0..=1.0` (caller contract, not enforced here).
    /// Entries below 0.1 are eligible for pruning.
    pub confidence: f64,
    /// Number of times the entry has been surfaced.
    pub access_count: u64,
    /// Last time the entry was surfaced, if ever.
    pub last_accessed: Option<DateTime<Utc>>,
    /// Optional expiry; entries past it are pruned.
    pub expires_at: Option<DateTime<Utc>>,
    /// Ordered tags, weighted between title and content by the index.
    pub tags: Vec<String>,
    /// Free-form metadata, JSON-encoded in the durable store.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl MemoryEntry {
    /// Returns the moment the entry was last touched: last access if any,
    /// otherwise creation.
    #[must_use]
    pub fn last_touched(&self) -> DateTime<Utc> {
        self.last_accessed.unwrap_or(self.created_at)
    }

    /// Whether this entry is eligible for removal: confidence below the
    /// pruning floor, or expiry at or before `now`.
    #[must_use]
    pub fn is_prunable(&self, now: DateTime<Utc>) -> bool {
        if self.confidence < PRUNE_CONFIDENCE_FLOOR {
            return true;
        }
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Request to create a new memory entry.
///
/// Defaults: normal importance, interaction source, confidence 1.0, default
/// category, no tags, no expiry.
#[derive(Debug, Clone)]
pub struct NewMemory {
    /// The owning agent.
    pub agent_id: String,
    /// The owning organization.
    pub org_id: String,
    /// Entry title.
    pub title: String,
    /// Entry content.
    pub content: String,
    /// Knowledge category.
    pub category: MemoryCategory,
    /// Origin of the entry.
    pub source: MemorySource,
    /// Importance level.
    pub importance: Importance,
    /// Initial confidence.
    pub confidence: f64,
    /// Tags.
    pub tags: Vec<String>,
    /// Metadata map.
    pub metadata: BTreeMap<String, serde_json::Value>,
    /// Optional expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewMemory {
    /// Creates a capture request with defaults for everything but the
    /// identity and text fields.
    #[must_use]
    pub fn new(
        agent_id: impl Into<String>,
        org_id: impl Into<String>,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            org_id: org_id.into(),
            title: title.into(),
            content: content.into(),
            category: MemoryCategory::default(),
            source: MemorySource::default(),
            importance: Importance::default(),
            confidence: 1.0,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
            expires_at: None,
        }
    }

    /// Sets the category.
    #[must_use]
    pub const fn with_category(mut self, category: MemoryCategory) -> Self {
        self.category = category;
        self
    }

    /// Sets the source.
    #[must_use]
    pub const fn with_source(mut self, source: MemorySource) -> Self {
        self.source = source;
        self
    }

    /// Sets the importance.
    #[must_use]
    pub const fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    /// Sets the initial confidence.
    #[must_use]
    pub const fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Sets the expiry.
    #[must_use]
    pub const fn with_expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }
}

/// Partial update to an existing entry.
///
/// Text edits (`title`, `content`, `tags`) trigger a full reindex; the other
/// fields only touch the entry record.
#[derive(Debug, Clone, Default)]
pub struct MemoryPatch {
    /// New title, if changing.
    pub title: Option<String>,
    /// New content, if changing.
    pub content: Option<String>,
    /// New tags, if changing.
    pub tags: Option<Vec<String>>,
    /// New category, if changing.
    pub category: Option<MemoryCategory>,
    /// New importance, if changing.
    pub importance: Option<Importance>,
    /// New confidence, if changing.
    pub confidence: Option<f64>,
    /// New expiry; `Some(None)` clears it.
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl MemoryPatch {
    /// Whether applying this patch changes indexed text.
    #[must_use]
    pub const fn touches_text(&self) -> bool {
        self.title.is_some() || self.content.is_some() || self.tags.is_some()
    }
}
