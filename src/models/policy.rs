//! Policy documents consumed when seeding agent memory.

use serde::{Deserialize, Serialize};

/// How strictly a policy is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Enforcement {
    /// Must always be followed; seeds critical-importance memory.
    Mandatory,
    /// Should be followed; seeds high-importance memory.
    Recommended,
    /// Guidance only; seeds normal-importance memory.
    #[default]
    Optional,
}

/// A policy document supplied by the platform's policy producer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Policy identifier.
    pub id: String,
    /// Owning organization.
    pub org_id: String,
    /// Policy name, used as the seeded entry's title.
    pub name: String,
    /// Policy category label (e.g. "security", "communication").
    pub category: String,
    /// Policy body, used as the seeded entry's content.
    pub content: String,
    /// Enforcement level, mapped to memory importance.
    pub enforcement: Enforcement,
}
