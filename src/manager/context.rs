//! Context compilation: turning ranked memories into a bounded text block.

use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;

use super::MemoryManager;
use crate::models::{Importance, MemoryCategory, MemoryEntry, MemoryId};

/// Estimated characters per token when sizing the context budget.
const CHARS_PER_TOKEN: usize = 4;

/// Composite ranking weights for one entry.
fn composite_score(entry: &MemoryEntry, normalized_relevance: f64, now: chrono::DateTime<Utc>) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let access_weight = 1.0 + 0.3 * (1.0 + entry.access_count as f64).ln();

    let age_secs = (now - entry.last_touched()).num_seconds().max(0);
    #[allow(clippy::cast_precision_loss)]
    let age_hours = (age_secs as f64 / 3600.0).max(1.0);
    let recency_weight = 1.0 / (1.0 + 0.2 * (1.0 + age_hours / 24.0).ln());

    let relevance_multiplier = 1.0 + 3.0 * normalized_relevance;

    entry.confidence
        * access_weight
        * recency_weight
        * entry.importance.weight()
        * relevance_multiplier
}

fn entry_line(entry: &MemoryEntry) -> String {
    let badge = match entry.importance {
        Importance::Critical => "[critical] ",
        Importance::High => "[high] ",
        Importance::Normal | Importance::Low => "",
    };
    format!("- {badge}**{}**: {}\n", entry.title, entry.content)
}

impl MemoryManager {
    /// Compiles an agent's memories into a Markdown-like context block for
    /// prompt injection.
    ///
    /// Only entries with confidence at or above the pruning floor are
    /// considered. When `query_text` is given, index scores are normalized
    /// against the top hit and folded into each entry's composite score
    /// (`confidence × accessWeight × recencyWeight × importanceWeight ×
    /// relevanceMultiplier`). Entries are grouped by category in composite
    /// order and rendered one line each under a category header; output is
    /// greedily truncated once the `max_tokens × 4` character budget would
    /// be exceeded (`None` falls back to the configured default budget). A
    /// header is only emitted if the header itself fits.
    pub fn generate_memory_context(
        &mut self,
        agent_id: &str,
        query_text: Option<&str>,
        max_tokens: Option<usize>,
    ) -> String {
        let max_tokens = max_tokens.unwrap_or(self.config.default_context_tokens);
        let now = Utc::now();
        let floor = self.config.prune_confidence_floor;
        let eligible: std::collections::HashSet<MemoryId> = self
            .agent_ids(agent_id)
            .into_iter()
            .filter(|id| {
                self.entries
                    .get(id)
                    .is_some_and(|e| e.confidence >= floor)
            })
            .collect();

        // Normalized relevance: top hit = 1.0, no hits = all zero.
        let mut relevance: HashMap<MemoryId, f64> = HashMap::new();
        if let Some(query) = query_text {
            let hits = self.index.search(query, Some(&eligible));
            if let Some(max) = hits.first().map(|h| h.score) {
                if max > 0.0 {
                    for hit in hits {
                        relevance.insert(hit.id, hit.score / max);
                    }
                }
            }
        }

        let mut ranked: Vec<(&MemoryEntry, f64)> = eligible
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|entry| {
                let norm = relevance.get(&entry.id).copied().unwrap_or(0.0);
                (entry, composite_score(entry, norm, now))
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });

        // Group by category, preserving composite order both across and
        // within groups.
        let mut order: Vec<MemoryCategory> = Vec::new();
        let mut groups: HashMap<MemoryCategory, Vec<&MemoryEntry>> = HashMap::new();
        for (entry, _) in ranked {
            if !groups.contains_key(&entry.category) {
                order.push(entry.category);
            }
            groups.entry(entry.category).or_default().push(entry);
        }

        let budget = max_tokens * CHARS_PER_TOKEN;
        let mut out = String::new();
        'sections: for category in order {
            let header = if out.is_empty() {
                format!("## {}\n", category.display_name())
            } else {
                format!("\n## {}\n", category.display_name())
            };
            if out.len() + header.len() > budget {
                break;
            }
            out.push_str(&header);

            for entry in &groups[&category] {
                let line = entry_line(entry);
                if out.len() + line.len() > budget {
                    break 'sections;
                }
                out.push_str(&line);
            }
        }

        debug!(
            agent_id,
            with_query = query_text.is_some(),
            chars = out.len(),
            budget,
            "Compiled memory context"
        );
        out
    }
}
