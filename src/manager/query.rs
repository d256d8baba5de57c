//! Query path: filtered, importance-weighted retrieval.

use tracing::debug;

use super::MemoryManager;
use crate::models::{MemoryFilter, ScoredMemory};

impl MemoryManager {
    /// Queries an agent's memories.
    ///
    /// Restricts to the agent's entries, applies the equality `filter`, and
    /// then either scores the survivors through the inverted index (when
    /// `query_text` is given) with each hit's score multiplied by its
    /// importance weight, or sorts by importance weight descending with
    /// creation time descending as tie-break. At most `limit` results are
    /// returned, highest first; `None` falls back to the configured default
    /// limit.
    pub fn query_memories(
        &mut self,
        agent_id: &str,
        filter: &MemoryFilter,
        query_text: Option<&str>,
        limit: Option<usize>,
    ) -> Vec<ScoredMemory> {
        metrics::counter!("memory_queries_total").increment(1);
        let limit = limit.unwrap_or(self.config.default_query_limit);

        let candidates: std::collections::HashSet<_> = self
            .agent_ids(agent_id)
            .into_iter()
            .filter(|id| self.entries.get(id).is_some_and(|e| filter.matches(e)))
            .collect();

        let mut results: Vec<ScoredMemory> = if let Some(query) = query_text {
            self.index
                .search(query, Some(&candidates))
                .into_iter()
                .filter_map(|hit| {
                    self.entries.get(&hit.id).map(|entry| ScoredMemory {
                        score: hit.score * entry.importance.weight(),
                        entry: entry.clone(),
                    })
                })
                .collect()
        } else {
            candidates
                .iter()
                .filter_map(|id| self.entries.get(id))
                .map(|entry| ScoredMemory {
                    score: entry.importance.weight(),
                    entry: entry.clone(),
                })
                .collect()
        };

        if query_text.is_some() {
            // Importance weighting can reorder index hits; re-sort with the
            // same deterministic tie-break.
            results.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.entry.id.cmp(&b.entry.id))
            });
        } else {
            results.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| b.entry.created_at.cmp(&a.entry.created_at))
                    .then_with(|| a.entry.id.cmp(&b.entry.id))
            });
        }
        results.truncate(limit);

        debug!(
            agent_id,
            with_query = query_text.is_some(),
            results = results.len(),
            "Queried memories"
        );
        results
    }
}
