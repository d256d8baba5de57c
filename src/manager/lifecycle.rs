//! Lifecycle maintenance: access tracking, confidence decay, pruning.

use chrono::{Duration, Utc};
use tracing::{debug, info};

use super::MemoryManager;
use crate::models::{Importance, MemoryEntry, MemoryId};

/// Outcome of one decay sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecayReport {
    /// Entries belonging to the agent that were examined.
    pub examined: usize,
    /// Entries whose confidence was reduced.
    pub decayed: usize,
}

impl DecayReport {
    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("decayed {} of {} memories", self.decayed, self.examined)
    }
}

/// Outcome of one pruning sweep.
#[derive(Debug, Clone, Copy, Default)]
pub struct PruneReport {
    /// Entries examined.
    pub examined: usize,
    /// Entries removed.
    pub pruned: usize,
}

impl PruneReport {
    /// One-line human summary.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("pruned {} of {} memories", self.pruned, self.examined)
    }
}

impl MemoryManager {
    /// Records a retrieval of `id`: bumps the access count and the
    /// last-accessed and updated timestamps. Returns the updated entry, or
    /// `None` if the ID is unknown. The entry's text is untouched, so the
    /// index is not rewritten.
    pub fn record_access(&mut self, id: &MemoryId) -> Option<MemoryEntry> {
        let now = Utc::now();
        let entry = self.entries.get_mut(id)?;
        entry.access_count += 1;
        entry.last_accessed = Some(now);
        entry.updated_at = now;

        let snapshot = entry.clone();
        self.persist(&snapshot);
        Some(snapshot)
    }

    /// Decays confidence for an agent's idle memories.
    ///
    /// Critical entries never decay. An entry is idle once it has gone
    /// untouched (no access, no update) for longer than the configured idle
    /// window. Confidence drops by `rate` (default from config), floored at
    /// zero; entries already at zero are left alone. Decay touches
    /// `updated_at` but not `last_accessed`, so repeated sweeps keep
    /// lowering an entry that nothing else touches.
    pub fn decay_confidence(&mut self, agent_id: &str, rate: Option<f64>) -> DecayReport {
        let rate = rate.unwrap_or(self.config.decay_rate);
        let idle_cutoff = Utc::now() - Duration::days(self.config.decay_idle_days);

        let mut report = DecayReport::default();
        let mut touched: Vec<MemoryEntry> = Vec::new();
        for id in self.agent_ids(agent_id) {
            let Some(entry) = self.entries.get_mut(&id) else {
                continue;
            };
            report.examined += 1;

            if entry.importance == Importance::Critical {
                continue;
            }
            if entry.last_touched() >= idle_cutoff {
                continue;
            }
            let next = (entry.confidence - rate).max(0.0);
            if (next - entry.confidence).abs() < f64::EPSILON {
                continue;
            }
            entry.confidence = next;
            entry.updated_at = Utc::now();
            report.decayed += 1;
            touched.push(entry.clone());
        }

        for entry in &touched {
            self.persist(entry);
        }

        metrics::counter!("memory_decayed_total").increment(report.decayed as u64);
        info!(agent_id, decayed = report.decayed, examined = report.examined, "Decay sweep complete");
        report
    }

    /// Removes entries whose confidence has fallen below the pruning floor
    /// or whose expiry has passed. Scoped to one agent when `agent_id` is
    /// given, otherwise sweeps everything.
    pub fn prune_expired(&mut self, agent_id: Option<&str>) -> PruneReport {
        let now = Utc::now();

        let candidates: Vec<MemoryId> = match agent_id {
            Some(agent) => self.agent_ids(agent).into_iter().collect(),
            None => self.entries.keys().cloned().collect(),
        };

        let mut report = PruneReport {
            examined: candidates.len(),
            ..PruneReport::default()
        };
        for id in candidates {
            let prunable = self
                .entries
                .get(&id)
                .is_some_and(|e| e.is_prunable(now));
            if prunable && self.delete(&id) {
                report.pruned += 1;
                debug!(memory_id = %id, "Pruned memory entry");
            }
        }

        metrics::counter!("memory_pruned_total").increment(report.pruned as u64);
        info!(pruned = report.pruned, examined = report.examined, "Prune sweep complete");
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::test_support::{manager, request};
    use crate::models::MemoryPatch;

    /// Rewinds an entry's clock so it looks idle.
    fn age_entry(mgr: &mut MemoryManager, id: &MemoryId, days: i64) {
        let past = Utc::now() - Duration::days(days);
        let entry = mgr.entries.get_mut(id).unwrap();
        entry.created_at = past;
        entry.updated_at = past;
        entry.last_accessed = None;
    }

    #[test]
    fn test_record_access_bumps_counters() {
        let mut mgr = manager();
        let id = mgr.create(request("agent-1", "title", "content"));
        let created_updated_at = mgr.get(&id).unwrap().updated_at;

        std::thread::sleep(std::time::Duration::from_millis(5));
        let after = mgr.record_access(&id).expect("entry");
        assert_eq!(after.access_count, 1);
        assert!(after.last_accessed.is_some());
        // An access refreshes updated_at along with last_accessed.
        assert!(after.updated_at > created_updated_at);
        assert_eq!(Some(after.updated_at), after.last_accessed);

        let after = mgr.record_access(&id).expect("entry");
        assert_eq!(after.access_count, 2);

        assert!(mgr.record_access(&MemoryId::new("missing")).is_none());
    }

    #[test]
    fn test_decay_skips_fresh_and_critical() {
        let mut mgr = manager();
        let idle = mgr.create(request("agent-1", "Idle fact", ""));
        let fresh = mgr.create(request("agent-1", "Fresh fact", ""));
        let critical =
            mgr.create(request("agent-1", "Critical rule", "").with_importance(Importance::Critical));
        age_entry(&mut mgr, &idle, 10);
        age_entry(&mut mgr, &critical, 10);

        let report = mgr.decay_confidence("agent-1", None);
        assert_eq!(report.examined, 3);
        assert_eq!(report.decayed, 1);

        assert!((mgr.get(&idle).unwrap().confidence - 0.95).abs() < 1e-9);
        assert!((mgr.get(&fresh).unwrap().confidence - 1.0).abs() < f64::EPSILON);
        assert!((mgr.get(&critical).unwrap().confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_decay_respects_recent_access() {
        let mut mgr = manager();
        let id = mgr.create(request("agent-1", "Touched fact", ""));
        age_entry(&mut mgr, &id, 10);
        mgr.entries.get_mut(&id).unwrap().last_accessed = Some(Utc::now());

        let report = mgr.decay_confidence("agent-1", None);
        assert_eq!(report.decayed, 0);
    }

    #[test]
    fn test_decay_floors_at_zero_and_repeats() {
        let mut mgr = manager();
        let id = mgr.create(request("agent-1", "Fading fact", "").with_confidence(0.07));
        age_entry(&mut mgr, &id, 10);

        let report = mgr.decay_confidence("agent-1", Some(0.05));
        assert_eq!(report.decayed, 1);
        assert!((mgr.get(&id).unwrap().confidence - 0.02).abs() < 1e-9);

        // Decay does not refresh last_accessed, so the next sweep still
        // sees the entry as idle.
        let report = mgr.decay_confidence("agent-1", Some(0.05));
        assert_eq!(report.decayed, 1);
        assert!((mgr.get(&id).unwrap().confidence).abs() < 1e-9);

        // Already at zero: nothing to do.
        let report = mgr.decay_confidence("agent-1", Some(0.05));
        assert_eq!(report.decayed, 0);
    }

    #[test]
    fn test_prune_low_confidence_and_expired() {
        let mut mgr = manager();
        let low = mgr.create(request("agent-1", "Low conf", "").with_confidence(0.05));
        let expired = mgr.create(
            request("agent-1", "Expired", "").with_expires_at(Utc::now() - Duration::hours(1)),
        );
        let future = mgr.create(
            request("agent-1", "Future expiry", "").with_expires_at(Utc::now() + Duration::days(1)),
        );
        let healthy = mgr.create(request("agent-1", "Healthy", ""));
        let boundary = mgr.create(request("agent-1", "At floor", "").with_confidence(0.1));

        let report = mgr.prune_expired(Some("agent-1"));
        assert_eq!(report.examined, 5);
        assert_eq!(report.pruned, 2);

        assert!(mgr.get(&low).is_none());
        assert!(mgr.get(&expired).is_none());
        assert!(mgr.get(&future).is_some());
        assert!(mgr.get(&healthy).is_some());
        // Exactly at the floor is not below it.
        assert!(mgr.get(&boundary).is_some());

        // Pruned entries leave the index too.
        assert!(mgr.index.search("expired", None).is_empty());
    }

    #[test]
    fn test_prune_all_agents() {
        let mut mgr = manager();
        mgr.create(request("agent-1", "a", "").with_confidence(0.01));
        mgr.create(request("agent-2", "b", "").with_confidence(0.01));
        mgr.create(request("agent-2", "c", ""));

        let report = mgr.prune_expired(None);
        assert_eq!(report.examined, 3);
        assert_eq!(report.pruned, 2);
        assert_eq!(mgr.entry_count(), 1);
    }

    #[test]
    fn test_decay_then_prune_removes_entry() {
        let mut mgr = manager();
        let id = mgr.create(request("agent-1", "Doomed fact", "").with_confidence(0.12));
        age_entry(&mut mgr, &id, 10);

        mgr.decay_confidence("agent-1", Some(0.05));
        assert!((mgr.get(&id).unwrap().confidence - 0.07).abs() < 1e-9);

        let report = mgr.prune_expired(Some("agent-1"));
        assert_eq!(report.pruned, 1);
        assert!(mgr.get(&id).is_none());
    }

    #[test]
    fn test_report_summaries() {
        let decay = DecayReport {
            examined: 4,
            decayed: 2,
        };
        assert_eq!(decay.summary(), "decayed 2 of 4 memories");

        let prune = PruneReport {
            examined: 3,
            pruned: 1,
        };
        assert_eq!(prune.summary(), "pruned 1 of 3 memories");
    }

    #[test]
    fn test_update_confidence_then_prune() {
        let mut mgr = manager();
        let id = mgr.create(request("agent-1", "title", "content"));
        mgr.update(
            &id,
            MemoryPatch {
                confidence: Some(0.0),
                ..Default::default()
            },
        );
        let report = mgr.prune_expired(Some("agent-1"));
        assert_eq!(report.pruned, 1);
    }
}
