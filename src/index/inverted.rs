//! Inverted index with BM25F scoring, prefix expansion, and a bigram
//! proximity bonus.
//!
//! The index keeps, per document: a field-weighted term-frequency map, the
//! total weighted length, the set of stems present, and the ordered stem
//! sequence (title stems then content stems) used for proximity detection.
//! Postings map each stem to the set of entries containing it; a 3-character
//! prefix map enables prefix-match query expansion. The IDF table is
//! invalidated by every mutation and recomputed lazily on the next search.

use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

use super::tokenizer::tokenize;
use crate::models::MemoryId;

/// Term-frequency weight for title tokens.
pub const TITLE_WEIGHT: f64 = 3.0;
/// Term-frequency weight for tag tokens.
pub const TAG_WEIGHT: f64 = 2.0;
/// Term-frequency weight for content tokens.
pub const CONTENT_WEIGHT: f64 = 1.0;

/// BM25 term-frequency saturation parameter.
const K1: f64 = 1.2;
/// BM25 length-normalization parameter.
const B: f64 = 0.75;

/// Number of leading characters shared by stems in one prefix bucket.
const PREFIX_LEN: usize = 3;
/// Score weight for prefix-expanded terms, always below an exact match.
const EXPANSION_WEIGHT: f64 = 0.7;

/// Bonus per adjacent pair of distinct query stems in a document.
const PROXIMITY_BONUS: f64 = 0.5;
/// Cap on the total proximity bonus per document.
const PROXIMITY_CAP: f64 = 2.0;

/// Text fields of a document to be indexed.
#[derive(Debug, Clone, Copy)]
pub struct DocumentFields<'a> {
    /// Title, weighted at [`TITLE_WEIGHT`].
    pub title: &'a str,
    /// Body content, weighted at [`CONTENT_WEIGHT`].
    pub content: &'a str,
    /// Tags, each tokenized separately, weighted at [`TAG_WEIGHT`].
    pub tags: &'a [String],
}

/// Per-document index record.
#[derive(Debug, Clone)]
struct DocRecord {
    /// Stem → summed field-weighted term frequency.
    term_freqs: HashMap<String, f64>,
    /// Σ (field token count × field weight).
    weighted_len: f64,
    /// All stems present in the document.
    stems: HashSet<String>,
    /// Title stems followed by content stems, in text order.
    sequence: Vec<String>,
}

/// A scored search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// The matching document's entry ID.
    pub id: MemoryId,
    /// BM25F score including expansion weights and proximity bonus.
    pub score: f64,
}

/// Snapshot of index size, exposed for dashboards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexStats {
    /// Number of indexed documents.
    pub documents: usize,
    /// Number of distinct stems with a posting list.
    pub terms: usize,
    /// Average weighted document length.
    pub avg_weighted_len: f64,
}

/// In-memory inverted index over memory entries.
///
/// Owned exclusively by one [`crate::MemoryManager`]; no internal locking is
/// provided. `search` takes `&mut self` because the stale IDF table is
/// recomputed lazily on read.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    docs: HashMap<MemoryId, DocRecord>,
    postings: HashMap<String, HashSet<MemoryId>>,
    prefixes: HashMap<String, HashSet<String>>,
    idf: HashMap<String, f64>,
    idf_stale: bool,
    total_weighted_len: f64,
}

/// Returns the 3-character bucket prefix of a stem, if long enough.
fn bucket_prefix(stem: &str) -> Option<String> {
    let mut chars = stem.chars();
    let prefix: String = chars.by_ref().take(PREFIX_LEN).collect();
    if prefix.chars().count() == PREFIX_LEN {
        Some(prefix)
    } else {
        None
    }
}

impl InvertedIndex {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a document, fully replacing any prior version of `id`.
    pub fn add_document(&mut self, id: &MemoryId, fields: DocumentFields<'_>) {
        self.remove_document(id);

        let title_tokens = tokenize(fields.title);
        let content_tokens = tokenize(fields.content);
        let tag_tokens: Vec<String> = fields.tags.iter().flat_map(|t| tokenize(t)).collect();

        let mut term_freqs: HashMap<String, f64> = HashMap::new();
        for t in &title_tokens {
            *term_freqs.entry(t.clone()).or_insert(0.0) += TITLE_WEIGHT;
        }
        for t in &tag_tokens {
            *term_freqs.entry(t.clone()).or_insert(0.0) += TAG_WEIGHT;
        }
        for t in &content_tokens {
            *term_freqs.entry(t.clone()).or_insert(0.0) += CONTENT_WEIGHT;
        }

        #[allow(clippy::cast_precision_loss)]
        let weighted_len = title_tokens.len() as f64 * TITLE_WEIGHT
            + tag_tokens.len() as f64 * TAG_WEIGHT
            + content_tokens.len() as f64 * CONTENT_WEIGHT;

        let stems: HashSet<String> = term_freqs.keys().cloned().collect();
        for stem in &stems {
            self.postings
                .entry(stem.clone())
                .or_default()
                .insert(id.clone());
            if let Some(prefix) = bucket_prefix(stem) {
                self.prefixes.entry(prefix).or_default().insert(stem.clone());
            }
        }

        let mut sequence = title_tokens;
        sequence.extend(content_tokens);

        trace!(
            doc_id = %id,
            terms = stems.len(),
            weighted_len,
            "Indexed document"
        );

        self.docs.insert(
            id.clone(),
            DocRecord {
                term_freqs,
                weighted_len,
                stems,
                sequence,
            },
        );
        self.total_weighted_len += weighted_len;
        self.idf_stale = true;
    }

    /// Removes a document's contribution from every posting list it appears
    /// in. Empty posting lists are deleted, and prefix buckets are cleaned
    /// up when no other stem shares the prefix.
    ///
    /// Returns `false` if the document was not indexed.
    pub fn remove_document(&mut self, id: &MemoryId) -> bool {
        let Some(doc) = self.docs.remove(id) else {
            return false;
        };

        for stem in &doc.stems {
            let Some(posting) = self.postings.get_mut(stem) else {
                continue;
            };
            posting.remove(id);
            if posting.is_empty() {
                self.postings.remove(stem);
                if let Some(prefix) = bucket_prefix(stem) {
                    if let Some(bucket) = self.prefixes.get_mut(&prefix) {
                        bucket.remove(stem);
                        if bucket.is_empty() {
                            self.prefixes.remove(&prefix);
                        }
                    }
                }
            }
        }

        self.total_weighted_len -= doc.weighted_len;
        self.idf_stale = true;
        trace!(doc_id = %id, "Removed document from index");
        true
    }

    /// Whether `id` is currently indexed.
    #[must_use]
    pub fn contains(&self, id: &MemoryId) -> bool {
        self.docs.contains_key(id)
    }

    /// Returns index size statistics.
    #[must_use]
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            documents: self.docs.len(),
            terms: self.postings.len(),
            avg_weighted_len: self.avg_weighted_len(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn avg_weighted_len(&self) -> f64 {
        if self.docs.is_empty() {
            0.0
        } else {
            self.total_weighted_len / self.docs.len() as f64
        }
    }

    /// Recomputes the IDF table if any mutation has invalidated it.
    ///
    /// `idf(t) = ln((N − df + 0.5) / (df + 0.5) + 1)` over the current
    /// corpus size `N` and per-term document frequency `df`.
    #[allow(clippy::cast_precision_loss)]
    fn refresh_idf(&mut self) {
        if !self.idf_stale {
            return;
        }
        let n = self.docs.len() as f64;
        self.idf.clear();
        for (term, posting) in &self.postings {
            let df = posting.len() as f64;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            self.idf.insert(term.clone(), idf);
        }
        self.idf_stale = false;
        debug!(terms = self.idf.len(), "Refreshed IDF table");
    }

    /// Expands query terms: exact postings matches at weight 1.0, and for
    /// terms of length ≥ 3, every indexed stem sharing the 3-character
    /// prefix and textually starting with the term at weight 0.7. The
    /// expansion weight never exceeds the exact-match weight for a stem.
    fn expand_terms(&self, terms: &[String]) -> HashMap<String, f64> {
        let mut expanded: HashMap<String, f64> = HashMap::new();
        for term in terms {
            if self.postings.contains_key(term) {
                let w = expanded.entry(term.clone()).or_insert(0.0);
                *w = w.max(1.0);
            }
            if term.chars().count() < PREFIX_LEN {
                continue;
            }
            let Some(bucket) = bucket_prefix(term).and_then(|p| self.prefixes.get(&p)) else {
                continue;
            };
            for stem in bucket {
                if stem != term && stem.starts_with(term.as_str()) {
                    let w = expanded.entry(stem.clone()).or_insert(0.0);
                    *w = w.max(EXPANSION_WEIGHT);
                }
            }
        }
        expanded
    }

    /// Searches the index.
    ///
    /// Tokenizes and stems `query`, expands terms, scores every candidate
    /// with BM25F (k1 = 1.2, b = 0.75) plus the bigram proximity bonus, and
    /// returns hits with score > 0 in descending score order. Ties are
    /// broken by ascending entry ID so that identical corpora and queries
    /// always produce identical orderings.
    ///
    /// `candidate_ids`, when given, restricts the result to that set (used
    /// for per-agent and per-filter scoping).
    pub fn search(
        &mut self,
        query: &str,
        candidate_ids: Option<&HashSet<MemoryId>>,
    ) -> Vec<SearchHit> {
        self.refresh_idf();
        metrics::counter!("memory_index_searches_total").increment(1);

        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let expanded = self.expand_terms(&terms);
        if expanded.is_empty() {
            return Vec::new();
        }

        let mut candidates: HashSet<&MemoryId> = HashSet::new();
        for term in expanded.keys() {
            if let Some(posting) = self.postings.get(term) {
                for id in posting {
                    if candidate_ids.map_or(true, |allowed| allowed.contains(id)) {
                        candidates.insert(id);
                    }
                }
            }
        }

        let avg_len = self.avg_weighted_len();
        let query_stems: HashSet<&String> = expanded.keys().collect();

        let mut hits: Vec<SearchHit> = Vec::with_capacity(candidates.len());
        for id in candidates {
            let Some(doc) = self.docs.get(id) else {
                continue;
            };

            let mut score = 0.0;
            for (term, expansion_weight) in &expanded {
                let Some(&tf) = doc.term_freqs.get(term) else {
                    continue;
                };
                let idf = self.idf.get(term).copied().unwrap_or(0.0);
                let norm = if avg_len > 0.0 {
                    1.0 - B + B * (doc.weighted_len / avg_len)
                } else {
                    1.0
                };
                score += idf * (tf * (K1 + 1.0)) / (tf + K1 * norm) * expansion_weight;
            }

            let mut bonus = 0.0;
            for pair in doc.sequence.windows(2) {
                if pair[0] != pair[1]
                    && query_stems.contains(&pair[0])
                    && query_stems.contains(&pair[1])
                {
                    bonus += PROXIMITY_BONUS;
                    if bonus >= PROXIMITY_CAP {
                        bonus = PROXIMITY_CAP;
                        break;
                    }
                }
            }
            score += bonus;

            if score > 0.0 {
                hits.push(SearchHit {
                    id: id.clone(),
                    score,
                });
            }
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> MemoryId {
        MemoryId::new(s)
    }

    fn fields<'a>(title: &'a str, content: &'a str, tags: &'a [String]) -> DocumentFields<'a> {
        DocumentFields {
            title,
            content,
            tags,
        }
    }

    #[test]
    fn test_add_and_search_basic() {
        let mut index = InvertedIndex::new();
        index.add_document(&id("x"), fields("Deploy process", "how we ship", &[]));
        index.add_document(&id("y"), fields("Meeting notes", "deployment steps", &[]));

        let hits = index.search("deploy", None);
        assert_eq!(hits.len(), 2);
        // Title match (weight 3.0) outranks content-only match.
        assert_eq!(hits[0].id, id("x"));
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_add_replaces_prior_version() {
        let mut index = InvertedIndex::new();
        index.add_document(&id("x"), fields("Old title", "old words", &[]));
        index.add_document(&id("x"), fields("New title", "fresh words", &[]));

        assert_eq!(index.stats().documents, 1);
        assert!(index.search("old", None).is_empty());
        assert_eq!(index.search("fresh", None).len(), 1);
    }

    #[test]
    fn test_remove_cleans_postings_and_prefixes() {
        let mut index = InvertedIndex::new();
        index.add_document(&id("x"), fields("unique zebra", "", &[]));
        index.add_document(&id("y"), fields("shared words", "zeal", &[]));

        assert!(index.remove_document(&id("x")));
        // "zebra" posting must be gone entirely.
        assert!(!index.postings.contains_key("zebra"));
        // The "zeb" prefix bucket is gone, but "zea" (from y's "zeal") stays.
        assert!(!index.prefixes.contains_key("zeb"));
        assert!(index.prefixes.contains_key("zea"));
        assert!(!index.remove_document(&id("x")));
    }

    #[test]
    fn test_remove_keeps_shared_postings() {
        let mut index = InvertedIndex::new();
        index.add_document(&id("x"), fields("deploy guide", "", &[]));
        index.add_document(&id("y"), fields("deploy runbook", "", &[]));

        index.remove_document(&id("x"));
        let hits = index.search("deploy", None);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id("y"));
    }

    #[test]
    fn test_idf_recomputed_lazily() {
        let mut index = InvertedIndex::new();
        index.add_document(&id("x"), fields("deploy", "", &[]));
        assert!(index.idf_stale);

        index.search("deploy", None);
        assert!(!index.idf_stale);

        index.add_document(&id("y"), fields("deploy twice", "", &[]));
        assert!(index.idf_stale);
    }

    #[test]
    fn test_prefix_expansion_scores_below_exact() {
        let mut index = InvertedIndex::new();
        index.add_document(&id("x"), fields("", "the policy document", &[]));

        let exact = index.search("policy", None);
        let prefixed = index.search("polic", None);
        assert_eq!(exact.len(), 1);
        assert_eq!(prefixed.len(), 1);
        assert!(prefixed[0].score < exact[0].score);
        // Expansion weight is exactly 0.7 of the exact BM25F contribution.
        assert!((prefixed[0].score - exact[0].score * 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_expansion_never_exceeds_exact_weight() {
        let mut index = InvertedIndex::new();
        index.add_document(&id("x"), fields("", "policy and policies", &[]));

        // "policy" and "policies" stem to the same term, so the exact match
        // and its own prefix expansion collapse onto one weight of 1.0.
        let hits = index.search("policy policy", None);
        assert_eq!(hits.len(), 1);
        let single = index.search("policy", None);
        assert!((hits[0].score - single[0].score).abs() < 1e-9);
    }

    #[test]
    fn test_short_terms_not_prefix_expanded() {
        let mut index = InvertedIndex::new();
        index.add_document(&id("x"), fields("", "zebra crossing", &[]));
        // "ze" is two characters: no exact posting, no expansion.
        assert!(index.search("ze", None).is_empty());
    }

    #[test]
    fn test_proximity_bonus_orders_adjacent_terms() {
        let mut index = InvertedIndex::new();
        // Same stems, same frequencies; only adjacency differs.
        index.add_document(
            &id("adjacent"),
            fields("", "the deploy process works fine", &[]),
        );
        index.add_document(
            &id("apart"),
            fields("", "the deploy always works process", &[]),
        );

        let hits = index.search("deploy process", None);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, id("adjacent"));
        assert!(hits[0].score > hits[1].score);
        assert!((hits[0].score - hits[1].score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_proximity_bonus_capped() {
        let mut index = InvertedIndex::new();
        // Alternating pair repeated: many adjacent query bigrams.
        index.add_document(
            &id("x"),
            fields(
                "",
                "alpha beta alpha beta alpha beta alpha beta alpha beta alpha beta",
                &[],
            ),
        );
        index.add_document(&id("y"), fields("", "alpha beta", &[]));

        let hits = index.search("alpha beta", None);
        let many = &hits[0];
        assert_eq!(many.id, id("x"));
        // x gets the +2.0 cap; its BM25F part is larger too, so just check
        // the bonus cannot have exceeded the cap.
        let base: f64 = {
            let doc = &index.docs[&id("x")];
            let expanded = index.expand_terms(&[String::from("alpha"), String::from("beta")]);
            expanded
                .iter()
                .filter_map(|(term, w)| {
                    doc.term_freqs.get(term).map(|&tf| {
                        let idf = index.idf.get(term).copied().unwrap_or(0.0);
                        let norm = 1.0 - B + B * (doc.weighted_len / index.avg_weighted_len());
                        idf * (tf * (K1 + 1.0)) / (tf + K1 * norm) * w
                    })
                })
                .sum()
        };
        assert!((many.score - base - PROXIMITY_CAP).abs() < 1e-9);
    }

    #[test]
    fn test_candidate_restriction() {
        let mut index = InvertedIndex::new();
        index.add_document(&id("x"), fields("deploy", "", &[]));
        index.add_document(&id("y"), fields("deploy", "", &[]));

        let allowed: HashSet<MemoryId> = [id("y")].into_iter().collect();
        let hits = index.search("deploy", Some(&allowed));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, id("y"));
    }

    #[test]
    fn test_tag_weight_between_title_and_content() {
        let mut index = InvertedIndex::new();
        let tags = vec!["deploy".to_string()];
        index.add_document(&id("title"), fields("deploy", "", &[]));
        index.add_document(&id("tag"), fields("", "", &tags));
        index.add_document(&id("content"), fields("", "deploy", &[]));

        let hits = index.search("deploy", None);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].id, id("title"));
        assert_eq!(hits[1].id, id("tag"));
        assert_eq!(hits[2].id, id("content"));
    }

    #[test]
    fn test_deterministic_tie_break_by_id() {
        let mut index = InvertedIndex::new();
        index.add_document(&id("b"), fields("deploy", "", &[]));
        index.add_document(&id("a"), fields("deploy", "", &[]));

        let hits = index.search("deploy", None);
        assert_eq!(hits[0].id, id("a"));
        assert_eq!(hits[1].id, id("b"));

        // Identical corpus and query always produce the identical order.
        let again = index.search("deploy", None);
        assert_eq!(hits, again);
    }

    #[test]
    fn test_empty_query_and_no_match() {
        let mut index = InvertedIndex::new();
        index.add_document(&id("x"), fields("deploy", "", &[]));
        assert!(index.search("", None).is_empty());
        assert!(index.search("nonexistent", None).is_empty());
        assert!(index.search("the and of", None).is_empty());
    }

    #[test]
    fn test_stats_track_totals() {
        let mut index = InvertedIndex::new();
        assert_eq!(index.stats().documents, 0);
        assert!(index.stats().avg_weighted_len.abs() < f64::EPSILON);

        index.add_document(&id("x"), fields("one two", "three", &[]));
        let stats = index.stats();
        assert_eq!(stats.documents, 1);
        assert!(stats.terms >= 3);
        // 2 title tokens * 3.0 + 1 content token * 1.0 = 7.0
        assert!((stats.avg_weighted_len - 7.0).abs() < 1e-9);

        index.remove_document(&id("x"));
        assert_eq!(index.stats().documents, 0);
        assert!(index.stats().avg_weighted_len.abs() < f64::EPSILON);
    }
}
