//! Text tokenization and normalization.
//!
//! Splits input on runs of non-alphanumeric characters, lowercases,
//! drops single-character tokens and stop words, and stems what remains.

use once_cell::sync::Lazy;
use std::collections::HashSet;

use super::stemmer::stem;

/// Common English stop words excluded from indexing and queries.
static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does",
        "did", "will", "would", "could", "should", "may", "might", "must", "can", "this", "that",
        "these", "those", "it", "its", "as", "from", "not", "no", "so", "if", "then", "than",
        "there", "their", "they", "them", "he", "she", "his", "her", "we", "our", "you", "your",
        "i", "me", "my", "what", "when", "where", "which", "who", "how", "all", "each", "any",
        "some", "such", "into", "about", "over", "under", "again", "also", "just", "very", "more",
        "most", "only", "own", "same", "too",
    ]
    .into_iter()
    .collect()
});

/// Tokenizes and stems `text` into normalized index terms.
///
/// The output preserves input order (the index uses it for proximity) and
/// may contain duplicates.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() > 1)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(t.as_str()))
        .map(|t| stem(&t))
        .collect()
}
