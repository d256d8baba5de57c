//! Approximate English suffix-stripping stemmer.
//!
//! The stemmer walks an ordered rule table of `(suffix, replacement,
//! min_len)` triples and applies the first rule whose suffix matches and
//! whose minimum input length is met — never more than one rule per word.
//! After a rule fires, a trailing doubled consonant is collapsed by one
//! character, so `setting` → `sett` → `set` and `processes` → `process` →
//! `proces` land on the same stem as `process` → `proces`.
//!
//! This is not a complete Porter stemmer; its only contract is determinism:
//! the same word always maps to the same stem.

/// A single suffix rule: pattern, replacement, minimum input length.
struct Rule {
    suffix: &'static str,
    replacement: &'static str,
    min_len: usize,
}

const fn rule(suffix: &'static str, replacement: &'static str, min_len: usize) -> Rule {
    Rule {
        suffix,
        replacement,
        min_len,
    }
}

/// Ordered rule table. Longer suffixes come first so they win over their
/// own tails (`ments` before `ment` before `s`).
static RULES: &[Rule] = &[
    rule("ization", "ize", 9),
    rule("ational", "ate", 10),
    rule("fulness", "ful", 10),
    rule("ousness", "ous", 10),
    rule("iveness", "ive", 10),
    rule("tional", "tion", 9),
    rule("ments", "", 9),
    rule("ment", "", 8),
    rule("ingly", "", 8),
    rule("fully", "ful", 8),
    rule("edly", "", 7),
    rule("ings", "", 7),
    rule("ing", "", 6),
    rule("iest", "y", 6),
    rule("ies", "y", 5),
    rule("ied", "y", 5),
    rule("ier", "y", 5),
    rule("ly", "", 5),
    rule("ed", "", 5),
    rule("es", "", 5),
    rule("s", "", 4),
];

fn is_consonant(c: char) -> bool {
    c.is_ascii_alphabetic() && !matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

/// Collapses a trailing doubled consonant by one character.
fn collapse_double(stem: &mut String) {
    let mut chars = stem.chars().rev();
    if let (Some(last), Some(prev)) = (chars.next(), chars.next()) {
        if last == prev && is_consonant(last) {
            stem.pop();
        }
    }
}

/// Stems a single lowercase word.
///
/// Words that match no rule are returned unchanged.
#[must_use]
pub fn stem(word: &str) -> String {
    for r in RULES {
        if word.len() >= r.min_len && word.ends_with(r.suffix) {
            let mut out = String::with_capacity(word.len());
            out.push_str(&word[..word.len() - r.suffix.len()]);
            out.push_str(r.replacement);
            collapse_double(&mut out);
            return out;
        }
    }
    word.to_string()
}
