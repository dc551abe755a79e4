//! Word-overlap similarity between two facts.
//!
//! Facts are compared on their sets of distinct four-plus-letter words after
//! lowercasing and dropping the shared subject phrase. Short words stand in
//! for a stopword list.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use shared_types::SUBJECT_PHRASE;

// ASCII word boundaries: a letter like "ü" splits words rather than joining them.
static THEME_WORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u:\b)[a-z]{4,}(?-u:\b)").expect("theme word regex is valid")
});

/// Distinct theme words of a fact.
pub fn key_themes(fact: &str) -> HashSet<String> {
    let lowered = fact.to_lowercase();
    let cleaned = lowered.replace(&SUBJECT_PHRASE.to_lowercase(), " ");
    THEME_WORD_RE
        .find_iter(cleaned.trim())
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Jaccard index of the theme word sets, in `[0, 1]`.
///
/// Returns 0.0 when either side has no theme words.
pub fn similarity(a: &str, b: &str) -> f64 {
    let themes_a = key_themes(a);
    let themes_b = key_themes(b);
    if themes_a.is_empty() || themes_b.is_empty() {
        return 0.0;
    }

    let intersection = themes_a.intersection(&themes_b).count();
    let union = themes_a.union(&themes_b).count();
    intersection as f64 / union as f64
}
