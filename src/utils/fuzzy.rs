// utils/fuzzy.rs
use strsim::levenshtein;

/// Fuzzy scores below this are treated as no match at all, so unrelated
/// skill strings that happen to share characters earn nothing.
const FUZZY_THRESHOLD: f64 = 0.7;
const CONTAINMENT_SCORE: f64 = 0.8;

/// Similarity between two skill strings, in [0, 1].
///
/// Checked in priority order: case-insensitive exact match (1.0), one side
/// containing the other (0.8), then normalized Levenshtein similarity with
/// weak matches clamped to 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();

    if a == b {
        return 1.0;
    }

    if a.contains(&b) || b.contains(&a) {
        return CONTAINMENT_SCORE;
    }

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let score = (max_len as f64 - levenshtein(&a, &b) as f64) / max_len as f64;
    if score < FUZZY_THRESHOLD {
        0.0
    } else {
        score
    }
}
