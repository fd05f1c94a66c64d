//! Fuzzy string similarity.
//!
//! All metrics work on Unicode scalar values and return `[0, 1]`; any empty
//! input scores 0. `token_set_ratio` and `partial_ratio` use the indel
//! ratio `2 * lcs / (|a| + |b|)`; the edit-distance metrics come from
//! `strsim`.

use std::collections::BTreeSet;

use crate::config::FuzzyWeights;
use crate::index::exact::BUILTIN_SOURCE;

use super::{clip_unit, SignalScore};

fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[allow(clippy::cast_precision_loss)]
fn indel_ratio(a: &[char], b: &[char]) -> f32 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    (2 * lcs_len(a, b)) as f32 / total as f32
}

/// Indel similarity of two strings.
#[must_use]
pub fn ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    indel_ratio(&a, &b)
}

/// Order- and duplicate-insensitive token overlap.
///
/// 1.0 when one token set contains the other; otherwise the best ratio among
/// the sorted intersection and the intersection extended by each side's
/// remaining tokens.
///
/// ```
/// use entity_resolver::signals::token_set_ratio;
///
/// assert!((token_set_ratio("sachs goldman", "goldman sachs group") - 1.0).abs() < 1e-6);
/// assert!(token_set_ratio("apple", "orange") < 0.5);
/// ```
#[must_use]
pub fn token_set_ratio(a: &str, b: &str) -> f32 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let sect: Vec<&str> = ta.intersection(&tb).copied().collect();
    let diff_ab: Vec<&str> = ta.difference(&tb).copied().collect();
    let diff_ba: Vec<&str> = tb.difference(&ta).copied().collect();

    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 1.0;
    }

    let sect = sect.join(" ");
    let join = |diff: &[&str]| {
        if sect.is_empty() {
            diff.join(" ")
        } else {
            format!("{sect} {}", diff.join(" "))
        }
    };
    let with_ab = join(&diff_ab);
    let with_ba = join(&diff_ba);

    let mut best = ratio(&with_ab, &with_ba);
    if !sect.is_empty() {
        best = best.max(ratio(&sect, &with_ab)).max(ratio(&sect, &with_ba));
    }
    clip_unit(best)
}

/// Best ratio between the shorter string and any equally long window of
/// the longer one.
#[must_use]
pub fn partial_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() {
        return 0.0;
    }

    let mut best = 0.0f32;
    for window in long.windows(short.len()) {
        best = best.max(indel_ratio(&short, window));
        if best >= 1.0 {
            break;
        }
    }
    best
}

/// `1 - edit_distance / max_len`.
#[must_use]
pub fn levenshtein_similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let sim = strsim::normalized_levenshtein(a, b) as f32;
    clip_unit(sim)
}

/// Prefix-weighted Jaro similarity.
#[must_use]
pub fn jaro_winkler_similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let sim = strsim::jaro_winkler(a, b) as f32;
    clip_unit(sim)
}

/// The full fuzzy metric suite for one pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuzzyScores {
    /// Token-set ratio.
    pub token_set: f32,
    /// Best substring alignment ratio.
    pub partial: f32,
    /// Normalized Levenshtein similarity.
    pub levenshtein: f32,
    /// Jaro-Winkler similarity.
    pub jaro_winkler: f32,
    /// Weighted combination of the four.
    pub combined: f32,
}

impl FuzzyScores {
    /// Computes every metric for `a` against `b`.
    #[must_use]
    pub fn compute(a: &str, b: &str, weights: &FuzzyWeights) -> Self {
        let token_set = token_set_ratio(a, b);
        let partial = partial_ratio(a, b);
        let levenshtein = levenshtein_similarity(a, b);
        let jaro_winkler = jaro_winkler_similarity(a, b);
        let combined = clip_unit(
            weights.token_set * token_set
                + weights.partial * partial
                + weights.levenshtein * levenshtein
                + weights.jaro_winkler * jaro_winkler,
        );
        Self {
            token_set,
            partial,
            levenshtein,
            jaro_winkler,
            combined,
        }
    }
}

/// Weighted sum of the four metrics, clipped to `[0, 1]`.
#[must_use]
pub fn combined_fuzzy_score(a: &str, b: &str, weights: &FuzzyWeights) -> f32 {
    FuzzyScores::compute(a, b, weights).combined
}

/// Fuzzy suite between normalized texts, citing the token-set ratio.
#[must_use]
pub fn fuzzy_signal(
    mention_normalized: &str,
    entity_normalized: &str,
    weights: &FuzzyWeights,
    threshold: f32,
) -> (FuzzyScores, SignalScore) {
    let scores = FuzzyScores::compute(mention_normalized, entity_normalized, weights);
    let cited = SignalScore::cited(scores.token_set, threshold, BUILTIN_SOURCE, "token_set_ratio");
    (scores, cited)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_ratio() {
        assert!(close(ratio("abc", "abc"), 1.0));
        // lcs("microsoft", "microsfot") = 8
        assert!(close(ratio("microsoft", "microsfot"), 16.0 / 18.0));
        assert!(close(ratio("", "abc"), 0.0));
    }

    #[test]
    fn test_token_set_subset_is_full() {
        assert!(close(token_set_ratio("apple", "apple records"), 1.0));
        assert!(close(token_set_ratio("b a", "a b a"), 1.0));
    }

    #[test]
    fn test_token_set_partial_overlap() {
        let s = token_set_ratio("goldman sachs", "goldman sacks");
        assert!(s > 0.8 && s < 1.0, "{s}");
        assert!(close(token_set_ratio("", "x"), 0.0));
    }

    #[test]
    fn test_partial_ratio() {
        assert!(close(partial_ratio("apple", "the apple company"), 1.0));
        assert!(close(partial_ratio("", "abc"), 0.0));
        let s = partial_ratio("aple", "apple");
        assert!(s > 0.7 && s < 1.0);
    }

    #[test]
    fn test_edit_metrics() {
        assert!(close(levenshtein_similarity("kitten", "sitting"), 1.0 - 3.0 / 7.0));
        assert!(close(levenshtein_similarity("", ""), 0.0));
        assert!(jaro_winkler_similarity("martha", "marhta") > 0.95);
        assert!(close(jaro_winkler_similarity("", "a"), 0.0));
    }

    #[test]
    fn test_combined_weights() {
        let w = FuzzyWeights::default();
        assert!(close(combined_fuzzy_score("acme", "acme", &w), 1.0));
        let zero = FuzzyWeights {
            token_set: 0.0,
            partial: 0.0,
            levenshtein: 0.0,
            jaro_winkler: 0.0,
        };
        assert!(close(combined_fuzzy_score("acme", "acme", &zero), 0.0));
        let heavy = FuzzyWeights {
            token_set: 2.0,
            ..FuzzyWeights::default()
        };
        assert!(combined_fuzzy_score("acme", "acme", &heavy) <= 1.0);
    }

    #[test]
    fn test_fuzzy_signal_cites_token_set() {
        let (scores, cited) = fuzzy_signal("apple", "apple records", &FuzzyWeights::default(), 0.0);
        assert!(close(scores.token_set, 1.0));
        let citation = cited.citation.unwrap();
        assert_eq!(citation.method, "token_set_ratio");
        assert!(close(citation.score, 1.0));
    }
}
