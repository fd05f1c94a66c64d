//! Acronym and token-containment signal.

use std::collections::HashSet;
use std::fmt;

use crate::index::exact::BUILTIN_SOURCE;
use crate::normalize::{acronym, tokenize};

use super::SignalScore;

/// Which acronym rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcronymMethod {
    /// Mention equals the derived acronym.
    AcronymMatch,
    /// Mention tokens are all in the canonical name.
    TokenSubset,
    /// Canonical tokens are all in the mention.
    TokenSuperset,
    /// Mention letters spell the first letters of the leading words.
    PartialAcronym,
}

impl AcronymMethod {
    /// Fixed score of this method.
    #[must_use]
    pub const fn score(self) -> f32 {
        match self {
            Self::AcronymMatch => 0.95,
            Self::TokenSubset => 0.85,
            Self::TokenSuperset => 0.80,
            Self::PartialAcronym => 0.70,
        }
    }

    /// Method name used in citations.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AcronymMatch => "acronym_match",
            Self::TokenSubset => "token_subset",
            Self::TokenSuperset => "token_superset",
            Self::PartialAcronym => "partial_acronym",
        }
    }
}

impl fmt::Display for AcronymMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn classify(mention: &str, canonical_name: &str) -> Option<AcronymMethod> {
    let derived = acronym(canonical_name);
    if !derived.is_empty() && mention.trim().to_uppercase() == derived {
        return Some(AcronymMethod::AcronymMatch);
    }

    let mention_tokens: HashSet<String> = tokenize(mention).into_iter().collect();
    let canonical_tokens: HashSet<String> = tokenize(canonical_name).into_iter().collect();
    if !mention_tokens.is_empty() && !canonical_tokens.is_empty() {
        if mention_tokens.is_subset(&canonical_tokens) {
            return Some(AcronymMethod::TokenSubset);
        }
        if canonical_tokens.is_subset(&mention_tokens) {
            return Some(AcronymMethod::TokenSuperset);
        }
    }

    if mention.trim().chars().count() < 2 {
        return None;
    }
    let letters: Vec<char> = mention
        .to_uppercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let words: Vec<&str> = canonical_name
        .split_whitespace()
        .filter(|w| w.chars().all(char::is_alphabetic))
        .collect();
    if letters.len() < 2 || words.len() < letters.len() {
        return None;
    }
    let all_match = letters.iter().zip(&words).all(|(&letter, word)| {
        word.chars()
            .next()
            .is_some_and(|first| first.to_uppercase().eq(std::iter::once(letter)))
    });
    all_match.then_some(AcronymMethod::PartialAcronym)
}

/// Acronym/containment score of `mention` against a canonical name.
///
/// Rules are tried in order: exact acronym (0.95), mention tokens within the
/// name (0.85), name tokens within the mention (0.80), partial acronym over
/// the leading words (0.70); otherwise 0.
///
/// ```
/// use entity_resolver::signals::acronym_score;
///
/// assert!((acronym_score("IBM", "International Business Machines", 0.5).score - 0.95).abs() < 1e-6);
/// assert!((acronym_score("Goldman", "Goldman Sachs", 0.5).score - 0.85).abs() < 1e-6);
/// ```
#[must_use]
pub fn acronym_score(mention: &str, canonical_name: &str, threshold: f32) -> SignalScore {
    match classify(mention, canonical_name) {
        Some(method) => SignalScore::cited(method.score(), threshold, BUILTIN_SOURCE, method.as_str()),
        None => SignalScore::zero(),
    }
}
