//! Signal computers: one similarity measurement between a mention and a
//! candidate entity each.
//!
//! Every computer returns its score plus an optional citation. The citation
//! is present only when the score is positive and clears the family's
//! relevance threshold.

pub mod acronym;
pub mod contextual;
pub mod exact;
pub mod fuzzy;
pub mod semantic;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::outcome::Citation;

pub use acronym::{acronym_score, AcronymMethod};
pub use contextual::{domain_boost, recency_boost, ContextualSignal};
pub use exact::exact_signal;
pub use fuzzy::{
    combined_fuzzy_score, fuzzy_signal, jaro_winkler_similarity, levenshtein_similarity, partial_ratio,
    token_set_ratio, FuzzyScores,
};
pub use semantic::{remap_cosine, semantic_signal};

/// Names of the signals a candidate can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Normalized name or alias equality.
    Exact,
    /// Token-set ratio.
    TokenSetRatio,
    /// Partial ratio.
    PartialRatio,
    /// Normalized Levenshtein similarity.
    LevenshteinSim,
    /// Jaro-Winkler similarity.
    JaroWinkler,
    /// Weighted fuzzy combination.
    CombinedFuzzy,
    /// Acronym and token-subset heuristics.
    Acronym,
    /// Remapped embedding cosine.
    EmbeddingCosine,
    /// Domain and recency boost.
    Contextual,
}

impl SignalKind {
    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::TokenSetRatio => "token_set_ratio",
            Self::PartialRatio => "partial_ratio",
            Self::LevenshteinSim => "levenshtein_sim",
            Self::JaroWinkler => "jaro_winkler",
            Self::CombinedFuzzy => "combined_fuzzy",
            Self::Acronym => "acronym",
            Self::EmbeddingCosine => "embedding_cosine",
            Self::Contextual => "contextual",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score plus the citation it earned, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalScore {
    /// Signal value.
    pub score: f32,
    /// Citation, when the score cleared its threshold.
    pub citation: Option<Citation>,
}

impl SignalScore {
    /// Cites `source`/`method` when `score` is positive and at least
    /// `threshold`.
    #[must_use]
    pub fn cited(score: f32, threshold: f32, source: &str, method: &str) -> Self {
        let citation = (score > 0.0 && score >= threshold).then(|| Citation::new(source, method, score));
        Self { score, citation }
    }

    /// No score and no citation.
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            score: 0.0,
            citation: None,
        }
    }
}

/// Clamps to `[0, 1]`, mapping NaN to 0.
#[must_use]
pub fn clip_unit(x: f32) -> f32 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
