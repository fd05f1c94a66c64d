//! Weighted aggregation of candidate signals.
//!
//! An exact signal of 1.0 short-circuits to 1.0. Otherwise the score is
//! `w_exact*exact + w_embed*embedding_cosine + w_fuzzy*token_set_ratio +
//! w_acronym*acronym + w_context*contextual`, clipped to `[0, 1]`. Weights
//! are never renormalized.

use serde::{Deserialize, Serialize};

use crate::config::SignalWeights;
use crate::outcome::Candidate;
use crate::signals::{clip_unit, SignalKind};

/// Per-signal weighted contributions behind an aggregated score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationBreakdown {
    /// Clipped score in `[0, 1]`.
    pub final_score: f32,
    /// True when the exact override decided the score.
    pub exact_override: bool,
    /// Weighted contribution per signal, before clipping.
    pub contributions: Vec<(SignalKind, f32)>,
    /// Sum of contributions before clipping.
    pub raw_score: f32,
}

/// Deterministic weighted combiner.
#[derive(Debug, Clone, Default)]
pub struct WeightedAggregator {
    weights: SignalWeights,
}

impl WeightedAggregator {
    /// Aggregator with the given weights.
    #[must_use]
    pub fn new(weights: SignalWeights) -> Self {
        Self { weights }
    }

    /// Weights in use.
    #[must_use]
    pub fn weights(&self) -> &SignalWeights {
        &self.weights
    }

    fn weighted(&self) -> [(SignalKind, f32); 5] {
        [
            (SignalKind::Exact, self.weights.exact),
            (SignalKind::EmbeddingCosine, self.weights.embedding),
            (SignalKind::TokenSetRatio, self.weights.fuzzy),
            (SignalKind::Acronym, self.weights.acronym),
            (SignalKind::Contextual, self.weights.contextual),
        ]
    }

    /// Final score of a candidate, always in `[0, 1]`.
    #[must_use]
    pub fn aggregate(&self, candidate: &Candidate) -> f32 {
        self.aggregate_with_details(candidate).final_score
    }

    /// Final score plus the contributions that produced it.
    #[must_use]
    pub fn aggregate_with_details(&self, candidate: &Candidate) -> AggregationBreakdown {
        if candidate.signal(SignalKind::Exact) >= 1.0 {
            return AggregationBreakdown {
                final_score: 1.0,
                exact_override: true,
                contributions: vec![(SignalKind::Exact, 1.0)],
                raw_score: 1.0,
            };
        }

        let contributions: Vec<(SignalKind, f32)> = self
            .weighted()
            .into_iter()
            .map(|(kind, weight)| {
                let value = candidate.signal(kind);
                let value = if value.is_finite() { value } else { 0.0 };
                (kind, weight * value)
            })
            .collect();
        let raw_score: f32 = contributions.iter().map(|(_, c)| c).sum();

        AggregationBreakdown {
            final_score: clip_unit(raw_score),
            exact_override: false,
            contributions,
            raw_score,
        }
    }
}
