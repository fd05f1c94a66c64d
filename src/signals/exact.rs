//! Exact-match signal.

use crate::entity::EntityId;
use crate::index::exact::BUILTIN_SOURCE;

use super::SignalScore;

/// 1.0 if the candidate is among the mention's exact-index hits.
#[must_use]
pub fn exact_signal(candidate: EntityId, exact_hits: &[EntityId], threshold: f32) -> SignalScore {
    let score = if exact_hits.contains(&candidate) { 1.0 } else { 0.0 };
    SignalScore::cited(score, threshold, BUILTIN_SOURCE, "exact_match")
}
