//! Embedding cosine signal.

use crate::embedding::cosine_similarity;

use super::{clip_unit, SignalScore};

/// Maps a cosine in `[-1, 1]` to `[0, 1]` via `(s + 1) / 2`, clipped.
///
/// Orthogonal vectors land at 0.5, which is the default Mode A review floor.
#[must_use]
pub fn remap_cosine(cosine: f32) -> f32 {
    clip_unit((cosine + 1.0) / 2.0)
}

/// Remapped cosine between a mention vector and an entity vector.
///
/// The citation is attributed to the embedding model.
#[must_use]
pub fn semantic_signal(mention: &[f32], entity: &[f32], model_name: &str, threshold: f32) -> SignalScore {
    let score = remap_cosine(cosine_similarity(mention, entity));
    SignalScore::cited(score, threshold, model_name, "embedding_cosine")
}
