//! Embedding providers.
//!
//! The resolver only consumes vectors. Neural models live outside the crate
//! behind [`EmbeddingProvider`]; [`LexicalEmbedder`] is a deterministic,
//! offline provider built on feature hashing that makes the semantic path
//! usable without one.

use blake3::Hasher;
use thiserror::Error;

use crate::normalize::tokenize;

/// Default dimensionality of lexical embeddings.
pub const DEFAULT_EMBEDDING_DIM: usize = 128;

/// Errors reported by an embedding provider.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbeddingError {
    /// The backend failed to encode an input.
    #[error("Embedding backend '{model}' failed: {reason}")]
    Backend {
        /// Provider model name.
        model: String,
        /// Backend message.
        reason: String,
    },

    /// A vector had the wrong dimensionality.
    #[error("Embedding backend returned {actual} dimensions, expected {expected}")]
    Dimension {
        /// Configured dimensionality.
        expected: usize,
        /// Dimensionality returned.
        actual: usize,
    },

    /// A batch call returned the wrong number of vectors.
    #[error("Embedding backend returned {actual} vectors for {expected} inputs")]
    BatchSize {
        /// Inputs sent.
        expected: usize,
        /// Vectors returned.
        actual: usize,
    },
}

/// Turns text into fixed-dimension vectors.
///
/// Implementations enforce their own timeout and retry policy; calls are
/// synchronous from the resolver's point of view.
pub trait EmbeddingProvider: Send + Sync {
    /// Name reported in citations.
    fn model_name(&self) -> &str;

    /// Dimension of every vector this provider returns.
    fn embedding_dim(&self) -> usize;

    /// Encodes one text.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError` if the backend fails.
    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Encodes a batch of texts, one row per input.
    ///
    /// # Errors
    ///
    /// Returns `EmbeddingError` if any row fails.
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|t| self.encode(t)).collect()
    }
}

/// Deterministic feature-hashing embedder.
///
/// Word tokens and character trigrams of each word (padded with `#`) are
/// hashed with blake3 into signed buckets; the vector is L2-normalized.
/// Trigrams give near-duplicate spellings overlapping vectors.
///
/// # Examples
///
/// ```
/// use entity_resolver::{EmbeddingProvider, LexicalEmbedder};
///
/// let embedder = LexicalEmbedder::new(64);
/// let v = embedder.encode("Goldman Sachs").unwrap();
/// assert_eq!(v.len(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dim: usize,
    name: String,
}

impl LexicalEmbedder {
    /// Creates an embedder producing `dim`-dimensional vectors (at least 1).
    #[must_use]
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self {
            dim,
            name: format!("lexical-{dim}"),
        }
    }

    fn add_feature(&self, vec: &mut [f32], feature: &str, weight: f32) {
        let mut h = Hasher::new();
        h.update(feature.as_bytes());
        let hash = h.finalize();
        let bytes = hash.as_bytes();

        let mut bucket = [0u8; 8];
        bucket.copy_from_slice(&bytes[..8]);
        let bucket = u64::from_le_bytes(bucket);

        #[allow(clippy::cast_possible_truncation)]
        let idx = (bucket % self.dim as u64) as usize;
        let sign = if (bytes[8] & 1) == 0 { 1.0f32 } else { -1.0f32 };
        vec[idx] += sign * weight;
    }
}

impl Default for LexicalEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl EmbeddingProvider for LexicalEmbedder {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vec = vec![0.0f32; self.dim];

        for token in tokenize(text) {
            self.add_feature(&mut vec, &format!("w:{token}"), 1.0);

            let padded: Vec<char> = format!("#{token}#").chars().collect();
            for gram in padded.windows(3) {
                let gram: String = gram.iter().collect();
                self.add_feature(&mut vec, &format!("g:{gram}"), 0.5);
            }
        }

        l2_normalize(&mut vec);
        Ok(vec)
    }
}

/// Normalizes `vec` to unit length in place; zero vectors are left alone.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm2: f64 = vec.iter().map(|&x| f64::from(x) * f64::from(x)).sum();
    if norm2 > 0.0 {
        #[allow(clippy::cast_possible_truncation)]
        let inv = norm2.sqrt().recip() as f32;
        for x in vec.iter_mut() {
            *x *= inv;
        }
    }
}

/// Cosine similarity in `[-1, 1]`; 0.0 for empty, zero or mismatched inputs.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return 0.0;
    }

    let sim = dot / (norm_a.sqrt() * norm_b.sqrt());
    if sim.is_finite() {
        #[allow(clippy::cast_possible_truncation)]
        let sim = sim.clamp(-1.0, 1.0) as f32;
        sim
    } else {
        0.0
    }
}
