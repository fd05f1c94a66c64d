//! Approximate nearest-neighbor search over entity embeddings.
//!
//! Every backend implements [`AnnIndex`] and reports similarities on the same
//! scale (closer to 1 = more similar): cosine backends return the inner
//! product of L2-normalized vectors, L2 backends convert the squared
//! distance `d` with `1 / (1 + d)`. Swapping backends changes latency and
//! recall, never score semantics.

mod flat;
mod hnsw;
mod ivf;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AnnConfig;
use crate::embedding::l2_normalize;
use crate::entity::EntityId;
use crate::error::ConfigurationError;

pub use flat::FlatIndex;
pub use hnsw::HnswIndex;
pub use ivf::IvfIndex;

/// Errors raised by ANN backends.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnnError {
    /// Ids and vectors differ in length.
    #[error("Got {ids} ids but {vectors} vectors")]
    LengthMismatch {
        /// Ids supplied.
        ids: usize,
        /// Vectors supplied.
        vectors: usize,
    },

    /// Vectors were added before training.
    #[error("Partitioned index must be trained before vectors are added")]
    NotTrained,

    /// Too few vectors to train on.
    #[error("Training needs at least {required} vectors, got {available}")]
    InsufficientTrainingData {
        /// Minimum needed.
        required: usize,
        /// Vectors supplied.
        available: usize,
    },

    /// A vector had the wrong dimensionality.
    #[error("Vector has {actual} dimensions, index expects {expected}")]
    DimensionMismatch {
        /// Indexed dimensionality.
        expected: usize,
        /// Query dimensionality.
        actual: usize,
    },

    /// A vector was empty or non-finite.
    #[error("Vector at position {position} is empty or contains non-finite values")]
    InvalidVector {
        /// Index of the offending vector.
        position: usize,
    },
}

/// Similarity metric used by an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Metric {
    /// Inner product of L2-normalized vectors.
    Cosine,
    /// `1 / (1 + squared euclidean distance)`.
    L2,
}

impl Metric {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::L2 => "l2",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" | "ip" => Ok(Self::Cosine),
            "l2" | "euclidean" => Ok(Self::L2),
            _ => Err(ConfigurationError::UnknownMetric {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Metric {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Metric> for String {
    fn from(metric: Metric) -> Self {
        metric.as_str().to_string()
    }
}

/// Available ANN backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AnnBackendKind {
    /// Exact brute-force scan.
    Flat,
    /// Hierarchical navigable small-world graph.
    Hnsw,
    /// Inverted file with k-means partitions.
    Ivf,
}

impl AnnBackendKind {
    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Hnsw => "hnsw",
            Self::Ivf => "ivf",
        }
    }
}

impl fmt::Display for AnnBackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnnBackendKind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flat" | "exact" => Ok(Self::Flat),
            "hnsw" => Ok(Self::Hnsw),
            "ivf" => Ok(Self::Ivf),
            _ => Err(ConfigurationError::UnknownAnnBackend {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for AnnBackendKind {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AnnBackendKind> for String {
    fn from(kind: AnnBackendKind) -> Self {
        kind.as_str().to_string()
    }
}

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Matching entity.
    pub id: EntityId,
    /// Similarity in the backend-uniform scale.
    pub score: f32,
}

/// Contract shared by every vector search backend.
///
/// `build_index` is a blocking bulk operation that replaces any previous
/// contents; it is not incremental.
pub trait AnnIndex: Send + Sync + fmt::Debug {
    /// Backend kind.
    fn backend(&self) -> AnnBackendKind;

    /// Similarity metric.
    fn metric(&self) -> Metric;

    /// Builds the index. `ids` and `vectors` correspond positionally.
    ///
    /// # Errors
    ///
    /// Returns `AnnError` on length mismatch, ragged or invalid vectors, or
    /// a failed training pass.
    fn build_index(&mut self, ids: &[EntityId], vectors: &[Vec<f32>]) -> Result<(), AnnError>;

    /// Up to `top_k` hits, most similar first. An empty index yields none.
    ///
    /// # Errors
    ///
    /// Returns `AnnError::DimensionMismatch` if the query does not match the
    /// indexed dimension.
    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>, AnnError>;

    /// Runs [`AnnIndex::search`] for each query.
    ///
    /// # Errors
    ///
    /// Returns the first query's error.
    fn batch_search(&self, queries: &[Vec<f32>], top_k: usize) -> Result<Vec<Vec<Neighbor>>, AnnError> {
        queries.iter().map(|q| self.search(q, top_k)).collect()
    }

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// True if nothing is indexed.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Indexed dimension, `None` before the first build.
    fn dim(&self) -> Option<usize>;
}

/// Creates an empty index for the configured backend.
#[must_use]
pub fn create_index(config: &AnnConfig) -> Box<dyn AnnIndex> {
    match config.backend {
        AnnBackendKind::Flat => Box::new(FlatIndex::new(config.metric)),
        AnnBackendKind::Hnsw => Box::new(HnswIndex::new(
            config.metric,
            config.hnsw_m,
            config.hnsw_ef_construction,
            config.hnsw_ef_search,
        )),
        AnnBackendKind::Ivf => Box::new(IvfIndex::new(
            config.metric,
            config.ivf_partitions,
            config.ivf_probes,
            config.ivf_training_sample,
        )),
    }
}

/// Validates a build batch and applies the metric's preprocessing.
///
/// Returns the common dimension (`None` for an empty batch) and the
/// prepared vectors.
pub(crate) fn prepare_vectors(
    ids: &[EntityId],
    vectors: &[Vec<f32>],
    metric: Metric,
) -> Result<(Option<usize>, Vec<Vec<f32>>), AnnError> {
    if ids.len() != vectors.len() {
        return Err(AnnError::LengthMismatch {
            ids: ids.len(),
            vectors: vectors.len(),
        });
    }
    let Some(first) = vectors.first() else {
        return Ok((None, Vec::new()));
    };
    let dim = first.len();

    let mut prepared = Vec::with_capacity(vectors.len());
    for (position, v) in vectors.iter().enumerate() {
        if v.is_empty() || !v.iter().all(|x| x.is_finite()) {
            return Err(AnnError::InvalidVector { position });
        }
        if v.len() != dim {
            return Err(AnnError::DimensionMismatch {
                expected: dim,
                actual: v.len(),
            });
        }
        let mut v = v.clone();
        if metric == Metric::Cosine {
            l2_normalize(&mut v);
        }
        prepared.push(v);
    }
    Ok((Some(dim), prepared))
}

/// Validates a query against the indexed dimension and preprocesses it.
pub(crate) fn prepare_query(query: &[f32], dim: usize, metric: Metric) -> Result<Vec<f32>, AnnError> {
    if query.len() != dim {
        return Err(AnnError::DimensionMismatch {
            expected: dim,
            actual: query.len(),
        });
    }
    if !query.iter().all(|x| x.is_finite()) {
        return Err(AnnError::InvalidVector { position: 0 });
    }
    let mut q = query.to_vec();
    if metric == Metric::Cosine {
        l2_normalize(&mut q);
    }
    Ok(q)
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Distance used for graph/partition navigation (smaller = closer).
pub(crate) fn distance(metric: Metric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        Metric::Cosine => 1.0 - dot(a, b),
        Metric::L2 => squared_l2(a, b),
    }
}

/// Converts a navigation distance into the uniform similarity scale.
pub(crate) fn similarity_from_distance(metric: Metric, d: f32) -> f32 {
    match metric {
        Metric::Cosine => 1.0 - d,
        Metric::L2 => 1.0 / (1.0 + d),
    }
}

/// Sorts hits by descending score, keeping insertion order for ties.
pub(crate) fn rank(mut hits: Vec<Neighbor>, top_k: usize) -> Vec<Neighbor> {
    hits.sort_by(|a, b| b.score.total_cmp(&a.score));
    hits.truncate(top_k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<EntityId> {
        (0..n).map(|_| EntityId::new()).collect()
    }

    fn corpus() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
            vec![0.7, 0.7, 0.0],
            vec![0.0, 0.6, 0.8],
        ]
    }

    fn all_backends(metric: Metric) -> Vec<Box<dyn AnnIndex>> {
        [AnnBackendKind::Flat, AnnBackendKind::Hnsw, AnnBackendKind::Ivf]
            .into_iter()
            .map(|backend| {
                create_index(&AnnConfig {
                    backend,
                    metric,
                    ivf_probes: 100,
                    ..AnnConfig::default()
                })
            })
            .collect()
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("HNSW".parse::<AnnBackendKind>().unwrap(), AnnBackendKind::Hnsw);
        assert_eq!("l2".parse::<Metric>().unwrap(), Metric::L2);
        assert!(matches!(
            "annoy".parse::<AnnBackendKind>(),
            Err(ConfigurationError::UnknownAnnBackend { .. })
        ));
        assert!(matches!("dot".parse::<Metric>(), Err(ConfigurationError::UnknownMetric { .. })));
    }

    #[test]
    fn test_backends_agree_on_exact_hit() {
        for metric in [Metric::Cosine, Metric::L2] {
            for mut index in all_backends(metric) {
                let ids = ids(5);
                index.build_index(&ids, &corpus()).unwrap();
                assert_eq!(index.len(), 5);
                assert_eq!(index.dim(), Some(3));

                let hits = index.search(&[0.0, 0.0, 1.0], 2).unwrap();
                assert_eq!(hits[0].id, ids[2], "backend {}", index.backend());
                assert!((hits[0].score - 1.0).abs() < 1e-5);
                assert!(hits[0].score >= hits[1].score);
            }
        }
    }

    #[test]
    fn test_cosine_normalizes_vectors() {
        for mut index in all_backends(Metric::Cosine) {
            let ids = ids(2);
            index
                .build_index(&ids, &[vec![10.0, 0.0], vec![0.0, 3.0]])
                .unwrap();
            let hits = index.search(&[2.0, 0.0], 1).unwrap();
            assert_eq!(hits[0].id, ids[0]);
            assert!((hits[0].score - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_l2_similarity_scale() {
        let mut index = FlatIndex::new(Metric::L2);
        let ids = ids(1);
        index.build_index(&ids, &[vec![0.0, 0.0]]).unwrap();
        let hits = index.search(&[1.0, 1.0], 1).unwrap();
        // squared distance 2 -> 1 / 3
        assert!((hits[0].score - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_length_mismatch() {
        for mut index in all_backends(Metric::Cosine) {
            let err = index.build_index(&ids(2), &corpus()).unwrap_err();
            assert_eq!(err, AnnError::LengthMismatch { ids: 2, vectors: 5 });
        }
    }

    #[test]
    fn test_ragged_and_invalid_vectors() {
        let mut index = FlatIndex::new(Metric::Cosine);
        let err = index
            .build_index(&ids(2), &[vec![1.0, 0.0], vec![1.0]])
            .unwrap_err();
        assert!(matches!(err, AnnError::DimensionMismatch { expected: 2, actual: 1 }));

        let err = index
            .build_index(&ids(2), &[vec![1.0, 0.0], vec![f32::NAN, 0.0]])
            .unwrap_err();
        assert_eq!(err, AnnError::InvalidVector { position: 1 });
    }

    #[test]
    fn test_query_dimension_mismatch() {
        for mut index in all_backends(Metric::L2) {
            index.build_index(&ids(5), &corpus()).unwrap();
            assert!(matches!(
                index.search(&[1.0, 0.0], 3),
                Err(AnnError::DimensionMismatch { expected: 3, actual: 2 })
            ));
        }
    }

    #[test]
    fn test_empty_index_returns_nothing() {
        for mut index in all_backends(Metric::Cosine) {
            assert!(index.search(&[1.0, 0.0], 3).unwrap().is_empty());
            index.build_index(&[], &[]).unwrap();
            assert!(index.is_empty());
            assert!(index.search(&[1.0, 0.0], 3).unwrap().is_empty());
        }
    }

    #[test]
    fn test_batch_search() {
        for mut index in all_backends(Metric::Cosine) {
            let ids = ids(5);
            index.build_index(&ids, &corpus()).unwrap();
            let results = index
                .batch_search(&[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]], 1)
                .unwrap();
            assert_eq!(results.len(), 2);
            assert_eq!(results[0][0].id, ids[0]);
            assert_eq!(results[1][0].id, ids[1]);
        }
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        for mut index in all_backends(Metric::Cosine) {
            index.build_index(&ids(5), &corpus()).unwrap();
            let fresh = ids(1);
            index.build_index(&fresh, &[vec![0.0, 1.0, 0.0]]).unwrap();
            assert_eq!(index.len(), 1);
            let hits = index.search(&[1.0, 0.0, 0.0], 5).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].id, fresh[0]);
        }
    }
}
