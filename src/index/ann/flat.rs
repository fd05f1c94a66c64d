//! Exact brute-force backend.

use crate::entity::EntityId;

use super::{
    distance, prepare_query, prepare_vectors, rank, similarity_from_distance, AnnBackendKind, AnnError,
    AnnIndex, Metric, Neighbor,
};

/// Scans every vector; the recall baseline for the approximate backends.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    metric: Metric,
    dim: Option<usize>,
    ids: Vec<EntityId>,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    /// Empty index using `metric`.
    #[must_use]
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            dim: None,
            ids: Vec::new(),
            vectors: Vec::new(),
        }
    }
}

impl AnnIndex for FlatIndex {
    fn backend(&self) -> AnnBackendKind {
        AnnBackendKind::Flat
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn build_index(&mut self, ids: &[EntityId], vectors: &[Vec<f32>]) -> Result<(), AnnError> {
        let (dim, prepared) = prepare_vectors(ids, vectors, self.metric)?;
        self.dim = dim;
        self.ids = ids.to_vec();
        self.vectors = prepared;
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>, AnnError> {
        let Some(dim) = self.dim else {
            return Ok(Vec::new());
        };
        let q = prepare_query(query, dim, self.metric)?;

        let hits = self
            .ids
            .iter()
            .zip(&self.vectors)
            .map(|(&id, v)| Neighbor {
                id,
                score: similarity_from_distance(self.metric, distance(self.metric, &q, v)),
            })
            .collect();
        Ok(rank(hits, top_k))
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn dim(&self) -> Option<usize> {
        self.dim
    }
}
