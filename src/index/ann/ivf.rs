//! Inverted-file backend with k-means partitions.
//!
//! Building runs a training pass over a strided sample of the corpus to
//! place the partition centroids, then assigns every vector to its nearest
//! centroid. A query scans the members of the `probes` closest partitions.

use crate::entity::EntityId;

use super::{
    distance, prepare_query, prepare_vectors, rank, similarity_from_distance, squared_l2, AnnBackendKind,
    AnnError, AnnIndex, Metric, Neighbor,
};

/// Maximum Lloyd iterations per training pass.
const KMEANS_ITERATIONS: usize = 20;

/// Partitioned approximate index.
#[derive(Debug, Clone)]
pub struct IvfIndex {
    metric: Metric,
    partitions: usize,
    probes: usize,
    training_sample: usize,
    dim: Option<usize>,
    centroids: Vec<Vec<f32>>,
    /// `lists[partition]` holds positions into `ids`/`vectors`.
    lists: Vec<Vec<usize>>,
    ids: Vec<EntityId>,
    vectors: Vec<Vec<f32>>,
}

impl IvfIndex {
    /// Untrained index; sizes below one are raised to one.
    #[must_use]
    pub fn new(metric: Metric, partitions: usize, probes: usize, training_sample: usize) -> Self {
        Self {
            metric,
            partitions: partitions.max(1),
            probes: probes.max(1),
            training_sample: training_sample.max(1),
            dim: None,
            centroids: Vec::new(),
            lists: Vec::new(),
            ids: Vec::new(),
            vectors: Vec::new(),
        }
    }

    /// True once centroids exist.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        !self.centroids.is_empty()
    }

    /// Number of trained partitions.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.centroids.len()
    }

    /// Places centroids with k-means over `sample`. Prepared (already
    /// normalized for cosine) vectors are expected. Clears any indexed
    /// vectors.
    ///
    /// # Errors
    ///
    /// Returns `AnnError::InsufficientTrainingData` for an empty sample.
    pub fn train(&mut self, sample: &[Vec<f32>]) -> Result<(), AnnError> {
        let Some(first) = sample.first() else {
            return Err(AnnError::InsufficientTrainingData {
                required: 1,
                available: 0,
            });
        };
        let dim = first.len();
        let k = self.partitions.min(sample.len());

        let mut centroids = farthest_first(sample, k);
        let mut assignment = vec![usize::MAX; sample.len()];

        for _ in 0..KMEANS_ITERATIONS {
            let mut changed = false;
            for (i, v) in sample.iter().enumerate() {
                let best = nearest(&centroids, v);
                if assignment[i] != best {
                    assignment[i] = best;
                    changed = true;
                }
            }
            if !changed {
                break;
            }

            let mut sums = vec![vec![0.0f32; dim]; k];
            let mut counts = vec![0usize; k];
            for (i, v) in sample.iter().enumerate() {
                let c = assignment[i];
                counts[c] += 1;
                for (s, x) in sums[c].iter_mut().zip(v) {
                    *s += x;
                }
            }
            for (c, sum) in sums.into_iter().enumerate() {
                if counts[c] > 0 {
                    #[allow(clippy::cast_precision_loss)]
                    let n = counts[c] as f32;
                    centroids[c] = sum.into_iter().map(|s| s / n).collect();
                }
            }
        }

        self.dim = Some(dim);
        self.centroids = centroids;
        self.lists = vec![Vec::new(); k];
        self.ids.clear();
        self.vectors.clear();
        Ok(())
    }

    /// Assigns prepared vectors to trained partitions.
    ///
    /// # Errors
    ///
    /// Returns `AnnError::NotTrained` before [`IvfIndex::train`].
    pub fn add(&mut self, ids: &[EntityId], vectors: Vec<Vec<f32>>) -> Result<(), AnnError> {
        let Some(dim) = self.dim.filter(|_| self.is_trained()) else {
            return Err(AnnError::NotTrained);
        };
        if ids.len() != vectors.len() {
            return Err(AnnError::LengthMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
            });
        }
        for v in vectors {
            if v.len() != dim {
                return Err(AnnError::DimensionMismatch {
                    expected: dim,
                    actual: v.len(),
                });
            }
            let partition = nearest(&self.centroids, &v);
            self.lists[partition].push(self.vectors.len());
            self.vectors.push(v);
        }
        self.ids.extend_from_slice(ids);
        Ok(())
    }

    fn sample(&self, vectors: &[Vec<f32>]) -> Vec<Vec<f32>> {
        let step = vectors.len().div_ceil(self.training_sample).max(1);
        vectors.iter().step_by(step).cloned().collect()
    }
}

/// Deterministic seeding: start from the first vector, then repeatedly take
/// the vector farthest from every chosen centroid.
fn farthest_first(data: &[Vec<f32>], k: usize) -> Vec<Vec<f32>> {
    let mut centroids = Vec::with_capacity(k);
    if data.is_empty() || k == 0 {
        return centroids;
    }
    centroids.push(data[0].clone());
    let mut min_dist: Vec<f32> = data.iter().map(|v| squared_l2(v, &data[0])).collect();

    while centroids.len() < k {
        let Some((idx, _)) = min_dist
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1).then_with(|| b.0.cmp(&a.0)))
        else {
            break;
        };
        let chosen = data[idx].clone();
        for (d, v) in min_dist.iter_mut().zip(data) {
            *d = d.min(squared_l2(v, &chosen));
        }
        centroids.push(chosen);
    }
    centroids
}

fn nearest(centroids: &[Vec<f32>], v: &[f32]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_l2(v, centroid);
        if d < best_distance {
            best_distance = d;
            best = c;
        }
    }
    best
}

impl AnnIndex for IvfIndex {
    fn backend(&self) -> AnnBackendKind {
        AnnBackendKind::Ivf
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn build_index(&mut self, ids: &[EntityId], vectors: &[Vec<f32>]) -> Result<(), AnnError> {
        let (dim, prepared) = prepare_vectors(ids, vectors, self.metric)?;
        if dim.is_none() {
            self.dim = None;
            self.centroids.clear();
            self.lists.clear();
            self.ids.clear();
            self.vectors.clear();
            return Ok(());
        }

        let sample = self.sample(&prepared);
        self.train(&sample)?;
        self.add(ids, prepared)
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>, AnnError> {
        let Some(dim) = self.dim else {
            return Ok(Vec::new());
        };
        let q = prepare_query(query, dim, self.metric)?;

        let mut order: Vec<(usize, f32)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(c, centroid)| (c, squared_l2(&q, centroid)))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1));

        let mut hits = Vec::new();
        for &(partition, _) in order.iter().take(self.probes) {
            for &pos in &self.lists[partition] {
                hits.push(Neighbor {
                    id: self.ids[pos],
                    score: similarity_from_distance(self.metric, distance(self.metric, &q, &self.vectors[pos])),
                });
            }
        }
        Ok(rank(hits, top_k))
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn dim(&self) -> Option<usize> {
        self.dim
    }
}
