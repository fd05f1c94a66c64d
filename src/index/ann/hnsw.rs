//! Hierarchical navigable small-world graph backend.
//!
//! Node levels are drawn from a blake3 hash of the entity id, so a rebuild
//! over the same corpus produces the same graph.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashSet};

use crate::entity::EntityId;

use super::{
    distance, prepare_query, prepare_vectors, similarity_from_distance, AnnBackendKind, AnnError, AnnIndex,
    Metric, Neighbor,
};

/// Hard cap on node levels.
const MAX_LEVEL: usize = 16;

/// Heap entry ordered by distance, then by node index.
#[derive(Debug, Clone, Copy)]
struct Scored {
    distance: f32,
    node: usize,
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.node.cmp(&other.node))
    }
}

/// Graph-based approximate index.
#[derive(Debug, Clone)]
pub struct HnswIndex {
    metric: Metric,
    m: usize,
    ef_construction: usize,
    ef_search: usize,
    dim: Option<usize>,
    ids: Vec<EntityId>,
    vectors: Vec<Vec<f32>>,
    /// `links[node][layer]` holds neighbor node indices.
    links: Vec<Vec<Vec<usize>>>,
    entry_point: Option<usize>,
    max_layer: usize,
}

impl HnswIndex {
    /// Creates an empty graph. `m` links per node on upper layers, `2 * m`
    /// on layer 0.
    #[must_use]
    pub fn new(metric: Metric, m: usize, ef_construction: usize, ef_search: usize) -> Self {
        Self {
            metric,
            m: m.max(2),
            ef_construction: ef_construction.max(1),
            ef_search: ef_search.max(1),
            dim: None,
            ids: Vec::new(),
            vectors: Vec::new(),
            links: Vec::new(),
            entry_point: None,
            max_layer: 0,
        }
    }

    /// Changes the search beam width; larger is slower with better recall.
    pub fn set_ef_search(&mut self, ef_search: usize) {
        self.ef_search = ef_search.max(1);
    }

    /// Current search candidate list size.
    #[must_use]
    pub fn ef_search(&self) -> usize {
        self.ef_search
    }

    fn max_links(&self, layer: usize) -> usize {
        if layer == 0 {
            self.m * 2
        } else {
            self.m
        }
    }

    fn level_for(&self, id: EntityId) -> usize {
        let hash = blake3::hash(id.as_uuid().as_bytes());
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&hash.as_bytes()[..8]);
        // Uniform in (0, 1].
        #[allow(clippy::cast_precision_loss)]
        let u = ((u64::from_le_bytes(raw) >> 11) as f64 + 1.0) / (1u64 << 53) as f64;
        #[allow(clippy::cast_precision_loss)]
        let ml = 1.0 / (self.m as f64).ln();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let level = (-u.ln() * ml).floor() as usize;
        level.min(MAX_LEVEL)
    }

    fn dist(&self, query: &[f32], node: usize) -> f32 {
        distance(self.metric, query, &self.vectors[node])
    }

    /// Beam search on one layer; returns up to `ef` nodes, closest first.
    fn search_layer(&self, query: &[f32], entry: &[Scored], ef: usize, layer: usize) -> Vec<Scored> {
        let mut visited: HashSet<usize> = entry.iter().map(|s| s.node).collect();
        let mut candidates: BinaryHeap<Reverse<Scored>> = entry.iter().copied().map(Reverse).collect();
        let mut results: BinaryHeap<Scored> = entry.iter().copied().collect();
        while results.len() > ef {
            results.pop();
        }

        while let Some(Reverse(current)) = candidates.pop() {
            if let Some(worst) = results.peek() {
                if results.len() >= ef && current.distance > worst.distance {
                    break;
                }
            }

            let Some(neighbors) = self.links[current.node].get(layer) else {
                continue;
            };
            for &next in neighbors {
                if !visited.insert(next) {
                    continue;
                }
                let scored = Scored {
                    distance: self.dist(query, next),
                    node: next,
                };
                let admit = results.len() < ef
                    || results.peek().map_or(true, |worst| scored.distance < worst.distance);
                if admit {
                    candidates.push(Reverse(scored));
                    results.push(scored);
                    if results.len() > ef {
                        results.pop();
                    }
                }
            }
        }

        results.into_sorted_vec()
    }

    /// Greedy descent from the entry point down to `target_layer + 1`.
    fn descend(&self, query: &[f32], target_layer: usize) -> Option<Scored> {
        let entry = self.entry_point?;
        let mut best = Scored {
            distance: self.dist(query, entry),
            node: entry,
        };
        let mut layer = self.max_layer;
        while layer > target_layer {
            best = self
                .search_layer(query, &[best], 1, layer)
                .first()
                .copied()
                .unwrap_or(best);
            layer -= 1;
        }
        Some(best)
    }

    fn insert(&mut self, node: usize) {
        let level = self.level_for(self.ids[node]);
        self.links.push(vec![Vec::new(); level + 1]);

        let Some(entry) = self.entry_point else {
            self.entry_point = Some(node);
            self.max_layer = level;
            return;
        };

        let query = self.vectors[node].clone();
        let mut nearest = match self.descend(&query, level) {
            Some(best) => vec![best],
            None => vec![Scored {
                distance: self.dist(&query, entry),
                node: entry,
            }],
        };

        for layer in (0..=level.min(self.max_layer)).rev() {
            let found = self.search_layer(&query, &nearest, self.ef_construction, layer);
            let selected: Vec<usize> = found.iter().take(self.m).map(|s| s.node).collect();

            self.links[node][layer].clone_from(&selected);
            for &peer in &selected {
                self.links[peer][layer].push(node);
                self.prune(peer, layer);
            }
            nearest = found;
        }

        if level > self.max_layer {
            self.max_layer = level;
            self.entry_point = Some(node);
        }
    }

    /// Keeps the closest `max_links(layer)` neighbors of `node`.
    fn prune(&mut self, node: usize, layer: usize) {
        let cap = self.max_links(layer);
        if self.links[node][layer].len() <= cap {
            return;
        }
        let base = self.vectors[node].clone();
        let mut scored: Vec<Scored> = self.links[node][layer]
            .iter()
            .map(|&peer| Scored {
                distance: self.dist(&base, peer),
                node: peer,
            })
            .collect();
        scored.sort();
        scored.truncate(cap);
        self.links[node][layer] = scored.into_iter().map(|s| s.node).collect();
    }
}

impl AnnIndex for HnswIndex {
    fn backend(&self) -> AnnBackendKind {
        AnnBackendKind::Hnsw
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn build_index(&mut self, ids: &[EntityId], vectors: &[Vec<f32>]) -> Result<(), AnnError> {
        let (dim, prepared) = prepare_vectors(ids, vectors, self.metric)?;
        self.dim = dim;
        self.ids = ids.to_vec();
        self.vectors = prepared;
        self.links = Vec::with_capacity(ids.len());
        self.entry_point = None;
        self.max_layer = 0;

        for node in 0..self.ids.len() {
            self.insert(node);
        }
        Ok(())
    }

    fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<Neighbor>, AnnError> {
        let Some(dim) = self.dim else {
            return Ok(Vec::new());
        };
        let q = prepare_query(query, dim, self.metric)?;
        let Some(entry) = self.descend(&q, 0) else {
            return Ok(Vec::new());
        };

        let ef = self.ef_search.max(top_k);
        Ok(self
            .search_layer(&q, &[entry], ef, 0)
            .into_iter()
            .take(top_k)
            .map(|s| Neighbor {
                id: self.ids[s.node],
                score: similarity_from_distance(self.metric, s.distance),
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn dim(&self) -> Option<usize> {
        self.dim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::index::ann::FlatIndex;

    /// Deterministic pseudo-random vectors.
    fn vectors(n: usize, dim: usize) -> Vec<Vec<f32>> {
        (0..n)
            .map(|i| {
                let hash = blake3::hash(format!("vec-{i}").as_bytes());
                hash.as_bytes()
                    .iter()
                    .take(dim)
                    .map(|&b| f32::from(b) / 255.0 - 0.5)
                    .collect()
            })
            .collect()
    }

    #[test]
    fn recall_matches_flat_on_small_corpus() {
        let ids: Vec<EntityId> = (0..300).map(|_| EntityId::new()).collect();
        let data = vectors(300, 16);

        let mut hnsw = HnswIndex::new(Metric::Cosine, 16, 200, 64);
        hnsw.build_index(&ids, &data).unwrap();
        let mut flat = FlatIndex::new(Metric::Cosine);
        flat.build_index(&ids, &data).unwrap();

        let mut agree = 0;
        for query in data.iter().take(50) {
            let a = hnsw.search(query, 1).unwrap();
            let b = flat.search(query, 1).unwrap();
            if a[0].id == b[0].id {
                agree += 1;
            }
        }
        assert!(agree >= 48, "top-1 agreement {agree}/50");
    }

    #[test]
    fn links_respect_caps() {
        let ids: Vec<EntityId> = (0..200).map(|_| EntityId::new()).collect();
        let mut index = HnswIndex::new(Metric::L2, 4, 50, 20);
        index.build_index(&ids, &vectors(200, 8)).unwrap();
        for node_links in &index.links {
            for (layer, links) in node_links.iter().enumerate() {
                assert!(links.len() <= index.max_links(layer));
            }
        }
    }

    #[test]
    fn set_ef_search_clamps() {
        let mut index = HnswIndex::new(Metric::Cosine, 16, 200, 50);
        index.set_ef_search(0);
        assert_eq!(index.ef_search(), 1);
        index.set_ef_search(128);
        assert_eq!(index.ef_search(), 128);
    }

    #[test]
    fn level_assignment_is_deterministic() {
        let index = HnswIndex::new(Metric::Cosine, 16, 200, 50);
        let id = EntityId::new();
        assert_eq!(index.level_for(id), index.level_for(id));
        assert!(index.level_for(id) <= MAX_LEVEL);
    }
}
