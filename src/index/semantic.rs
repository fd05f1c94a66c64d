//! Embedding-backed index over canonical names.

use std::collections::HashMap;

use tracing::info;

use crate::config::AnnConfig;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::entity::{Entity, EntityId};
use crate::error::{ConfigurationError, ResolveResult};
use crate::index::ann::{create_index, AnnIndex, Neighbor};

/// ANN index plus the raw entity vectors used for full cosine scoring.
#[derive(Debug)]
pub struct SemanticIndex {
    ann: Box<dyn AnnIndex>,
    vectors: HashMap<EntityId, Vec<f32>>,
    dim: usize,
}

impl SemanticIndex {
    /// Encodes every canonical name with `provider` and builds the
    /// configured ANN backend over them.
    ///
    /// # Errors
    ///
    /// Returns an embedding error if the provider fails or returns the wrong
    /// number of rows, a configuration error if a row does not have the
    /// provider's declared dimension, or an index error from the backend.
    pub fn build(
        provider: &dyn EmbeddingProvider,
        entities: &[Entity],
        config: &AnnConfig,
    ) -> ResolveResult<Self> {
        let dim = provider.embedding_dim();
        let texts: Vec<&str> = entities.iter().map(|e| e.canonical_name.as_str()).collect();
        let rows = provider.encode_batch(&texts)?;
        if rows.len() != texts.len() {
            return Err(EmbeddingError::BatchSize {
                expected: texts.len(),
                actual: rows.len(),
            }
            .into());
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != dim) {
            return Err(ConfigurationError::EmbeddingDimension {
                expected: dim,
                actual: bad.len(),
            }
            .into());
        }

        let ids: Vec<EntityId> = entities.iter().map(|e| e.id).collect();
        let mut ann = create_index(config);
        ann.build_index(&ids, &rows)?;

        info!(
            entities = ids.len(),
            dim,
            backend = %ann.backend(),
            metric = %ann.metric(),
            model = provider.model_name(),
            "built semantic index"
        );

        Ok(Self {
            ann,
            vectors: ids.into_iter().zip(rows).collect(),
            dim,
        })
    }

    /// Nearest entities to a query vector.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the query dimension differs from
    /// the indexed one.
    pub fn search(&self, query: &[f32], top_k: usize) -> ResolveResult<Vec<Neighbor>> {
        if query.len() != self.dim {
            return Err(ConfigurationError::EmbeddingDimension {
                expected: self.dim,
                actual: query.len(),
            }
            .into());
        }
        Ok(self.ann.search(query, top_k)?)
    }

    /// Stored embedding of an entity's canonical name.
    #[must_use]
    pub fn vector(&self, id: EntityId) -> Option<&[f32]> {
        self.vectors.get(&id).map(Vec::as_slice)
    }

    /// Backend name reported in citations.
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.ann.backend().as_str()
    }

    /// Embedding dimensionality.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Number of indexed vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ann.len()
    }

    /// True if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ann.is_empty()
    }
}
