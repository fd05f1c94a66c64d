#![allow(dead_code)]

use std::collections::HashMap;

use entity_resolver::{EmbeddingError, EmbeddingProvider, Metadata};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn meta(pairs: &[(&str, &str)]) -> Metadata {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), serde_json::Value::from(*v)))
        .collect()
}

/// Embedder with hand-picked vectors; unknown texts point away from every
/// entity.
pub struct TableEmbedder {
    table: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    pub fn new(rows: &[(&str, [f32; 3])]) -> Self {
        Self {
            table: rows.iter().map(|(k, v)| ((*k).to_string(), v.to_vec())).collect(),
        }
    }
}

impl EmbeddingProvider for TableEmbedder {
    fn model_name(&self) -> &str {
        "table-3"
    }

    fn embedding_dim(&self) -> usize {
        3
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self
            .table
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0, 0.0, -1.0]))
    }
}
