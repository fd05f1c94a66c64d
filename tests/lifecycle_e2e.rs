mod common;

use std::sync::Arc;

use chrono::Utc;
use entity_resolver::{
    AliasSource, EmbeddingError, EmbeddingProvider, LexicalEmbedder, Metadata, ResolutionEngine,
    ResolutionMode, ResolverConfig,
};

use common::init_tracing;

/// Lexical embeddings, except one name the backend refuses to encode.
struct RefusesOne {
    inner: LexicalEmbedder,
    refused: &'static str,
}

impl EmbeddingProvider for RefusesOne {
    fn model_name(&self) -> &str {
        "refuses-one"
    }

    fn embedding_dim(&self) -> usize {
        self.inner.embedding_dim()
    }

    fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text == self.refused {
            return Err(EmbeddingError::Backend {
                model: "refuses-one".to_string(),
                reason: format!("cannot encode '{text}'"),
            });
        }
        self.inner.encode(text)
    }
}

fn engine(mode: ResolutionMode) -> ResolutionEngine {
    init_tracing();
    let mut engine = ResolutionEngine::builder()
        .config(ResolverConfig::for_mode(mode))
        .embedding_provider(Arc::new(RefusesOne {
            inner: LexicalEmbedder::default(),
            refused: "Bad Corp",
        }))
        .build()
        .unwrap();
    engine
        .add_entity("Apple Inc.", ["AAPL"], Metadata::new())
        .unwrap();
    engine
        .add_entity("Microsoft Corporation", ["MSFT"], Metadata::new())
        .unwrap();
    engine.build_semantic_index().unwrap();
    engine
}

#[test]
fn committed_write_succeeds_when_semantic_rebuild_fails() {
    let mut engine = engine(ResolutionMode::Sequential);
    assert!(!engine.is_semantic_index_stale());

    let bad = engine
        .add_entity("Bad Corp", Vec::<String>::new(), Metadata::new())
        .unwrap();
    assert_eq!(engine.entities().unwrap().len(), 3);
    assert!(engine.has_semantic_index());
    assert!(engine.is_semantic_index_stale());

    // lexical indices already see the new entity
    assert_eq!(engine.resolve("bad corp").unwrap().matched_entity, Some(bad));
    assert!(engine.resolve("AAPL").unwrap().is_match());
    assert!(engine.resolve("Zzyzx Quarry").is_ok());

    engine.add_alias(bad, "BC", AliasSource::Manual, 1.0).unwrap();
    engine.mark_seen(bad, Utc::now()).unwrap();
    assert_eq!(engine.entities().unwrap().len(), 3);
    assert!(engine.is_semantic_index_stale());

    // once the unencodable entity is gone the rebuild works again
    engine.delete_entity(bad).unwrap();
    assert!(engine.has_semantic_index());
    assert!(!engine.is_semantic_index_stale());
}

#[test]
fn explicit_rebuild_reports_the_failure_and_keeps_the_index() {
    let mut engine = engine(ResolutionMode::Aggregate);
    engine
        .add_entity("Bad Corp", Vec::<String>::new(), Metadata::new())
        .unwrap();

    let err = engine.rebuild_indices().unwrap_err();
    assert!(err.to_string().contains("Bad Corp"));
    assert!(engine.has_semantic_index());
    assert!(engine.is_semantic_index_stale());

    let result = engine.resolve("MSFT").unwrap();
    assert!(result.is_match());
}

#[test]
fn stale_index_never_returns_deleted_entities() {
    let mut engine = engine(ResolutionMode::Sequential);
    let apple = engine.entities().unwrap()[0].id;
    engine
        .add_entity("Bad Corp", Vec::<String>::new(), Metadata::new())
        .unwrap();
    engine.delete_entity(apple).unwrap();
    assert!(engine.is_semantic_index_stale());

    let result = engine.resolve("Apple Incorporated Computers").unwrap();
    assert_ne!(result.matched_entity, Some(apple));

    assert!(engine.entity(apple).unwrap().is_none());
}
