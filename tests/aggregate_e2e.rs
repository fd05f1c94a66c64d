mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use entity_resolver::{
    AnnBackendKind, Decision, LexicalEmbedder, Mention, MentionInput, Metadata, NextStep, ResolutionEngine,
    ResolutionMode, ResolverConfig, SignalKind,
};

use common::{init_tracing, meta};

fn engine() -> ResolutionEngine {
    init_tracing();
    ResolutionEngine::builder()
        .mode(ResolutionMode::Aggregate)
        .build()
        .unwrap()
}

#[test]
fn domain_metadata_ranks_the_right_apple_first() {
    let mut engine = engine();
    let inc = engine
        .add_entity("Apple Inc.", Vec::<String>::new(), meta(&[("domain", "apple.com")]))
        .unwrap();
    let records = engine
        .add_entity("Apple Records", Vec::<String>::new(), Metadata::new())
        .unwrap();

    let result = engine
        .resolve(("apple", meta(&[("domain", "apple.com")])))
        .unwrap();
    assert_eq!(result.matched_entity, Some(inc));
    let rank = |id: entity_resolver::EntityId| result.candidates.iter().position(|c| c.entity_id == id).unwrap();
    assert!(rank(inc) < rank(records));
    assert_eq!(result.decision, Decision::AutoMerge);
}

#[test]
fn domain_breaks_a_lexical_tie() {
    let mut engine = engine();
    let records = engine
        .add_entity("Apple Records", Vec::<String>::new(), Metadata::new())
        .unwrap();
    let inc = engine
        .add_entity("Apple Inc.", Vec::<String>::new(), meta(&[("domain", "apple.com")]))
        .unwrap();

    let with_domain = Mention::with_details(
        "Apple Computer",
        Some("press release".to_string()),
        meta(&[("domain", "APPLE.COM")]),
        engine.normalizer(),
    )
    .unwrap();
    let result = engine.resolve(MentionInput::Mention(with_domain)).unwrap();

    assert_eq!(result.candidates[0].entity_id, inc);
    assert_eq!(result.candidates[1].entity_id, records);
    assert!(result.candidates[0]
        .citations
        .iter()
        .any(|c| c.method == "domain_match"));
    // below the review band the best candidate is reported but not matched
    assert!(result.matched_entity.is_none());
    assert_eq!(result.next_step, NextStep::NewEntity);
    assert!((result.confidence - result.candidates[0].final_score).abs() < f32::EPSILON);
}

#[test]
fn email_domain_counts_as_context() {
    let mut engine = engine();
    let acme = engine
        .add_entity("Acme Rockets", Vec::<String>::new(), meta(&[("email", "sales@acme.io")]))
        .unwrap();
    engine
        .add_entity("Acme Roadrunner", Vec::<String>::new(), Metadata::new())
        .unwrap();

    let result = engine
        .resolve(("Acme", meta(&[("email", "wile@acme.io")])))
        .unwrap();
    assert_eq!(result.candidates[0].entity_id, acme);
    assert!(result.candidates[0]
        .citations
        .iter()
        .any(|c| c.method == "email_domain_match"));
}

#[test]
fn recently_seen_entity_ranks_higher() {
    let mut engine = engine();
    let old = engine
        .add_entity("Acme Rockets", Vec::<String>::new(), Metadata::new())
        .unwrap();
    let fresh = engine
        .add_entity("Acme Roadrunner", Vec::<String>::new(), Metadata::new())
        .unwrap();
    engine.mark_seen(old, Utc::now() - Duration::days(90)).unwrap();
    engine.mark_seen(fresh, Utc::now()).unwrap();

    let result = engine.resolve("Acme").unwrap();
    assert_eq!(result.candidates[0].entity_id, fresh);
    assert!(result.candidates[0].signal(SignalKind::Contextual) > 0.1);
}

#[test]
fn exact_hit_scores_exactly_one() {
    let mut engine = engine();
    let id = engine
        .add_entity("Goldman Sachs Group", ["GS"], Metadata::new())
        .unwrap();
    let result = engine.resolve("gs").unwrap();
    assert_eq!(result.matched_entity, Some(id));
    assert!((result.confidence - 1.0).abs() < f32::EPSILON);
    assert!((result.candidates[0].final_score - 1.0).abs() < f32::EPSILON);
}

#[test]
fn scores_stay_in_unit_interval_and_sorted() {
    let mut engine = engine();
    for name in [
        "Goldman Sachs",
        "Goldman Sachs Group",
        "Gold Fields",
        "Golden State Warriors",
        "Sachs Harbour",
    ] {
        engine
            .add_entity(name, Vec::<String>::new(), Metadata::new())
            .unwrap();
    }
    for text in ["Goldman", "Goldman Sachs Bank", "gold", "sachs", "GSW"] {
        let result = engine.resolve(text).unwrap();
        for pair in result.candidates.windows(2) {
            assert!(pair[0].final_score >= pair[1].final_score, "{text}");
        }
        for c in &result.candidates {
            assert!((0.0..=1.0).contains(&c.final_score), "{text}");
        }
        assert!((0.0..=1.0).contains(&result.confidence));
    }
}

#[test]
fn embeddings_feed_the_aggregate() {
    init_tracing();
    for backend in [AnnBackendKind::Flat, AnnBackendKind::Hnsw, AnnBackendKind::Ivf] {
        let mut config = ResolverConfig::for_mode(ResolutionMode::Aggregate);
        config.ann.backend = backend;
        let mut engine = ResolutionEngine::builder()
            .config(config)
            .embedding_provider(Arc::new(LexicalEmbedder::default()))
            .build()
            .unwrap();
        let zebra = engine
            .add_entity("Zebra Technologies", Vec::<String>::new(), Metadata::new())
            .unwrap();
        engine
            .add_entity("Apple Inc.", Vec::<String>::new(), Metadata::new())
            .unwrap();
        engine.build_semantic_index().unwrap();

        let result = engine.resolve("Zebras Technology").unwrap();
        assert_eq!(result.candidates[0].entity_id, zebra, "{backend}");
        assert!(result.candidates[0].signal(SignalKind::EmbeddingCosine) > 0.5);
        assert!(result
            .candidates
            .iter()
            .all(|c| c.signals.contains_key(&SignalKind::EmbeddingCosine)));
    }
}

#[test]
fn batch_preserves_order() {
    let mut engine = engine();
    let apple = engine.add_entity("Apple Inc.", ["AAPL"], Metadata::new()).unwrap();
    let ms = engine
        .add_entity("Microsoft Corporation", ["MSFT"], Metadata::new())
        .unwrap();

    let results = engine.resolve_batch(["MSFT", "nothing here", "AAPL"]).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].matched_entity, Some(ms));
    assert!(!results[1].is_match());
    assert_eq!(results[2].matched_entity, Some(apple));
}
