mod common;

use std::sync::Arc;

use entity_resolver::{
    EntityStore, InMemoryEntityStore, Metadata, ResolutionEngine, ResolutionMode, ResolveError,
    ResolverConfig, ReviewDecision, ReviewStatus,
};

use common::{init_tracing, TableEmbedder};

fn queueing_config(mode: ResolutionMode) -> ResolverConfig {
    let mut config = ResolverConfig::for_mode(mode);
    config.review.enqueue_on_review = true;
    config
}

#[test]
fn review_results_are_queued_and_decided() {
    init_tracing();
    let store = Arc::new(InMemoryEntityStore::new());
    let provider = TableEmbedder::new(&[
        ("Apple Inc.", [1.0, 0.0, 0.0]),
        ("Zebra Technologies", [0.0, 0.0, 1.0]),
        ("fruit phone maker", [0.8, 0.6, 0.0]),
    ]);
    let mut config = queueing_config(ResolutionMode::Sequential);
    config.thresholds.auto_merge = 0.97;
    let mut engine = ResolutionEngine::builder()
        .config(config)
        .store(store.clone())
        .embedding_provider(Arc::new(provider))
        .build()
        .unwrap();
    let apple = engine
        .add_entity("Apple Inc.", Vec::<String>::new(), Metadata::new())
        .unwrap();
    engine
        .add_entity("Zebra Technologies", Vec::<String>::new(), Metadata::new())
        .unwrap();
    engine.build_semantic_index().unwrap();

    let result = engine.resolve("fruit phone maker").unwrap();
    assert!(result.needs_review());

    let pending = engine.get_review_queue(ReviewStatus::Pending).unwrap();
    assert_eq!(pending.len(), 1);
    let item = &pending[0];
    assert_eq!(item.mention.text(), "fruit phone maker");
    assert_eq!(item.candidates.len(), 1);
    assert_eq!(item.candidates[0].entity_id, apple);
    assert_eq!(store.get_review_queue(ReviewStatus::Pending).unwrap().len(), 1);

    let decided = engine
        .review(item.id, ReviewDecision::Approve(apple), Some("analyst-7"))
        .unwrap();
    assert_eq!(decided.status, ReviewStatus::Approved);
    assert_eq!(decided.reviewer.as_deref(), Some("analyst-7"));
    assert!(decided.reviewed_at.is_some());
    assert!(engine.get_review_queue(ReviewStatus::Pending).unwrap().is_empty());
}

#[test]
fn confident_and_new_entity_results_are_not_queued() {
    init_tracing();
    let mut engine = ResolutionEngine::new(queueing_config(ResolutionMode::Aggregate)).unwrap();
    engine.add_entity("Apple Inc.", ["AAPL"], Metadata::new()).unwrap();

    assert!(engine.resolve("AAPL").unwrap().is_match());
    assert!(!engine.resolve("qqqq").unwrap().is_match());
    assert!(engine.get_review_queue(ReviewStatus::Pending).unwrap().is_empty());
}

#[test]
fn queue_disabled_by_default() {
    init_tracing();
    let mut config = ResolverConfig::for_mode(ResolutionMode::Aggregate);
    config.thresholds.aggregate_review = 0.01;
    let mut engine = ResolutionEngine::new(config).unwrap();
    engine
        .add_entity("Goldman Sachs Group", Vec::<String>::new(), Metadata::new())
        .unwrap();
    assert!(engine.resolve("Goldman").unwrap().needs_review());
    assert!(engine.get_review_queue(ReviewStatus::Pending).unwrap().is_empty());
}

#[test]
fn rejecting_and_bad_approvals() {
    init_tracing();
    let mut config = queueing_config(ResolutionMode::Aggregate);
    config.thresholds.aggregate_review = 0.01;
    config.review.max_candidates = 1;
    let mut engine = ResolutionEngine::new(config).unwrap();
    let gs = engine
        .add_entity("Goldman Sachs Group", Vec::<String>::new(), Metadata::new())
        .unwrap();
    engine
        .add_entity("Goldman Sachs Bank", Vec::<String>::new(), Metadata::new())
        .unwrap();

    engine.resolve("Goldman").unwrap();
    let item = engine.get_review_queue(ReviewStatus::Pending).unwrap().remove(0);
    assert_eq!(item.candidates.len(), 1);

    engine.delete_entity(gs).unwrap();
    let err = engine
        .review(item.id, ReviewDecision::Approve(gs), None)
        .unwrap_err();
    assert!(err.is_not_found());

    let rejected = engine.review(item.id, ReviewDecision::Reject, None).unwrap();
    assert_eq!(rejected.status, ReviewStatus::Rejected);
    assert_eq!(engine.get_review_queue(ReviewStatus::Rejected).unwrap().len(), 1);
}

#[test]
fn decided_items_cannot_be_decided_again() {
    init_tracing();
    let mut config = queueing_config(ResolutionMode::Aggregate);
    config.thresholds.aggregate_review = 0.01;
    let mut engine = ResolutionEngine::new(config).unwrap();
    let gs = engine
        .add_entity("Goldman Sachs Group", Vec::<String>::new(), Metadata::new())
        .unwrap();

    engine.resolve("Goldman").unwrap();
    let item = engine.get_review_queue(ReviewStatus::Pending).unwrap().remove(0);
    let approved = engine
        .review(item.id, ReviewDecision::Approve(gs), Some("first"))
        .unwrap();

    let err = engine
        .review(item.id, ReviewDecision::Reject, Some("second"))
        .unwrap_err();
    assert!(matches!(
        err,
        ResolveError::ReviewAlreadyDecided {
            status: ReviewStatus::Approved,
            ..
        }
    ));
    assert!(err.to_string().contains("already approved"));

    let stored = engine.get_review_queue(ReviewStatus::Approved).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].final_entity, Some(gs));
    assert_eq!(stored[0].reviewer.as_deref(), Some("first"));
    assert_eq!(stored[0].reviewed_at, approved.reviewed_at);
    assert!(engine.get_review_queue(ReviewStatus::Rejected).unwrap().is_empty());
}
