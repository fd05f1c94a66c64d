use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use entity_resolver::{
    AnnBackendKind, LexicalEmbedder, Metadata, ResolutionEngine, ResolutionMode, ResolverConfig,
};

const PREFIXES: &[&str] = &[
    "Acme", "Globex", "Initech", "Umbrella", "Stark", "Wayne", "Cyberdyne", "Soylent", "Tyrell",
    "Wonka", "Hooli", "Vandelay", "Massive", "Gringotts", "Oscorp", "Aperture",
];
const SUFFIXES: &[&str] = &[
    "Industries", "Holdings", "Logistics", "Pharma", "Robotics", "Capital", "Foods", "Energy",
    "Media", "Systems", "Labs", "Motors", "Bank", "Partners", "Mining", "Airlines",
];

fn corpus() -> Vec<(String, String)> {
    // 256 synthetic companies, each with a ticker-style alias.
    PREFIXES
        .iter()
        .flat_map(|p| SUFFIXES.iter().map(move |s| (*p, *s)))
        .map(|(p, s)| {
            let ticker = format!("{}{}", &p[..2], &s[..2]).to_uppercase();
            (format!("{p} {s} Inc."), ticker)
        })
        .collect()
}

fn make_engine(mode: ResolutionMode, backend: Option<AnnBackendKind>) -> ResolutionEngine {
    let mut config = ResolverConfig::for_mode(mode);
    let mut builder = ResolutionEngine::builder();
    if let Some(backend) = backend {
        config.ann.backend = backend;
        builder = builder.embedding_provider(Arc::new(LexicalEmbedder::default()));
    }
    let mut engine = builder.config(config).build().unwrap();
    let entities = corpus()
        .into_iter()
        .map(|(name, ticker)| {
            entity_resolver::Entity::new(name, engine.normalizer())
                .unwrap()
                .with_aliases([ticker])
        })
        .collect();
    engine.add_entities(entities).unwrap();
    if backend.is_some() {
        engine.build_semantic_index().unwrap();
    }
    engine
}

fn bench_sequential(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential");
    group.throughput(Throughput::Elements(1));

    let engine = make_engine(ResolutionMode::Sequential, None);
    group.bench_function("exact_alias", |b| {
        b.iter(|| engine.resolve(black_box("WALA")).unwrap());
    });
    group.bench_function("fuzzy_fallthrough", |b| {
        b.iter(|| engine.resolve(black_box("Wayne Logistcs")).unwrap());
    });
    group.bench_function("no_match", |b| {
        b.iter(|| engine.resolve(black_box("Zorblax Quantum Yoghurt")).unwrap());
    });

    let engine = make_engine(ResolutionMode::Sequential, Some(AnnBackendKind::Hnsw));
    group.bench_function("semantic_hnsw", |b| {
        b.iter(|| engine.resolve(black_box("Zorblax Quantum Yoghurt")).unwrap());
    });

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");
    group.throughput(Throughput::Elements(1));

    let engine = make_engine(ResolutionMode::Aggregate, None);
    group.bench_function("lexical_only", |b| {
        b.iter(|| engine.resolve(black_box("Stark Robotic")).unwrap());
    });

    for backend in [AnnBackendKind::Flat, AnnBackendKind::Hnsw, AnnBackendKind::Ivf] {
        let engine = make_engine(ResolutionMode::Aggregate, Some(backend));
        group.bench_function(format!("with_{backend}"), |b| {
            b.iter(|| engine.resolve(black_box("Stark Robotic")).unwrap());
        });
    }

    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    let mentions: Vec<String> = corpus()
        .into_iter()
        .map(|(name, _)| name.replace("Inc.", "Incorporated"))
        .collect();
    group.throughput(Throughput::Elements(mentions.len() as u64));

    for workers in [1usize, 4] {
        let mut config = ResolverConfig::for_mode(ResolutionMode::Aggregate);
        config.batch.workers = workers;
        config.batch.min_batch_for_parallel = 1;
        let mut engine = ResolutionEngine::new(config).unwrap();
        for (name, ticker) in corpus() {
            engine.add_entity(&name, [ticker], Metadata::new()).unwrap();
        }
        group.bench_function(format!("workers_{workers}"), |b| {
            b.iter(|| engine.resolve_batch(mentions.iter().map(String::as_str)).unwrap());
        });
    }

    group.finish();
}

criterion_group!(resolve, bench_sequential, bench_aggregate, bench_batch);
criterion_main!(resolve);
