//! # entity-resolver
//!
//! Resolves free-text mentions ("apple inc", "AAPL", "International
//! Business Machines") to canonical entities, with an auditable score and a
//! next-step decision for every call.
//!
//! ## Core Concepts
//!
//! - **Entity**: a canonical record with a name, aliases and metadata
//! - **Mention**: an incoming text to be matched
//! - **Signal**: one similarity measurement between a mention and a candidate
//! - **Citation**: which method produced how much of a score
//! - **Next step**: no action, human review, or new entity
//!
//! Two strategies are available. `sequential` (mode A) runs exact, acronym,
//! fuzzy and embedding stages and stops at the first confident one.
//! `aggregate` (mode B) scores every candidate on every signal and ranks
//! them by a weighted sum.
//!
//! ## Usage
//!
//! ```
//! use entity_resolver::{Metadata, NextStep, ResolutionEngine, ResolutionMode};
//!
//! let mut engine = ResolutionEngine::builder()
//!     .mode(ResolutionMode::Sequential)
//!     .build()
//!     .unwrap();
//! engine.add_entity("Apple Inc.", ["Apple", "AAPL"], Metadata::new()).unwrap();
//!
//! let hit = engine.resolve("apple inc").unwrap();
//! assert!((hit.confidence - 1.0).abs() < f32::EPSILON);
//!
//! let miss = engine.resolve("totally-unrelated-xyz").unwrap();
//! assert_eq!(miss.next_step, NextStep::NewEntity);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod entity;
pub mod error;
pub mod mention;
pub mod outcome;
pub mod review;

// Configuration and text processing
pub mod config;
pub mod normalize;

// Candidate generation and scoring
pub mod aggregate;
pub mod embedding;
pub mod index;
pub mod signals;

// Resolution
pub mod engine;
pub mod resolver;
pub mod storage;

// Re-export primary types at crate root for convenience
pub use aggregate::{AggregationBreakdown, WeightedAggregator};
pub use config::ResolverConfig;
pub use embedding::{EmbeddingError, EmbeddingProvider, LexicalEmbedder};
pub use engine::{ResolutionEngine, ResolutionEngineBuilder};
pub use entity::{Alias, AliasId, AliasSource, Entity, EntityId, Metadata};
pub use error::{ConfigurationError, ResolveError, ResolveResult, ValidationError};
pub use index::ann::{AnnBackendKind, AnnIndex, Metric};
pub use mention::{Mention, MentionInput};
pub use normalize::Normalizer;
pub use outcome::{Candidate, Citation, Decision, MatchResult, NextStep};
pub use resolver::{ResolutionMode, Strategy};
pub use review::{ReviewDecision, ReviewItem, ReviewItemId, ReviewStatus};
pub use signals::SignalKind;
pub use storage::{EntityStore, InMemoryEntityStore, StorageError};
