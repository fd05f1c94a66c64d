//! Resolver facade.
//!
//! [`ResolutionEngine`] owns the entity store, the lexical indices derived
//! from it, the optional semantic index and the strategy chosen at build
//! time. Mutators take `&mut self` and rebuild the indices; resolution takes
//! `&self`, so readers and the single writer never overlap.
//!
//! A mutator succeeds once the store write succeeds. Re-indexing after the
//! write is best effort: if the semantic index cannot be rebuilt the
//! previous one stays in place, marked stale, until a later rebuild works.

/// Bounded worker fan-out used by batch resolution.
pub mod runtime;

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::embedding::EmbeddingProvider;
use crate::entity::{Alias, AliasId, AliasSource, Entity, EntityId, Metadata};
use crate::error::{ResolveError, ResolveResult};
use crate::index::{CandidateIndex, SemanticIndex};
use crate::mention::{Mention, MentionInput};
use crate::normalize::Normalizer;
use crate::outcome::MatchResult;
use crate::resolver::{ResolutionMode, ResolveContext, Strategy};
use crate::review::{ReviewDecision, ReviewItem, ReviewItemId, ReviewStatus};
use crate::storage::{EntityStore, InMemoryEntityStore};

use runtime::FanOut;

/// Builder for [`ResolutionEngine`].
#[derive(Default)]
pub struct ResolutionEngineBuilder {
    config: ResolverConfig,
    store: Option<Arc<dyn EntityStore>>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
}

impl ResolutionEngineBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Shorthand for setting `config.mode`.
    #[must_use]
    pub fn mode(mut self, mode: ResolutionMode) -> Self {
        self.config.mode = mode;
        self
    }

    /// Uses an existing store. Entities already in it are indexed at build.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn EntityStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Embedding backend for the semantic index and the embedding signal.
    #[must_use]
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Validates the configuration and indexes the store.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an invalid configuration, or a
    /// storage error if the store cannot be read.
    pub fn build(self) -> ResolveResult<ResolutionEngine> {
        self.config.validate()?;
        let normalizer = Normalizer::new(&self.config.normalization);
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryEntityStore::with_normalizer(normalizer.clone())));

        let mut engine = ResolutionEngine {
            strategy: Strategy::from_config(&self.config),
            index: CandidateIndex::empty(&self.config.blocking),
            config: self.config,
            normalizer,
            store,
            provider: self.provider,
            semantic: None,
            semantic_requested: false,
            semantic_stale: false,
        };
        engine.rebuild_indices()?;
        info!(
            mode = %engine.mode(),
            entities = engine.index.len(),
            embedding = engine.provider.as_deref().map(|p| p.model_name()),
            "resolution engine ready"
        );
        Ok(engine)
    }
}

/// Entity resolution facade.
///
/// # Examples
///
/// ```
/// use entity_resolver::{Metadata, ResolutionEngine};
///
/// let mut engine = ResolutionEngine::builder().build().unwrap();
/// let apple = engine.add_entity("Apple Inc.", ["Apple", "AAPL"], Metadata::new()).unwrap();
///
/// let result = engine.resolve("AAPL").unwrap();
/// assert_eq!(result.matched_entity, Some(apple));
/// assert!((result.confidence - 1.0).abs() < f32::EPSILON);
/// ```
pub struct ResolutionEngine {
    config: ResolverConfig,
    normalizer: Normalizer,
    store: Arc<dyn EntityStore>,
    provider: Option<Arc<dyn EmbeddingProvider>>,
    index: CandidateIndex,
    semantic: Option<SemanticIndex>,
    /// Set once a semantic index was built; rebuilds then re-create it.
    semantic_requested: bool,
    /// Last semantic rebuild failed; `semantic` predates the store.
    semantic_stale: bool,
    strategy: Strategy,
}

impl fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("mode", &self.mode())
            .field("entities", &self.index.len())
            .field("semantic", &self.semantic.as_ref().map(SemanticIndex::len))
            .field("semantic_stale", &self.semantic_stale)
            .field("provider", &self.provider.as_deref().map(|p| p.model_name()))
            .finish_non_exhaustive()
    }
}

impl ResolutionEngine {
    /// Starts a [`ResolutionEngineBuilder`].
    #[must_use]
    pub fn builder() -> ResolutionEngineBuilder {
        ResolutionEngineBuilder::new()
    }

    /// Engine over an empty in-memory store.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `config` is invalid.
    pub fn new(config: ResolverConfig) -> ResolveResult<Self> {
        Self::builder().config(config).build()
    }

    /// Active resolution mode.
    #[must_use]
    pub fn mode(&self) -> ResolutionMode {
        self.strategy.mode()
    }

    /// Validated configuration.
    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Normalizer built from `config.normalization`.
    #[must_use]
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Backing entity store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// True once [`build_semantic_index`](Self::build_semantic_index) has
    /// produced a non-empty index.
    #[must_use]
    pub fn has_semantic_index(&self) -> bool {
        self.semantic.is_some()
    }

    /// True when the last semantic rebuild failed and the current semantic
    /// index does not reflect the latest store writes.
    #[must_use]
    pub fn is_semantic_index_stale(&self) -> bool {
        self.semantic_stale
    }

    /// Creates an entity and re-indexes.
    ///
    /// Every index is rebuilt from the store, so each call costs time
    /// proportional to the whole corpus. Use [`add_entities`](Self::add_entities)
    /// for bulk loads.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name, or a storage error from
    /// the write. Re-indexing failures are logged, not returned.
    pub fn add_entity<I, S>(&mut self, name: &str, aliases: I, metadata: Metadata) -> ResolveResult<EntityId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entity = Entity::new(name, &self.normalizer)?
            .with_aliases(aliases)
            .with_metadata(metadata);
        let id = self.store.create_entity(entity)?;
        debug!(entity = %id, name, "added entity");
        self.reindex_after_write();
        Ok(id)
    }

    /// Stores prepared entities with a single rebuild.
    ///
    /// Names are re-normalized with the engine's normalizer unless the
    /// entity already carries a normalized name.
    ///
    /// # Errors
    ///
    /// Returns the first validation or storage error; entities stored before
    /// it stay stored and indexed.
    pub fn add_entities(&mut self, entities: Vec<Entity>) -> ResolveResult<Vec<EntityId>> {
        let mut ids = Vec::with_capacity(entities.len());
        let mut failure = None;
        for mut entity in entities {
            if entity.normalized_name.is_empty() {
                entity.normalized_name = self.normalizer.normalize(&entity.canonical_name);
            }
            match entity.validate().map_err(ResolveError::from).and_then(|()| {
                self.store.create_entity(entity).map_err(ResolveError::from)
            }) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        self.reindex_after_write();
        info!(added = ids.len(), "bulk entity load");
        match failure {
            Some(e) => Err(e),
            None => Ok(ids),
        }
    }

    /// Attaches an alias record to an entity and re-indexes.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank text or a confidence outside
    /// `[0, 1]`, not-found for an unknown entity, or a storage error for a
    /// duplicate alias.
    pub fn add_alias(
        &mut self,
        entity_id: EntityId,
        text: &str,
        source: AliasSource,
        confidence: f32,
    ) -> ResolveResult<AliasId> {
        let alias = Alias::new(entity_id, text, source, confidence, &self.normalizer)?;
        let id = self.store.add_alias(alias)?;
        debug!(entity = %entity_id, alias = text, "added alias");
        self.reindex_after_write();
        Ok(id)
    }

    /// Alias records of an entity.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown entity.
    pub fn aliases(&self, entity_id: EntityId) -> ResolveResult<Vec<Alias>> {
        Ok(self.store.get_aliases(entity_id)?)
    }

    /// Replaces a stored entity and re-indexes.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id, or a storage error.
    pub fn update_entity(&mut self, entity: Entity) -> ResolveResult<()> {
        let id = entity.id;
        self.store.update_entity(entity)?;
        debug!(entity = %id, "updated entity");
        self.reindex_after_write();
        Ok(())
    }

    /// Removes an entity and its aliases from the store and every index.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id.
    pub fn delete_entity(&mut self, id: EntityId) -> ResolveResult<()> {
        self.store.delete_entity(id)?;
        debug!(entity = %id, "deleted entity");
        self.reindex_after_write();
        Ok(())
    }

    /// Records that an entity was seen at `at`, feeding the recency boost.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id.
    pub fn mark_seen(&mut self, id: EntityId, at: DateTime<Utc>) -> ResolveResult<()> {
        let mut entity = self
            .store
            .get_entity(id)?
            .ok_or(ResolveError::EntityNotFound { id })?;
        entity.last_seen = Some(at);
        self.store.update_entity(entity)?;
        self.reindex_after_write();
        Ok(())
    }

    /// Stored entity by id.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read.
    pub fn entity(&self, id: EntityId) -> ResolveResult<Option<Entity>> {
        Ok(self.store.get_entity(id)?)
    }

    /// All stored entities in insertion order.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read.
    pub fn entities(&self) -> ResolveResult<Vec<Entity>> {
        Ok(self.store.get_all_entities()?)
    }

    /// Builds the semantic index over every stored canonical name.
    ///
    /// An empty store yields no index; the request is remembered so the
    /// index appears on the next rebuild.
    ///
    /// # Errors
    ///
    /// Returns `DependencyUnavailable` when no embedding provider was
    /// configured, or the embedding/index error that stopped the build. On
    /// error any previous semantic index is kept, and the engine keeps
    /// resolving.
    pub fn build_semantic_index(&mut self) -> ResolveResult<()> {
        let Some(provider) = self.provider.as_deref() else {
            return Err(ResolveError::dependency_unavailable(
                "embedding provider",
                "no embedding provider configured",
            ));
        };
        let semantic = if self.index.is_empty() {
            info!("no entities to embed, semantic index deferred");
            None
        } else {
            match SemanticIndex::build(provider, self.index.entities(), &self.config.ann) {
                Ok(index) => Some(index),
                Err(err) => {
                    self.semantic_stale = self.semantic.is_some();
                    return Err(err);
                }
            }
        };
        self.semantic = semantic;
        self.semantic_stale = false;
        self.semantic_requested = true;
        Ok(())
    }

    /// Re-derives every index from the store, including the semantic index
    /// if one was requested before.
    ///
    /// # Errors
    ///
    /// Returns a storage error, or the semantic build error. The lexical
    /// indices are already rebuilt and the previous semantic index is kept
    /// when the semantic build fails.
    pub fn rebuild_indices(&mut self) -> ResolveResult<()> {
        let entities = self.store.get_all_entities()?;
        self.index = CandidateIndex::build(entities, &self.normalizer, &self.config.blocking);
        debug!(entities = self.index.len(), "rebuilt lexical indices");
        if self.semantic_requested {
            self.build_semantic_index()?;
        }
        Ok(())
    }

    /// Re-indexes after a committed store write. Failures leave the previous
    /// indices in place.
    fn reindex_after_write(&mut self) {
        if let Err(err) = self.rebuild_indices() {
            warn!(
                error = %err,
                semantic_stale = self.semantic_stale,
                "re-index after write failed, keeping previous indices"
            );
        }
    }

    /// Turns raw text into a normalized mention.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank text.
    pub fn mention(&self, text: &str) -> ResolveResult<Mention> {
        Ok(Mention::new(text, &self.normalizer)?)
    }

    fn context(&self) -> ResolveContext<'_> {
        ResolveContext::lexical(&self.index).with_semantic(self.semantic.as_ref(), self.provider.as_deref())
    }

    /// Resolves a text or mention against the known entities.
    ///
    /// # Errors
    ///
    /// Returns a validation error for blank text, or an embedding/index
    /// error from the semantic path. No match is a `new_entity` result.
    pub fn resolve(&self, input: impl Into<MentionInput>) -> ResolveResult<MatchResult> {
        let mention = input.into().into_mention(&self.normalizer)?;
        self.resolve_with(mention, &self.context())
    }

    /// Resolves many mentions, in input order.
    ///
    /// Inputs are all validated before any is resolved. With
    /// `batch.workers > 1` and at least `batch.min_batch_for_parallel`
    /// inputs the work is spread over worker threads.
    ///
    /// # Errors
    ///
    /// Returns the first validation error, or the first resolution error in
    /// input order.
    pub fn resolve_batch<I, M>(&self, inputs: I) -> ResolveResult<Vec<MatchResult>>
    where
        I: IntoIterator<Item = M>,
        M: Into<MentionInput>,
    {
        let mentions = inputs
            .into_iter()
            .map(|input| input.into().into_mention(&self.normalizer))
            .collect::<Result<Vec<_>, _>>()?;

        let ctx = self.context();
        let batch = &self.config.batch;
        if batch.workers > 1 && mentions.len() >= batch.min_batch_for_parallel {
            let fan_out = FanOut {
                workers: batch.workers,
                queue_capacity: batch.queue_capacity,
            };
            fan_out
                .run(mentions, |mention| self.resolve_with(mention, &ctx))?
                .into_iter()
                .collect()
        } else {
            mentions
                .into_iter()
                .map(|mention| self.resolve_with(mention, &ctx))
                .collect()
        }
    }

    fn resolve_with(&self, mention: Mention, ctx: &ResolveContext<'_>) -> ResolveResult<MatchResult> {
        let result = self.strategy.resolve(mention, ctx)?;
        if self.config.review.enqueue_on_review && result.needs_review() {
            let item = ReviewItem::from_result(&result, self.config.review.max_candidates);
            let item_id = self.store.save_review_item(item)?;
            info!(
                item = %item_id,
                mention = result.mention.text(),
                confidence = result.confidence,
                "queued for review"
            );
        }
        Ok(result)
    }

    /// Review items with the given status, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the store cannot be read.
    pub fn get_review_queue(&self, status: ReviewStatus) -> ResolveResult<Vec<ReviewItem>> {
        Ok(self.store.get_review_queue(status)?)
    }

    /// Records a reviewer's verdict on a queued item.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown item or for an approval naming an
    /// unknown entity, and `ReviewAlreadyDecided` for an item that already
    /// has a verdict.
    pub fn review(
        &self,
        item_id: ReviewItemId,
        decision: ReviewDecision,
        reviewer: Option<&str>,
    ) -> ResolveResult<ReviewItem> {
        let mut item = self
            .store
            .get_review_item(item_id)?
            .ok_or(ResolveError::ReviewItemNotFound { id: item_id })?;
        if !item.is_pending() {
            return Err(ResolveError::ReviewAlreadyDecided {
                id: item_id,
                status: item.status,
            });
        }
        if let ReviewDecision::Approve(id) = decision {
            if self.store.get_entity(id)?.is_none() {
                return Err(ResolveError::EntityNotFound { id });
            }
        }
        item.apply(decision, reviewer.map(str::to_string), Utc::now())?;
        self.store.update_review_item(item.clone())?;
        info!(item = %item_id, status = ?item.status, "review recorded");
        Ok(item)
    }
}
