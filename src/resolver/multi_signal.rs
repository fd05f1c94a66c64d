//! Mode B: multi-signal aggregation.
//!
//! Candidates come from the union of exact hits, blocking and vector search.
//! Every candidate is scored on every signal, the signals are combined by
//! [`WeightedAggregator`] and the best candidate is classified against the
//! aggregate thresholds.

use tracing::{debug, warn};

use crate::aggregate::WeightedAggregator;
use crate::config::{CitationThresholds, ContextConfig, FuzzyWeights, ResolverConfig, Thresholds};
use crate::entity::{Entity, EntityId};
use crate::error::{ConfigurationError, ResolveResult};
use crate::index::Blocker;
use crate::mention::Mention;
use crate::outcome::{Candidate, Decision, MatchResult};
use crate::signals::{
    acronym_score, exact_signal, fuzzy_signal, semantic_signal, ContextualSignal, SignalKind, SignalScore,
};

use super::ResolveContext;

/// Scores every candidate on every signal and ranks them.
#[derive(Debug, Clone)]
pub struct MultiSignalResolver {
    thresholds: Thresholds,
    fuzzy_weights: FuzzyWeights,
    citation_thresholds: CitationThresholds,
    context: ContextConfig,
    top_k: usize,
    aggregator: WeightedAggregator,
}

impl MultiSignalResolver {
    /// Resolver configured from `config`.
    #[must_use]
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            fuzzy_weights: config.fuzzy_weights.clone(),
            citation_thresholds: config.citation_thresholds.clone(),
            context: config.context.clone(),
            top_k: config.ann.top_k.max(1),
            aggregator: WeightedAggregator::new(config.weights.clone()),
        }
    }

    /// Aggregator used to combine signals.
    #[must_use]
    pub fn aggregator(&self) -> &WeightedAggregator {
        &self.aggregator
    }

    /// Resolves one mention.
    ///
    /// A failure while scoring one candidate drops that candidate; the
    /// others are still ranked.
    ///
    /// # Errors
    ///
    /// Returns embedding or index errors raised while encoding or searching
    /// with the mention itself.
    pub fn resolve(&self, mention: Mention, ctx: &ResolveContext<'_>) -> ResolveResult<MatchResult> {
        let query = match ctx.provider {
            Some(provider) => Some(provider.encode(mention.text())?),
            None => None,
        };
        let exact_hits = ctx.index.exact().lookup(mention.normalized_text()).to_vec();
        let ids = self.generate_candidates(&mention, &exact_hits, query.as_deref(), ctx)?;
        if ids.is_empty() {
            debug!(mention = mention.text(), "no candidates generated");
            return Ok(MatchResult::no_match(mention));
        }

        let mut candidates = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(entity) = ctx.index.entity(id) else {
                warn!(entity = %id, "candidate missing from index snapshot, skipping");
                continue;
            };
            match self.score_candidate(&mention, entity, &exact_hits, query.as_deref(), ctx) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => warn!(entity = %id, error = %e, "failed to score candidate, skipping"),
            }
        }
        if candidates.is_empty() {
            return Ok(MatchResult::no_match(mention));
        }

        // stable: equal scores keep generation order
        candidates.sort_by(|a, b| b.final_score.total_cmp(&a.final_score));
        let best = &candidates[0];
        let decision = self.classify(best.final_score);
        debug!(
            mention = mention.text(),
            candidates = candidates.len(),
            best = %best.entity_id,
            score = best.final_score,
            %decision,
            "aggregated candidates"
        );

        let (entity_id, confidence, citations) = (best.entity_id, best.final_score, best.citations.clone());
        let result = if decision == Decision::NoMatch {
            let mut result = MatchResult::no_match(mention);
            result.confidence = confidence;
            result.citations = citations;
            result
        } else {
            MatchResult::matched(mention, entity_id, confidence, decision, citations)
        };
        Ok(result.with_candidates(candidates))
    }

    /// Decision band of an aggregated score.
    #[must_use]
    pub fn classify(&self, score: f32) -> Decision {
        let t = &self.thresholds;
        if score >= t.aggregate_auto_merge {
            Decision::AutoMerge
        } else if score >= t.aggregate_auto_link {
            Decision::AutoLink
        } else if score >= t.aggregate_review {
            Decision::Review
        } else {
            Decision::NoMatch
        }
    }

    /// Exact hits, then blocked candidates, then vector neighbours, with
    /// duplicates removed in first-seen order.
    fn generate_candidates(
        &self,
        mention: &Mention,
        exact_hits: &[EntityId],
        query: Option<&[f32]>,
        ctx: &ResolveContext<'_>,
    ) -> ResolveResult<Vec<EntityId>> {
        let mut ids: Vec<EntityId> = Vec::new();
        let mut push = |id: EntityId| {
            if !ids.contains(&id) {
                ids.push(id);
            }
        };

        exact_hits.iter().copied().for_each(&mut push);
        ctx.index
            .blocker()
            .get_candidates(mention)
            .into_iter()
            .for_each(&mut push);
        if let (Some(semantic), Some(query)) = (ctx.semantic, query) {
            if !semantic.is_empty() {
                for neighbor in semantic.search(query, self.top_k.min(semantic.len()))? {
                    push(neighbor.id);
                }
            }
        }
        Ok(ids)
    }

    fn score_candidate(
        &self,
        mention: &Mention,
        entity: &Entity,
        exact_hits: &[EntityId],
        query: Option<&[f32]>,
        ctx: &ResolveContext<'_>,
    ) -> ResolveResult<Candidate> {
        let cites = &self.citation_thresholds;
        let mut candidate = Candidate::new(entity.id);

        let exact = exact_signal(entity.id, exact_hits, cites.exact);
        record(&mut candidate, SignalKind::Exact, exact);

        let (fuzzy, token_set) = fuzzy_signal(
            mention.normalized_text(),
            &entity.normalized_name,
            &self.fuzzy_weights,
            cites.fuzzy,
        );
        record(&mut candidate, SignalKind::TokenSetRatio, token_set);
        candidate.set_signal(SignalKind::PartialRatio, fuzzy.partial);
        candidate.set_signal(SignalKind::LevenshteinSim, fuzzy.levenshtein);
        candidate.set_signal(SignalKind::JaroWinkler, fuzzy.jaro_winkler);
        candidate.set_signal(SignalKind::CombinedFuzzy, fuzzy.combined);

        let acronym = acronym_score(mention.text(), &entity.canonical_name, cites.acronym);
        record(&mut candidate, SignalKind::Acronym, acronym);

        if let (Some(provider), Some(query)) = (ctx.provider, query) {
            let stored = ctx.semantic.and_then(|s| s.vector(entity.id));
            let encoded;
            let vector = match stored {
                Some(v) => v,
                None => {
                    encoded = provider.encode(&entity.canonical_name)?;
                    encoded.as_slice()
                }
            };
            if vector.len() != query.len() {
                return Err(ConfigurationError::EmbeddingDimension {
                    expected: query.len(),
                    actual: vector.len(),
                }
                .into());
            }
            let semantic = semantic_signal(query, vector, provider.model_name(), cites.semantic);
            record(&mut candidate, SignalKind::EmbeddingCosine, semantic);
        }

        let contextual =
            ContextualSignal::score_at(mention.metadata(), entity, &self.context, cites.contextual, ctx.now);
        candidate.set_signal(SignalKind::Contextual, contextual.score());
        candidate.citations.extend(contextual.citations);

        candidate.final_score = self.aggregator.aggregate(&candidate);
        Ok(candidate)
    }
}

fn record(candidate: &mut Candidate, kind: SignalKind, signal: SignalScore) {
    candidate.set_signal(kind, signal.score);
    if let Some(citation) = signal.citation {
        candidate.cite(citation);
    }
}
