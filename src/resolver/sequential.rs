//! Mode A: staged resolution.
//!
//! Stages run in order and the first confident one wins:
//! exact lookup, acronym, fuzzy token-set, embedding similarity. Candidate
//! generation and scoring are fused into the stages.

use tracing::debug;

use crate::config::{ResolverConfig, Thresholds};
use crate::entity::{Entity, EntityId};
use crate::error::ResolveResult;
use crate::index::exact::BUILTIN_SOURCE;
use crate::mention::Mention;
use crate::outcome::{Citation, Decision, MatchResult};
use crate::signals::{acronym_score, semantic_signal, token_set_ratio};

use super::ResolveContext;

/// First-confident-stage resolver.
#[derive(Debug, Clone)]
pub struct SequentialResolver {
    thresholds: Thresholds,
    top_k: usize,
}

impl SequentialResolver {
    /// Resolver configured from `config`.
    #[must_use]
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            top_k: config.ann.top_k.max(1),
        }
    }

    /// Thresholds used by the stages.
    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Resolves one mention.
    ///
    /// # Errors
    ///
    /// Returns embedding or index errors raised by the embedding stage.
    pub fn resolve(&self, mention: Mention, ctx: &ResolveContext<'_>) -> ResolveResult<MatchResult> {
        let lexical = Self::exact_stage(&mention, ctx)
            .or_else(|| self.acronym_stage(&mention, ctx))
            .or_else(|| self.fuzzy_stage(&mention, ctx));
        let hit = match lexical {
            Some(hit) => Some(hit),
            None => self.semantic_stage(&mention, ctx)?,
        };

        Ok(match hit {
            Some(hit) => {
                MatchResult::matched(mention, hit.entity_id, hit.confidence, hit.decision, vec![hit.citation])
            }
            None => {
                debug!(mention = mention.text(), "no stage matched");
                MatchResult::no_match(mention)
            }
        })
    }

    fn exact_stage(mention: &Mention, ctx: &ResolveContext<'_>) -> Option<StageHit> {
        let owners = ctx.index.exact().lookup(mention.normalized_text());
        if owners.len() > 1 {
            debug!(
                mention = mention.text(),
                owners = owners.len(),
                "ambiguous exact key, taking first owner"
            );
        }
        let (id, citation) = ctx.index.exact().match_normalized(mention.normalized_text())?;
        debug!(mention = mention.text(), entity = %id, "exact stage matched");
        Some(staged(id, 1.0, Decision::AutoMerge, citation))
    }

    fn acronym_stage(&self, mention: &Mention, ctx: &ResolveContext<'_>) -> Option<StageHit> {
        ctx.index.entities().iter().find_map(|entity| {
            let signal = acronym_score(mention.text(), &entity.canonical_name, 0.0);
            if signal.score < self.thresholds.high_acronym {
                return None;
            }
            let citation = signal.citation?;
            debug!(
                mention = mention.text(),
                entity = %entity.id,
                score = signal.score,
                "acronym stage matched"
            );
            Some(staged(entity.id, signal.score, Decision::AutoMerge, citation))
        })
    }

    fn fuzzy_stage(&self, mention: &Mention, ctx: &ResolveContext<'_>) -> Option<StageHit> {
        let mut best: Option<(f32, &Entity)> = None;
        for entity in ctx.index.entities() {
            let score = token_set_ratio(mention.normalized_text(), &entity.normalized_name);
            if best.map_or(true, |(b, _)| score > b) {
                best = Some((score, entity));
            }
        }
        let (score, entity) = best?;
        if score < self.thresholds.high_fuzzy {
            return None;
        }
        debug!(mention = mention.text(), entity = %entity.id, score, "fuzzy stage matched");
        Some(staged(
            entity.id,
            score,
            Decision::AutoMerge,
            Citation::new(BUILTIN_SOURCE, "token_set_ratio", score),
        ))
    }

    fn semantic_stage(
        &self,
        mention: &Mention,
        ctx: &ResolveContext<'_>,
    ) -> ResolveResult<Option<StageHit>> {
        let (Some(semantic), Some(provider)) = (ctx.semantic, ctx.provider) else {
            return Ok(None);
        };
        if semantic.is_empty() {
            return Ok(None);
        }

        let query = provider.encode(mention.text())?;
        let neighbors = semantic.search(&query, self.top_k.min(semantic.len()))?;
        // a stale semantic index can still hold deleted entities
        let Some((top, vector)) = neighbors
            .iter()
            .filter(|n| ctx.index.entity(n.id).is_some())
            .find_map(|n| semantic.vector(n.id).map(|v| (n, v)))
        else {
            return Ok(None);
        };

        let signal = semantic_signal(&query, vector, provider.model_name(), 0.0);
        let decision = if signal.score >= self.thresholds.auto_merge {
            Decision::AutoMerge
        } else if signal.score >= self.thresholds.review_low {
            Decision::Review
        } else {
            debug!(mention = mention.text(), score = signal.score, "embedding stage below review");
            return Ok(None);
        };
        let Some(citation) = signal.citation else {
            return Ok(None);
        };
        debug!(
            mention = mention.text(),
            entity = %top.id,
            score = signal.score,
            %decision,
            "embedding stage matched"
        );
        Ok(Some(staged(top.id, signal.score, decision, citation)))
    }
}

/// The stage that fired and what it found.
struct StageHit {
    entity_id: EntityId,
    confidence: f32,
    decision: Decision,
    citation: Citation,
}

fn staged(entity_id: EntityId, confidence: f32, decision: Decision, citation: Citation) -> StageHit {
    StageHit {
        entity_id,
        confidence,
        decision,
        citation,
    }
}
