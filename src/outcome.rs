//! Resolution outcomes: citations, candidates and match results.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::mention::Mention;
use crate::signals::SignalKind;

/// Provenance record: which component produced how much of a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// System or library that produced the score.
    pub source: String,
    /// Method within the source.
    pub method: String,
    /// Score contributed, in `[0, 1]`.
    pub score: f32,
}

impl Citation {
    /// Citation of `source`/`method` at `score`.
    #[must_use]
    pub fn new(source: impl Into<String>, method: impl Into<String>, score: f32) -> Self {
        Self {
            source: source.into(),
            method: method.into(),
            score,
        }
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}={:.3}", self.source, self.method, self.score)
    }
}

/// One entity considered for a mention during a resolve call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Candidate entity.
    pub entity_id: EntityId,
    /// Raw score per signal.
    pub signals: BTreeMap<SignalKind, f32>,
    /// Aggregated score used for ranking.
    pub final_score: f32,
    /// Citations that contributed to the score.
    pub citations: Vec<Citation>,
}

impl Candidate {
    /// Candidate with no signals yet.
    #[must_use]
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            signals: BTreeMap::new(),
            final_score: 0.0,
            citations: Vec::new(),
        }
    }

    /// Score of one signal, 0.0 if it was not computed.
    #[must_use]
    pub fn signal(&self, kind: SignalKind) -> f32 {
        self.signals.get(&kind).copied().unwrap_or(0.0)
    }

    /// Records the score of one signal.
    pub fn set_signal(&mut self, kind: SignalKind, score: f32) {
        self.signals.insert(kind, score);
    }

    /// Adds a citation.
    pub fn cite(&mut self, citation: Citation) {
        self.citations.push(citation);
    }
}

/// Follow-up required after a resolve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    /// Confident match, nothing to do.
    None,
    /// Low or medium confidence; a person should look.
    HumanReview,
    /// No acceptable match; candidate for creation.
    NewEntity,
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::HumanReview => write!(f, "human_review"),
            Self::NewEntity => write!(f, "new_entity"),
        }
    }
}

/// Which threshold band the decision fell into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// At or above the auto-merge threshold.
    AutoMerge,
    /// Between the review and auto-merge thresholds.
    AutoLink,
    /// Needs a human decision.
    Review,
    /// Nothing acceptable.
    NoMatch,
}

impl Decision {
    /// The next step implied by this decision.
    #[must_use]
    pub const fn next_step(self) -> NextStep {
        match self {
            Self::AutoMerge | Self::AutoLink => NextStep::None,
            Self::Review => NextStep::HumanReview,
            Self::NoMatch => NextStep::NewEntity,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AutoMerge => write!(f, "auto_merge"),
            Self::AutoLink => write!(f, "auto_link"),
            Self::Review => write!(f, "review"),
            Self::NoMatch => write!(f, "no_match"),
        }
    }
}

/// Output of a resolve call.
///
/// The classification is always supplied by the resolver that produced it;
/// the result type carries no thresholds of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The resolved mention.
    pub mention: Mention,
    /// Chosen entity, if any.
    pub matched_entity: Option<EntityId>,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Provenance of the confidence.
    pub citations: Vec<Citation>,
    /// Ranked candidates (Mode B only; empty in Mode A).
    pub candidates: Vec<Candidate>,
    /// Threshold band.
    pub decision: Decision,
    /// Follow-up implied by `decision`.
    pub next_step: NextStep,
}

impl MatchResult {
    /// A match that fell into `decision`'s band.
    #[must_use]
    pub fn matched(
        mention: Mention,
        entity_id: EntityId,
        confidence: f32,
        decision: Decision,
        citations: Vec<Citation>,
    ) -> Self {
        Self {
            mention,
            matched_entity: Some(entity_id),
            confidence,
            citations,
            candidates: Vec::new(),
            decision,
            next_step: decision.next_step(),
        }
    }

    /// No acceptable match.
    #[must_use]
    pub fn no_match(mention: Mention) -> Self {
        Self {
            mention,
            matched_entity: None,
            confidence: 0.0,
            citations: Vec::new(),
            candidates: Vec::new(),
            decision: Decision::NoMatch,
            next_step: NextStep::NewEntity,
        }
    }

    /// Attaches the ranked candidate list.
    #[must_use]
    pub fn with_candidates(mut self, candidates: Vec<Candidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// True if an entity was chosen.
    #[must_use]
    pub fn is_match(&self) -> bool {
        self.matched_entity.is_some()
    }

    /// True if a person should look at this result.
    #[must_use]
    pub fn needs_review(&self) -> bool {
        self.next_step == NextStep::HumanReview
    }

    /// Methods of all citations, in order.
    #[must_use]
    pub fn cited_methods(&self) -> Vec<&str> {
        self.citations.iter().map(|c| c.method.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::Normalizer;

    fn mention(text: &str) -> Mention {
        Mention::new(text, &Normalizer::default()).unwrap()
    }

    #[test]
    fn test_decision_maps_to_next_step() {
        assert_eq!(Decision::AutoMerge.next_step(), NextStep::None);
        assert_eq!(Decision::AutoLink.next_step(), NextStep::None);
        assert_eq!(Decision::Review.next_step(), NextStep::HumanReview);
        assert_eq!(Decision::NoMatch.next_step(), NextStep::NewEntity);
    }

    #[test]
    fn test_no_match_has_no_entity() {
        let r = MatchResult::no_match(mention("xyz"));
        assert!(!r.is_match());
        assert_eq!(r.next_step, NextStep::NewEntity);
        assert!(r.citations.is_empty());
    }

    #[test]
    fn test_matched_review() {
        let id = EntityId::new();
        let r = MatchResult::matched(
            mention("apple"),
            id,
            0.6,
            Decision::Review,
            vec![Citation::new("lexical", "embedding_cosine", 0.6)],
        );
        assert!(r.needs_review());
        assert_eq!(r.matched_entity, Some(id));
        assert_eq!(r.cited_methods(), vec!["embedding_cosine"]);
    }

    #[test]
    fn test_candidate_signals_default_zero() {
        let mut c = Candidate::new(EntityId::new());
        assert!(c.signal(SignalKind::Exact).abs() < f32::EPSILON);
        c.set_signal(SignalKind::Acronym, 0.95);
        assert!((c.signal(SignalKind::Acronym) - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn test_serialized_next_step() {
        assert_eq!(serde_json::to_string(&NextStep::HumanReview).unwrap(), "\"human_review\"");
        assert_eq!(NextStep::NewEntity.to_string(), "new_entity");
        assert_eq!(Citation::new("builtin", "exact_match", 1.0).to_string(), "builtin:exact_match=1.000");
    }
}
