//! Human-review queue items.
//!
//! The only resolver artifact with a lifecycle beyond one call: items are
//! persisted by the entity store and move from pending to approved or
//! rejected exactly once.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::EntityId;
use crate::error::{ResolveError, ResolveResult};
use crate::mention::Mention;
use crate::outcome::{Candidate, MatchResult};

/// Unique identifier of a review item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReviewItemId(Uuid);

impl ReviewItemId {
    /// Fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReviewItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReviewItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a review item is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// Awaiting a verdict.
    Pending,
    /// A reviewer picked an entity.
    Approved,
    /// A reviewer rejected every candidate.
    Rejected,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

/// A reviewer's verdict on a pending item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "verdict", content = "entity_id")]
pub enum ReviewDecision {
    /// The mention refers to this entity.
    Approve(EntityId),
    /// None of the candidates is right.
    Reject,
}

/// A mention awaiting a human decision, with its top candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Item identifier.
    pub id: ReviewItemId,
    /// Mention under review.
    pub mention: Mention,
    /// Top candidates at enqueue time.
    pub candidates: Vec<Candidate>,
    /// Lifecycle state.
    pub status: ReviewStatus,
    /// Who decided, if anyone.
    pub reviewer: Option<String>,
    /// Entity chosen on approval.
    pub final_entity: Option<EntityId>,
    /// Enqueue time.
    pub created_at: DateTime<Utc>,
    /// Decision time.
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl ReviewItem {
    /// Creates a pending item.
    #[must_use]
    pub fn new(mention: Mention, candidates: Vec<Candidate>) -> Self {
        Self {
            id: ReviewItemId::new(),
            mention,
            candidates,
            status: ReviewStatus::Pending,
            reviewer: None,
            final_entity: None,
            created_at: Utc::now(),
            reviewed_at: None,
        }
    }

    /// Builds a pending item from a result, keeping at most `max_candidates`.
    ///
    /// Sequential results carry no candidate list; the matched entity is
    /// turned into a single candidate scored at the result confidence.
    #[must_use]
    pub fn from_result(result: &MatchResult, max_candidates: usize) -> Self {
        let candidates = if result.candidates.is_empty() {
            result
                .matched_entity
                .map(|id| {
                    let mut c = Candidate::new(id);
                    c.final_score = result.confidence;
                    c.citations.clone_from(&result.citations);
                    vec![c]
                })
                .unwrap_or_default()
        } else {
            result.candidates.iter().take(max_candidates).cloned().collect()
        };
        Self::new(result.mention.clone(), candidates)
    }

    /// True until a verdict is recorded.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == ReviewStatus::Pending
    }

    /// Records a verdict on a pending item.
    ///
    /// # Errors
    ///
    /// Returns `ReviewAlreadyDecided` if the item already has a verdict; the
    /// item is left untouched.
    pub fn apply(
        &mut self,
        decision: ReviewDecision,
        reviewer: Option<String>,
        at: DateTime<Utc>,
    ) -> ResolveResult<()> {
        if !self.is_pending() {
            return Err(ResolveError::ReviewAlreadyDecided {
                id: self.id,
                status: self.status,
            });
        }
        match decision {
            ReviewDecision::Approve(entity_id) => {
                self.status = ReviewStatus::Approved;
                self.final_entity = Some(entity_id);
            }
            ReviewDecision::Reject => {
                self.status = ReviewStatus::Rejected;
                self.final_entity = None;
            }
        }
        self.reviewer = reviewer;
        self.reviewed_at = Some(at);
        Ok(())
    }
}
