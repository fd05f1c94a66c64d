//! Candidate generation: exact lookup, blocking and vector search.
//!
//! [`CandidateIndex`] is a snapshot of the store derived in one pass; it is
//! rebuilt wholesale whenever entities change.

pub mod ann;
pub mod blocking;
pub mod exact;
pub mod semantic;

use std::collections::HashMap;

use crate::config::BlockingConfig;
use crate::entity::{Entity, EntityId};
use crate::normalize::Normalizer;

pub use blocking::{Blocker, CombinedBlocker, PrefixBlocker, TokenBlocker};
pub use exact::ExactIndex;
pub use semantic::SemanticIndex;

/// Lexical indices over a snapshot of the store, in store order.
#[derive(Debug, Clone)]
pub struct CandidateIndex {
    entities: Vec<Entity>,
    positions: HashMap<EntityId, usize>,
    exact: ExactIndex,
    blocker: CombinedBlocker,
}

impl CandidateIndex {
    /// Derives every lexical index from `entities`.
    #[must_use]
    pub fn build(entities: Vec<Entity>, normalizer: &Normalizer, blocking: &BlockingConfig) -> Self {
        let exact = ExactIndex::build(&entities, normalizer);
        let blocker = CombinedBlocker::build(&entities, normalizer, blocking);
        let positions = entities.iter().enumerate().map(|(i, e)| (e.id, i)).collect();
        Self {
            entities,
            positions,
            exact,
            blocker,
        }
    }

    /// Index over no entities.
    #[must_use]
    pub fn empty(blocking: &BlockingConfig) -> Self {
        Self {
            entities: Vec::new(),
            positions: HashMap::new(),
            exact: ExactIndex::new(),
            blocker: CombinedBlocker::new(blocking),
        }
    }

    /// Entities in store order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Entity by id.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.positions.get(&id).map(|&i| &self.entities[i])
    }

    /// Exact-match index.
    #[must_use]
    pub fn exact(&self) -> &ExactIndex {
        &self.exact
    }

    /// Candidate blocker.
    #[must_use]
    pub fn blocker(&self) -> &CombinedBlocker {
        &self.blocker
    }

    /// Number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if there are no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
