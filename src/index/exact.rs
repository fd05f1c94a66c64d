//! Normalized name/alias lookup.

use std::collections::HashMap;

use crate::entity::{Entity, EntityId};
use crate::normalize::Normalizer;
use crate::outcome::Citation;

/// Source reported by citations of in-crate matchers.
pub const BUILTIN_SOURCE: &str = "builtin";

/// Maps normalized canonical names and aliases to entity ids.
///
/// A key may belong to several entities (ambiguous aliases); owners are kept
/// in insertion order and never overwritten.
#[derive(Debug, Clone, Default)]
pub struct ExactIndex {
    keys: HashMap<String, Vec<EntityId>>,
}

impl ExactIndex {
    /// Empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes the normalized name and every alias of each entity.
    #[must_use]
    pub fn build(entities: &[Entity], normalizer: &Normalizer) -> Self {
        let mut index = Self::new();
        for entity in entities {
            index.add_entity(entity, normalizer);
        }
        index
    }

    /// Indexes the normalized name and aliases of one entity.
    pub fn add_entity(&mut self, entity: &Entity, normalizer: &Normalizer) {
        self.insert(&entity.normalized_name, entity.id);
        for alias in &entity.aliases {
            self.insert(&normalizer.normalize(alias), entity.id);
        }
    }

    /// Adds an owner for an already-normalized key; blank keys are ignored.
    pub fn insert(&mut self, key: &str, id: EntityId) {
        if key.is_empty() {
            return;
        }
        let owners = self.keys.entry(key.to_string()).or_default();
        if !owners.contains(&id) {
            owners.push(id);
        }
    }

    /// All owners of a normalized key.
    #[must_use]
    pub fn lookup(&self, normalized: &str) -> &[EntityId] {
        self.keys.get(normalized).map_or(&[], Vec::as_slice)
    }

    /// Normalizes `text` and returns the first owner with a full-score
    /// citation.
    #[must_use]
    pub fn match_text(&self, text: &str, normalizer: &Normalizer) -> Option<(EntityId, Citation)> {
        self.match_normalized(&normalizer.normalize(text))
    }

    /// Like [`match_text`](Self::match_text) for an already-normalized key.
    #[must_use]
    pub fn match_normalized(&self, normalized: &str) -> Option<(EntityId, Citation)> {
        self.lookup(normalized)
            .first()
            .map(|&id| (id, Citation::new(BUILTIN_SOURCE, "exact_match", 1.0)))
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if no key is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
