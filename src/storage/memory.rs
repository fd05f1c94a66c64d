//! In-memory storage backend.
//!
//! Thread-safe reference implementation of [`EntityStore`], intended for
//! embedded usage and tests.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::entity::{Alias, AliasId, AliasSource, Entity, EntityId};
use crate::normalize::Normalizer;
use crate::review::{ReviewItem, ReviewItemId, ReviewStatus};
use crate::storage::traits::{EntityStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

#[derive(Debug, Default)]
struct StoreState {
    entities: HashMap<EntityId, Entity>,
    /// Insertion order of live entities.
    order: Vec<EntityId>,
    aliases: HashMap<EntityId, Vec<Alias>>,
    /// Normalized alias text -> owners in insertion order.
    by_alias: HashMap<String, Vec<EntityId>>,
    reviews: HashMap<ReviewItemId, ReviewItem>,
    review_order: Vec<ReviewItemId>,
}

impl StoreState {
    fn index_alias(&mut self, alias: &Alias) {
        let owners = self.by_alias.entry(alias.normalized_alias.clone()).or_default();
        if !owners.contains(&alias.entity_id) {
            owners.push(alias.entity_id);
        }
    }

    fn unindex_aliases(&mut self, id: EntityId) {
        let Some(records) = self.aliases.get(&id) else {
            return;
        };
        for alias in records {
            if let Some(owners) = self.by_alias.get_mut(&alias.normalized_alias) {
                owners.retain(|owner| *owner != id);
                if owners.is_empty() {
                    self.by_alias.remove(&alias.normalized_alias);
                }
            }
        }
    }

    fn reindex_aliases(&mut self, id: EntityId) {
        let records = self.aliases.get(&id).cloned().unwrap_or_default();
        for alias in &records {
            self.index_alias(alias);
        }
    }
}

/// In-memory entity, alias and review-queue store.
///
/// Alias strings carried on entities are turned into manual alias records
/// using the store's normalizer, which should match the resolver's.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    state: RwLock<StoreState>,
    normalizer: Normalizer,
}

impl InMemoryEntityStore {
    /// Create a new empty store with default normalization.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty store normalizing aliases with `normalizer`.
    #[must_use]
    pub fn with_normalizer(normalizer: Normalizer) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            normalizer,
        }
    }

    fn manual_alias(&self, entity_id: EntityId, text: &str) -> Option<Alias> {
        Alias::new(entity_id, text, AliasSource::Manual, 1.0, &self.normalizer).ok()
    }
}

impl EntityStore for InMemoryEntityStore {
    fn get_entity(&self, id: EntityId) -> Result<Option<Entity>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.get"))?;
        Ok(state.entities.get(&id).cloned())
    }

    fn get_all_entities(&self) -> Result<Vec<Entity>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.get_all"))?;
        Ok(state
            .order
            .iter()
            .filter_map(|id| state.entities.get(id).cloned())
            .collect())
    }

    fn create_entity(&self, entity: Entity) -> Result<EntityId, StorageError> {
        entity
            .validate()
            .map_err(|e| StorageError::InvalidRecord(e.to_string()))?;

        let mut state = self.state.write().map_err(|_| lock_err("entity.create"))?;
        if state.entities.contains_key(&entity.id) {
            return Err(StorageError::DuplicateKey(entity.id.to_string()));
        }

        let id = entity.id;
        let records: Vec<Alias> = entity
            .aliases
            .iter()
            .filter_map(|text| self.manual_alias(id, text))
            .collect();
        state.aliases.insert(id, records);
        state.reindex_aliases(id);
        state.order.push(id);
        state.entities.insert(id, entity);
        Ok(id)
    }

    fn update_entity(&self, entity: Entity) -> Result<(), StorageError> {
        entity
            .validate()
            .map_err(|e| StorageError::InvalidRecord(e.to_string()))?;

        let mut state = self.state.write().map_err(|_| lock_err("entity.update"))?;
        if !state.entities.contains_key(&entity.id) {
            return Err(StorageError::EntityNotFound(entity.id));
        }

        let id = entity.id;
        state.unindex_aliases(id);

        let mut records = state.aliases.remove(&id).unwrap_or_default();
        records.retain(|alias| entity.aliases.contains(&alias.alias_text));
        for text in &entity.aliases {
            if !records.iter().any(|alias| &alias.alias_text == text) {
                if let Some(alias) = self.manual_alias(id, text) {
                    records.push(alias);
                }
            }
        }
        state.aliases.insert(id, records);
        state.reindex_aliases(id);
        state.entities.insert(id, entity);
        Ok(())
    }

    fn delete_entity(&self, id: EntityId) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("entity.delete"))?;
        if !state.entities.contains_key(&id) {
            return Err(StorageError::EntityNotFound(id));
        }
        state.unindex_aliases(id);
        state.aliases.remove(&id);
        state.entities.remove(&id);
        state.order.retain(|x| *x != id);
        Ok(())
    }

    fn get_entity_by_alias(&self, text: &str) -> Result<Option<Entity>, StorageError> {
        let key = self.normalizer.normalize(text);
        let state = self.state.read().map_err(|_| lock_err("entity.by_alias"))?;
        Ok(state
            .by_alias
            .get(&key)
            .and_then(|owners| owners.first())
            .and_then(|id| state.entities.get(id).cloned()))
    }

    fn get_aliases(&self, entity_id: EntityId) -> Result<Vec<Alias>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("alias.get"))?;
        if !state.entities.contains_key(&entity_id) {
            return Err(StorageError::EntityNotFound(entity_id));
        }
        Ok(state.aliases.get(&entity_id).cloned().unwrap_or_default())
    }

    fn add_alias(&self, alias: Alias) -> Result<AliasId, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("alias.add"))?;
        let entity_id = alias.entity_id;
        if !state.entities.contains_key(&entity_id) {
            return Err(StorageError::EntityNotFound(entity_id));
        }

        let records = state.aliases.entry(entity_id).or_default();
        if records
            .iter()
            .any(|a| a.normalized_alias == alias.normalized_alias)
        {
            return Err(StorageError::DuplicateKey(alias.alias_text));
        }
        records.push(alias.clone());

        if let Some(entity) = state.entities.get_mut(&entity_id) {
            entity.push_alias(alias.alias_text.clone());
        }
        state.index_alias(&alias);
        Ok(alias.id)
    }

    fn save_review_item(&self, item: ReviewItem) -> Result<ReviewItemId, StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("review.save"))?;
        if state.reviews.contains_key(&item.id) {
            return Err(StorageError::DuplicateKey(item.id.to_string()));
        }
        let id = item.id;
        state.review_order.push(id);
        state.reviews.insert(id, item);
        Ok(id)
    }

    fn update_review_item(&self, item: ReviewItem) -> Result<(), StorageError> {
        let mut state = self.state.write().map_err(|_| lock_err("review.update"))?;
        match state.reviews.get_mut(&item.id) {
            Some(slot) => {
                *slot = item;
                Ok(())
            }
            None => Err(StorageError::ReviewItemNotFound(item.id)),
        }
    }

    fn get_review_item(&self, id: ReviewItemId) -> Result<Option<ReviewItem>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("review.get"))?;
        Ok(state.reviews.get(&id).cloned())
    }

    fn get_review_queue(&self, status: ReviewStatus) -> Result<Vec<ReviewItem>, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("review.queue"))?;
        Ok(state
            .review_order
            .iter()
            .filter_map(|id| state.reviews.get(id))
            .filter(|item| item.status == status)
            .cloned()
            .collect())
    }

    fn entity_count(&self) -> Result<usize, StorageError> {
        let state = self.state.read().map_err(|_| lock_err("entity.count"))?;
        Ok(state.order.len())
    }
}
