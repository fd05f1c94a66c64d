//! Abstract entity store contract.
//!
//! The resolver persists canonical entities, their alias records and the
//! human-review queue through this trait. Any persistence format is the
//! deployment's concern; the crate ships an in-memory reference backend.

use thiserror::Error;

use crate::entity::{Alias, AliasId, Entity, EntityId};
use crate::review::{ReviewItem, ReviewItemId, ReviewStatus};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Entity not found.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Review item not found.
    #[error("Review item not found: {0}")]
    ReviewItemNotFound(ReviewItemId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Record failed structural validation.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Storage contract for entities, aliases and review items.
///
/// # Safety Considerations
/// - Implementations must be safe to share across resolver threads
/// - `get_all_entities` returns entities in insertion order; sequential
///   resolution scans depend on it
/// - Deleting an entity deletes the alias records it owns
pub trait EntityStore: Send + Sync {
    /// Get an entity by ID.
    fn get_entity(&self, id: EntityId) -> Result<Option<Entity>, StorageError>;

    /// All entities, in insertion order.
    fn get_all_entities(&self) -> Result<Vec<Entity>, StorageError>;

    /// Insert a new entity and a manual alias record per alias string.
    /// Returns error if the ID already exists.
    fn create_entity(&self, entity: Entity) -> Result<EntityId, StorageError>;

    /// Replace an existing entity, syncing its alias records with
    /// `entity.aliases`. Returns error if not found.
    fn update_entity(&self, entity: Entity) -> Result<(), StorageError>;

    /// Delete an entity and its aliases. Returns error if not found.
    fn delete_entity(&self, id: EntityId) -> Result<(), StorageError>;

    /// First-inserted entity owning an alias whose normalized text equals
    /// the normalized `text`.
    fn get_entity_by_alias(&self, text: &str) -> Result<Option<Entity>, StorageError>;

    /// Alias records owned by an entity, oldest first.
    fn get_aliases(&self, entity_id: EntityId) -> Result<Vec<Alias>, StorageError>;

    /// Attach an alias record to its entity. The alias text is also added to
    /// the entity's alias list.
    fn add_alias(&self, alias: Alias) -> Result<AliasId, StorageError>;

    /// Persist a new review item.
    fn save_review_item(&self, item: ReviewItem) -> Result<ReviewItemId, StorageError>;

    /// Replace an existing review item. Returns error if not found.
    fn update_review_item(&self, item: ReviewItem) -> Result<(), StorageError>;

    /// Get a review item by ID.
    fn get_review_item(&self, id: ReviewItemId) -> Result<Option<ReviewItem>, StorageError>;

    /// Review items with the given status, oldest first.
    fn get_review_queue(&self, status: ReviewStatus) -> Result<Vec<ReviewItem>, StorageError>;

    /// Number of stored entities.
    fn entity_count(&self) -> Result<usize, StorageError> {
        Ok(self.get_all_entities()?.len())
    }
}
