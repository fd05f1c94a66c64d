//! Canonical entities and their aliases.
//!
//! An entity is the record every mention is resolved against. Its normalized
//! name is derived from the canonical name at construction and kept in sync
//! by [`Entity::rename`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::normalize::Normalizer;

/// Open key/value metadata attached to entities and mentions.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Globally unique, stable entity identifier.
///
/// # Examples
///
/// ```
/// use entity_resolver::EntityId;
///
/// let id = EntityId::new();
/// assert!(!id.is_nil());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Returns true if this is a nil (all zeros) UUID.
    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Creates a nil entity ID (for testing or sentinel values).
    #[must_use]
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<EntityId> for Uuid {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Unique identifier of an alias record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasId(Uuid);

impl AliasId {
    /// Creates a new random alias ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AliasId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AliasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where an alias came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasSource {
    /// Supplied by a person when the entity was created or edited.
    Manual,
    /// Learned from an accepted match.
    Matched,
    /// Loaded from an external knowledge base.
    Imported,
}

impl fmt::Display for AliasSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Matched => write!(f, "matched"),
            Self::Imported => write!(f, "imported"),
        }
    }
}

/// An alternative surface form owned by exactly one entity.
///
/// # Examples
///
/// ```
/// use entity_resolver::{Alias, AliasSource, EntityId, Normalizer};
///
/// let normalizer = Normalizer::default();
/// let alias = Alias::new(EntityId::new(), "AAPL", AliasSource::Manual, 1.0, &normalizer).unwrap();
/// assert_eq!(alias.normalized_alias, "aapl");
///
/// assert!(Alias::new(EntityId::new(), "AAPL", AliasSource::Manual, 1.5, &normalizer).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    /// Alias identifier.
    pub id: AliasId,
    /// Entity the alias points to.
    pub entity_id: EntityId,
    /// Alias as supplied.
    pub alias_text: String,
    /// Normalized form used for exact lookups.
    pub normalized_alias: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    /// Where the alias came from.
    pub source: AliasSource,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl Alias {
    /// Creates a validated alias.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the entity id is nil, the text is blank,
    /// or the confidence is outside `[0, 1]`.
    pub fn new(
        entity_id: EntityId,
        alias_text: impl Into<String>,
        source: AliasSource,
        confidence: f32,
        normalizer: &Normalizer,
    ) -> Result<Self, ValidationError> {
        let alias_text = alias_text.into();
        if entity_id.is_nil() {
            return Err(ValidationError::MissingField {
                field: "entity_id".to_string(),
            });
        }
        if alias_text.trim().is_empty() {
            return Err(ValidationError::EmptyAlias);
        }
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(ValidationError::ConfidenceOutOfRange { value: confidence });
        }

        Ok(Self {
            id: AliasId::new(),
            entity_id,
            normalized_alias: normalizer.normalize(&alias_text),
            alias_text,
            confidence,
            source,
            created_at: Utc::now(),
        })
    }
}

/// A canonical record in the knowledge base.
///
/// # Examples
///
/// ```
/// use entity_resolver::{Entity, Normalizer};
///
/// let normalizer = Normalizer::default();
/// let entity = Entity::new("Apple Inc.", &normalizer)
///     .unwrap()
///     .with_aliases(["Apple", "AAPL"]);
/// assert_eq!(entity.normalized_name, "apple");
/// assert_eq!(entity.aliases.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Immutable identifier assigned at creation.
    pub id: EntityId,

    /// Display name.
    pub canonical_name: String,

    /// Equals `normalize(canonical_name)` unless explicitly overridden.
    pub normalized_name: String,

    /// Alternative names, as supplied.
    #[serde(default)]
    pub aliases: Vec<String>,

    /// Free-form attributes (`domain`, `email`, ...).
    #[serde(default)]
    pub metadata: Metadata,

    /// Creation time.
    pub created_at: DateTime<Utc>,

    /// Feeds the recency boost; `None` if never seen.
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

impl Entity {
    /// Creates an entity with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyEntityName` for a blank name.
    pub fn new(canonical_name: impl Into<String>, normalizer: &Normalizer) -> Result<Self, ValidationError> {
        let canonical_name = canonical_name.into();
        if canonical_name.trim().is_empty() {
            return Err(ValidationError::EmptyEntityName);
        }
        Ok(Self {
            id: EntityId::new(),
            normalized_name: normalizer.normalize(&canonical_name),
            canonical_name,
            aliases: Vec::new(),
            metadata: Metadata::new(),
            created_at: Utc::now(),
            last_seen: None,
        })
    }

    /// Adds alias strings, skipping blanks and duplicates.
    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for alias in aliases {
            self.push_alias(alias.into());
        }
        self
    }

    /// Replaces the metadata map.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets one metadata key.
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Overrides the derived normalized name.
    #[must_use]
    pub fn with_normalized_name(mut self, normalized: impl Into<String>) -> Self {
        self.normalized_name = normalized.into();
        self
    }

    /// Changes the canonical name and re-derives the normalized name.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyEntityName` for a blank name.
    pub fn rename(&mut self, canonical_name: impl Into<String>, normalizer: &Normalizer) -> Result<(), ValidationError> {
        let canonical_name = canonical_name.into();
        if canonical_name.trim().is_empty() {
            return Err(ValidationError::EmptyEntityName);
        }
        self.normalized_name = normalizer.normalize(&canonical_name);
        self.canonical_name = canonical_name;
        Ok(())
    }

    /// Adds an alias string. Returns false if blank or already present.
    pub fn push_alias(&mut self, alias: String) -> bool {
        if alias.trim().is_empty() || self.aliases.contains(&alias) {
            return false;
        }
        self.aliases.push(alias);
        true
    }

    /// Returns the metadata value for `key` as a string, if it is one.
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }

    /// Checks the structural invariants of a stored entity.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_nil() {
            return Err(ValidationError::MissingField {
                field: "id".to_string(),
            });
        }
        if self.canonical_name.trim().is_empty() {
            return Err(ValidationError::EmptyEntityName);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_unique() {
        assert_ne!(EntityId::new(), EntityId::new());
        assert!(EntityId::nil().is_nil());
    }

    #[test]
    fn test_entity_normalized_name_derived() {
        let n = Normalizer::default();
        let e = Entity::new("Microsoft Corporation", &n).unwrap();
        assert_eq!(e.normalized_name, "microsoft");
        assert!(e.last_seen.is_none());
    }

    #[test]
    fn test_entity_empty_name_rejected() {
        let n = Normalizer::default();
        assert_eq!(Entity::new("   ", &n).unwrap_err(), ValidationError::EmptyEntityName);
    }

    #[test]
    fn test_rename_keeps_normalized_in_sync() {
        let n = Normalizer::default();
        let mut e = Entity::new("Acme Ltd", &n).unwrap();
        e.rename("Globex Corp", &n).unwrap();
        assert_eq!(e.normalized_name, "globex");
        assert!(e.rename("", &n).is_err());
        assert_eq!(e.canonical_name, "Globex Corp");
    }

    #[test]
    fn test_aliases_deduplicated() {
        let n = Normalizer::default();
        let e = Entity::new("Apple Inc.", &n)
            .unwrap()
            .with_aliases(["Apple", "Apple", " ", "AAPL"]);
        assert_eq!(e.aliases, vec!["Apple".to_string(), "AAPL".to_string()]);
    }

    #[test]
    fn test_meta_str() {
        let n = Normalizer::default();
        let e = Entity::new("Apple Inc.", &n)
            .unwrap()
            .with_meta("domain", "apple.com")
            .with_meta("employees", 160_000);
        assert_eq!(e.meta_str("domain"), Some("apple.com"));
        assert_eq!(e.meta_str("employees"), None);
    }

    #[test]
    fn test_alias_validation() {
        let n = Normalizer::default();
        let id = EntityId::new();
        assert_eq!(
            Alias::new(id, "", AliasSource::Manual, 1.0, &n).unwrap_err(),
            ValidationError::EmptyAlias
        );
        assert!(matches!(
            Alias::new(EntityId::nil(), "x", AliasSource::Manual, 1.0, &n).unwrap_err(),
            ValidationError::MissingField { .. }
        ));
        assert!(matches!(
            Alias::new(id, "x", AliasSource::Imported, -0.1, &n).unwrap_err(),
            ValidationError::ConfidenceOutOfRange { .. }
        ));
        assert!(Alias::new(id, "x", AliasSource::Matched, f32::NAN, &n).is_err());
        let ok = Alias::new(id, "Big Blue", AliasSource::Imported, 0.7, &n).unwrap();
        assert_eq!(ok.normalized_alias, "big blue");
        assert_eq!(ok.source.to_string(), "imported");
    }

    #[test]
    fn test_entity_serde_roundtrip() {
        let n = Normalizer::default();
        let e = Entity::new("Apple Inc.", &n).unwrap().with_aliases(["AAPL"]);
        let json = serde_json::to_string(&e).unwrap();
        let back: Entity = serde_json::from_str(&json).unwrap();
        assert_eq!(e, back);
    }
}
