//! Error types for the resolver.
//!
//! All errors are strongly typed using thiserror so callers can match on the
//! specific condition. "No match found" is never an error: it is the normal
//! `new_entity` outcome of a resolve call.

use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::entity::EntityId;
use crate::index::ann::AnnError;
use crate::review::{ReviewItemId, ReviewStatus};
use crate::storage::StorageError;

/// Validation errors raised at construction time (fail fast).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Mention text was blank.
    #[error("Mention text cannot be empty")]
    EmptyMention,

    /// Entity name was blank.
    #[error("Entity name cannot be empty")]
    EmptyEntityName,

    /// Alias text was blank.
    #[error("Alias text cannot be empty")]
    EmptyAlias,

    /// A required field was absent.
    #[error("Required field '{field}' is missing")]
    MissingField {
        /// Offending field.
        field: String,
    },

    /// Confidence outside `[0, 1]`.
    #[error("Confidence value {value} is out of range [0.0, 1.0]")]
    ConfidenceOutOfRange {
        /// Value supplied.
        value: f32,
    },

    /// A numeric field outside its range.
    #[error("Value for '{field}' must be finite and within [{min}, {max}], got {value}")]
    OutOfRange {
        /// Offending field.
        field: String,
        /// Value supplied.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// An embedding vector was unusable.
    #[error("Vector at position {position} is empty or contains non-finite values")]
    InvalidVector {
        /// Index of the offending vector.
        position: usize,
    },
}

/// Configuration errors: the resolver was asked for something it cannot be.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Mode name not recognized.
    #[error("Unknown resolution mode '{value}' (expected 'sequential'/'A' or 'aggregate'/'B')")]
    UnknownMode {
        /// Name supplied.
        value: String,
    },

    /// ANN backend name not recognized.
    #[error("Unknown ANN backend '{value}' (expected 'flat', 'hnsw' or 'ivf')")]
    UnknownAnnBackend {
        /// Name supplied.
        value: String,
    },

    /// Metric name not recognized.
    #[error("Unknown similarity metric '{value}' (expected 'cosine' or 'l2')")]
    UnknownMetric {
        /// Name supplied.
        value: String,
    },

    /// Two thresholds are out of order.
    #[error("Threshold '{higher}' ({higher_value}) must be >= '{lower}' ({lower_value})")]
    ThresholdOrder {
        /// Threshold expected to be larger.
        higher: String,
        /// Its value.
        higher_value: f32,
        /// Threshold expected to be smaller.
        lower: String,
        /// Its value.
        lower_value: f32,
    },

    /// A size parameter was zero.
    #[error("'{field}' must be greater than zero")]
    ZeroSize {
        /// Offending field.
        field: String,
    },

    /// Provider and index disagree on dimensionality.
    #[error("Embedding has {actual} dimensions, index expects {expected}")]
    EmbeddingDimension {
        /// Index dimensionality.
        expected: usize,
        /// Provider dimensionality.
        actual: usize,
    },

    /// The configuration text could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    Parse {
        /// Details.
        message: String,
    },

    /// A configuration value failed validation.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

/// Top-level error type for resolver operations.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Invalid input.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A required collaborator is missing.
    #[error("Dependency unavailable: {dependency} ({reason})")]
    DependencyUnavailable {
        /// Missing collaborator.
        dependency: String,
        /// Why it is unavailable.
        reason: String,
    },

    /// No entity with this id.
    #[error("Entity not found: {id}")]
    EntityNotFound {
        /// Missing entity.
        id: EntityId,
    },

    /// No review item with this id.
    #[error("Review item not found: {id}")]
    ReviewItemNotFound {
        /// Missing review item.
        id: ReviewItemId,
    },

    /// The review item already has a verdict.
    #[error("Review item {id} was already {status}")]
    ReviewAlreadyDecided {
        /// Decided review item.
        id: ReviewItemId,
        /// Verdict already recorded.
        status: ReviewStatus,
    },

    /// The entity store failed.
    #[error("Storage error: {0}")]
    Storage(StorageError),

    /// The embedding provider failed.
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// An ANN backend failed.
    #[error("Index error: {0}")]
    Index(AnnError),

    /// Broken internal invariant.
    #[error("Internal error: {message}")]
    Internal {
        /// Details.
        message: String,
    },
}

impl From<StorageError> for ResolveError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::EntityNotFound(id) => Self::EntityNotFound { id },
            StorageError::ReviewItemNotFound(id) => Self::ReviewItemNotFound { id },
            other => Self::Storage(other),
        }
    }
}

impl From<AnnError> for ResolveError {
    fn from(err: AnnError) -> Self {
        match err {
            AnnError::DimensionMismatch { expected, actual } => {
                Self::Configuration(ConfigurationError::EmbeddingDimension { expected, actual })
            }
            other => Self::Index(other),
        }
    }
}

impl ResolveError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a dependency-unavailable error.
    #[must_use]
    pub fn dependency_unavailable(dependency: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DependencyUnavailable {
            dependency: dependency.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Returns true if a required collaborator is missing.
    #[must_use]
    pub const fn is_dependency_unavailable(&self) -> bool {
        matches!(self, Self::DependencyUnavailable { .. })
    }

    /// Returns true if an entity or review item was not found.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::EntityNotFound { .. } | Self::ReviewItemNotFound { .. }
        )
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }
}

/// Result type alias for resolver operations.
pub type ResolveResult<T> = Result<T, ResolveError>;
