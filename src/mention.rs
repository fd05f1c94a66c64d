//! Incoming mentions.

use serde::{Deserialize, Serialize};

use crate::entity::Metadata;
use crate::error::ValidationError;
use crate::normalize::{default_normalizer, Normalizer};

/// A piece of text to be matched to a known entity.
///
/// `normalized_text` is computed once at construction; fields are read-only
/// so it cannot drift from `text`. Deserialization ignores any serialized
/// `normalized_text` and recomputes it with the default normalizer.
///
/// # Examples
///
/// ```
/// use entity_resolver::{Mention, Normalizer};
///
/// let mention = Mention::new("Apple, Inc.", &Normalizer::default()).unwrap();
/// assert_eq!(mention.normalized_text(), "apple");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MentionRecord")]
pub struct Mention {
    text: String,
    context: Option<String>,
    metadata: Metadata,
    normalized_text: String,
}

impl Mention {
    /// Creates a mention without context or metadata.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyMention` for blank text.
    pub fn new(text: impl Into<String>, normalizer: &Normalizer) -> Result<Self, ValidationError> {
        Self::with_details(text, None, Metadata::new(), normalizer)
    }

    /// Creates a mention with optional context and metadata.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyMention` for blank text.
    pub fn with_details(
        text: impl Into<String>,
        context: Option<String>,
        metadata: Metadata,
        normalizer: &Normalizer,
    ) -> Result<Self, ValidationError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyMention);
        }
        Ok(Self {
            normalized_text: normalizer.normalize(&text),
            text,
            context,
            metadata,
        })
    }

    /// Raw text as received.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Free-text context, if any.
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    /// Caller-supplied metadata (`domain`, `email`, ...).
    #[must_use]
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Normalized form of [`text`](Self::text), fixed at construction.
    #[must_use]
    pub fn normalized_text(&self) -> &str {
        &self.normalized_text
    }

    /// Returns the metadata value for `key` as a string, if it is one.
    #[must_use]
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Serialized form of a mention; the normalized text is always derived.
#[derive(Deserialize)]
struct MentionRecord {
    text: String,
    #[serde(default)]
    context: Option<String>,
    #[serde(default)]
    metadata: Metadata,
}

impl TryFrom<MentionRecord> for Mention {
    type Error = ValidationError;

    fn try_from(record: MentionRecord) -> Result<Self, Self::Error> {
        Self::with_details(record.text, record.context, record.metadata, default_normalizer())
    }
}

/// What a caller may hand to `resolve`: raw text or a prepared mention.
#[derive(Debug, Clone)]
pub enum MentionInput {
    /// Raw text, normalized by the engine.
    Text(String),
    /// Raw text with metadata, normalized by the engine.
    TextWithMetadata(String, Metadata),
    /// A mention built by the caller.
    Mention(Mention),
}

impl MentionInput {
    /// Turns the input into a mention using `normalizer` for raw text.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyMention` for blank text.
    pub fn into_mention(self, normalizer: &Normalizer) -> Result<Mention, ValidationError> {
        match self {
            Self::Text(text) => Mention::new(text, normalizer),
            Self::TextWithMetadata(text, metadata) => {
                Mention::with_details(text, None, metadata, normalizer)
            }
            Self::Mention(mention) => Ok(mention),
        }
    }
}

impl From<&str> for MentionInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for MentionInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&String> for MentionInput {
    fn from(text: &String) -> Self {
        Self::Text(text.clone())
    }
}

impl From<Mention> for MentionInput {
    fn from(mention: Mention) -> Self {
        Self::Mention(mention)
    }
}

impl From<(&str, Metadata)> for MentionInput {
    fn from((text, metadata): (&str, Metadata)) -> Self {
        Self::TextWithMetadata(text.to_string(), metadata)
    }
}
