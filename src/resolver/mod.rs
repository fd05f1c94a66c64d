//! Resolution strategies.
//!
//! Two strategies share one contract: a mention plus a read-only view of
//! the indices in, a [`MatchResult`] out. The strategy is picked once from
//! configuration and never re-checked per call.

mod multi_signal;
mod sequential;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ResolverConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{ConfigurationError, ResolveResult};
use crate::index::{CandidateIndex, SemanticIndex};
use crate::mention::Mention;
use crate::outcome::MatchResult;

pub use multi_signal::MultiSignalResolver;
pub use sequential::SequentialResolver;

/// Which strategy resolves mentions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ResolutionMode {
    /// Mode A: staged pipeline, stops at the first confident stage.
    #[default]
    Sequential,
    /// Mode B: scores every candidate on every signal and ranks them.
    Aggregate,
}

impl ResolutionMode {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Aggregate => "aggregate",
        }
    }
}

impl fmt::Display for ResolutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionMode {
    type Err = ConfigurationError;

    /// Accepts `sequential`/`A` and `aggregate`/`B`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "sequential" | "mode_a" => Ok(Self::Sequential),
            "b" | "aggregate" | "mode_b" => Ok(Self::Aggregate),
            _ => Err(ConfigurationError::UnknownMode {
                value: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ResolutionMode {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResolutionMode> for String {
    fn from(mode: ResolutionMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Read-only state a strategy consults for one resolve call.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Lexical indices and the entity snapshot.
    pub index: &'a CandidateIndex,
    /// Semantic index, if built.
    pub semantic: Option<&'a SemanticIndex>,
    /// Provider used to embed the mention.
    pub provider: Option<&'a dyn EmbeddingProvider>,
    /// Clock for recency boosts.
    pub now: DateTime<Utc>,
}

impl<'a> ResolveContext<'a> {
    /// Context over lexical indices only.
    #[must_use]
    pub fn lexical(index: &'a CandidateIndex) -> Self {
        Self {
            index,
            semantic: None,
            provider: None,
            now: Utc::now(),
        }
    }

    /// Adds semantic search.
    #[must_use]
    pub fn with_semantic(
        mut self,
        semantic: Option<&'a SemanticIndex>,
        provider: Option<&'a dyn EmbeddingProvider>,
    ) -> Self {
        self.semantic = semantic;
        self.provider = provider;
        self
    }

    /// Overrides the clock.
    #[must_use]
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

impl fmt::Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext")
            .field("entities", &self.index.len())
            .field("semantic", &self.semantic.map(SemanticIndex::len))
            .field("provider", &self.provider.map(|p| p.model_name()))
            .field("now", &self.now)
            .finish()
    }
}

/// The closed set of strategies.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Mode A.
    Sequential(SequentialResolver),
    /// Mode B.
    Aggregate(MultiSignalResolver),
}

impl Strategy {
    /// Builds the strategy named by `config.mode`.
    #[must_use]
    pub fn from_config(config: &ResolverConfig) -> Self {
        match config.mode {
            ResolutionMode::Sequential => Self::Sequential(SequentialResolver::new(config)),
            ResolutionMode::Aggregate => Self::Aggregate(MultiSignalResolver::new(config)),
        }
    }

    /// Mode this strategy implements.
    #[must_use]
    pub fn mode(&self) -> ResolutionMode {
        match self {
            Self::Sequential(_) => ResolutionMode::Sequential,
            Self::Aggregate(_) => ResolutionMode::Aggregate,
        }
    }

    /// Resolves one mention.
    ///
    /// # Errors
    ///
    /// Returns embedding or index errors from the semantic path. "No match"
    /// is a `new_entity` result, never an error.
    pub fn resolve(&self, mention: Mention, ctx: &ResolveContext<'_>) -> ResolveResult<MatchResult> {
        match self {
            Self::Sequential(r) => r.resolve(mention, ctx),
            Self::Aggregate(r) => r.resolve(mention, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("A".parse::<ResolutionMode>().unwrap(), ResolutionMode::Sequential);
        assert_eq!("b".parse::<ResolutionMode>().unwrap(), ResolutionMode::Aggregate);
        assert_eq!(" Aggregate ".parse::<ResolutionMode>().unwrap(), ResolutionMode::Aggregate);
        let err = "C".parse::<ResolutionMode>().unwrap_err();
        assert_eq!(err, ConfigurationError::UnknownMode { value: "C".to_string() });
    }

    #[test]
    fn test_mode_serde() {
        let mode: ResolutionMode = serde_json::from_str("\"B\"").unwrap();
        assert_eq!(mode, ResolutionMode::Aggregate);
        assert_eq!(serde_json::to_string(&mode).unwrap(), "\"aggregate\"");
        assert!(serde_json::from_str::<ResolutionMode>("\"mode_c\"").is_err());
    }

    #[test]
    fn test_strategy_from_config() {
        let config = ResolverConfig::for_mode(ResolutionMode::Aggregate);
        assert_eq!(Strategy::from_config(&config).mode(), ResolutionMode::Aggregate);
        assert_eq!(
            Strategy::from_config(&ResolverConfig::default()).mode(),
            ResolutionMode::Sequential
        );
    }
}
