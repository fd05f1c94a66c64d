//! Resolver configuration.
//!
//! Every section implements `Default` with the documented defaults and is
//! `#[serde(default)]`, so a JSON document only needs the keys it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, ValidationError};
use crate::index::ann::{AnnBackendKind, Metric};
use crate::resolver::ResolutionMode;

/// Decision thresholds for both resolution modes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Mode A: minimum acronym score that stops the pipeline.
    pub high_acronym: f32,
    /// Mode A: minimum token-set ratio that stops the pipeline.
    pub high_fuzzy: f32,
    /// Mode A: semantic score accepted without review.
    pub auto_merge: f32,
    /// Mode A: semantic score sent to human review.
    pub review_low: f32,
    /// Mode B: aggregated score accepted as a merge.
    pub aggregate_auto_merge: f32,
    /// Mode B: aggregated score accepted as a link.
    pub aggregate_auto_link: f32,
    /// Mode B: aggregated score sent to human review.
    pub aggregate_review: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            high_acronym: 0.9,
            high_fuzzy: 0.9,
            auto_merge: 0.85,
            review_low: 0.5,
            aggregate_auto_merge: 0.9,
            aggregate_auto_link: 0.7,
            aggregate_review: 0.45,
        }
    }
}

/// Aggregation weights (Mode B).
///
/// The weights are not required to sum to one; `contextual` is an additive
/// boost and the aggregator only clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    /// Weight of the exact signal.
    pub exact: f32,
    /// Weight of the embedding similarity.
    pub embedding: f32,
    /// Weight of the combined fuzzy score.
    pub fuzzy: f32,
    /// Weight of the acronym signal.
    pub acronym: f32,
    /// Weight of the contextual boost.
    pub contextual: f32,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            exact: 0.40,
            embedding: 0.30,
            fuzzy: 0.10,
            acronym: 0.10,
            contextual: 0.20,
        }
    }
}

/// Weights of the combined fuzzy score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzyWeights {
    /// Weight of the token-set ratio.
    pub token_set: f32,
    /// Weight of the partial ratio.
    pub partial: f32,
    /// Weight of the Levenshtein similarity.
    pub levenshtein: f32,
    /// Weight of the Jaro-Winkler similarity.
    pub jaro_winkler: f32,
}

impl Default for FuzzyWeights {
    fn default() -> Self {
        Self {
            token_set: 0.4,
            partial: 0.2,
            levenshtein: 0.2,
            jaro_winkler: 0.2,
        }
    }
}

/// Minimum contribution for a signal family to be cited.
///
/// A citation is recorded when the contribution is positive and at least the
/// family's threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationThresholds {
    /// Exact match.
    pub exact: f32,
    /// Combined fuzzy score.
    pub fuzzy: f32,
    /// Acronym signal.
    pub acronym: f32,
    /// Embedding similarity.
    pub semantic: f32,
    /// Contextual boost.
    pub contextual: f32,
}

impl Default for CitationThresholds {
    fn default() -> Self {
        Self {
            exact: 0.0,
            fuzzy: 0.0,
            acronym: 0.5,
            semantic: 0.0,
            contextual: 0.0,
        }
    }
}

/// Contextual boost parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Added when domain or email domain agree.
    pub domain_boost: f32,
    /// Recency boost for an entity seen right now.
    pub recency_max_boost: f32,
    /// Days over which the recency boost decays to zero.
    pub recency_window_days: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            domain_boost: 0.2,
            recency_max_boost: 0.15,
            recency_window_days: 30,
        }
    }
}

/// Blocking parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockingConfig {
    /// Characters in the prefix key.
    pub prefix_len: usize,
    /// Shared tokens needed for a token-block hit.
    pub min_shared_tokens: usize,
    /// Shorter tokens are not indexed.
    pub min_token_len: usize,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            prefix_len: 3,
            min_shared_tokens: 1,
            min_token_len: 2,
        }
    }
}

/// ANN index parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnConfig {
    /// Vector search backend.
    pub backend: AnnBackendKind,
    /// Similarity metric.
    pub metric: Metric,
    /// Candidates retrieved per mention in Mode B.
    pub top_k: usize,
    /// HNSW: links per node on upper layers (layer 0 keeps twice as many).
    pub hnsw_m: usize,
    /// HNSW: candidate list size while inserting.
    pub hnsw_ef_construction: usize,
    /// HNSW: candidate list size while searching.
    pub hnsw_ef_search: usize,
    /// IVF: number of partitions (clamped to the corpus size).
    pub ivf_partitions: usize,
    /// IVF: partitions scanned per query.
    pub ivf_probes: usize,
    /// IVF: maximum vectors used for the training pass.
    pub ivf_training_sample: usize,
}

impl Default for AnnConfig {
    fn default() -> Self {
        Self {
            backend: AnnBackendKind::Flat,
            metric: Metric::Cosine,
            top_k: 10,
            hnsw_m: 16,
            hnsw_ef_construction: 200,
            hnsw_ef_search: 50,
            ivf_partitions: 100,
            ivf_probes: 8,
            ivf_training_sample: 10_000,
        }
    }
}

/// Text normalization parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    /// Trailing legal-form words removed from names.
    pub legal_suffixes: Vec<String>,
    /// Lowercase before matching.
    pub lowercase: bool,
    /// Replace punctuation with spaces.
    pub strip_punctuation: bool,
    /// Collapse runs of whitespace.
    pub collapse_whitespace: bool,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        let legal_suffixes = [
            "inc",
            "ltd",
            "llc",
            "corp",
            "corporation",
            "company",
            "co",
            "limited",
            "gmbh",
            "ag",
            "sa",
            "plc",
            "pvt",
            "pty",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Self {
            legal_suffixes,
            lowercase: true,
            strip_punctuation: true,
            collapse_whitespace: true,
        }
    }
}

/// Review-queue behaviour of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// File `human_review` results into the store's review queue.
    pub enqueue_on_review: bool,
    /// Candidates kept on a review item.
    pub max_candidates: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            enqueue_on_review: false,
            max_candidates: 5,
        }
    }
}

/// Batch resolution parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Worker threads for `resolve_batch`; 1 resolves inline.
    pub workers: usize,
    /// Smallest batch worth fanning out.
    pub min_batch_for_parallel: usize,
    /// Bounded queue capacity between the feeder and the workers.
    pub queue_capacity: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            min_batch_for_parallel: 64,
            queue_capacity: 1024,
        }
    }
}

/// Top-level resolver configuration.
///
/// # Examples
///
/// ```
/// use entity_resolver::{ResolutionMode, ResolverConfig};
///
/// let config = ResolverConfig::from_json_str(r#"{"mode": "B", "ann": {"top_k": 5}}"#).unwrap();
/// assert_eq!(config.mode, ResolutionMode::Aggregate);
/// assert_eq!(config.ann.top_k, 5);
/// assert!((config.thresholds.high_fuzzy - 0.9).abs() < f32::EPSILON);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Resolution strategy.
    pub mode: ResolutionMode,
    /// Decision thresholds.
    pub thresholds: Thresholds,
    /// Mode B aggregation weights.
    pub weights: SignalWeights,
    /// Weights of the combined fuzzy score.
    pub fuzzy_weights: FuzzyWeights,
    /// Per-family citation thresholds.
    pub citation_thresholds: CitationThresholds,
    /// Contextual boost parameters.
    pub context: ContextConfig,
    /// Blocking parameters.
    pub blocking: BlockingConfig,
    /// ANN index parameters.
    pub ann: AnnConfig,
    /// Text normalization.
    pub normalization: NormalizationConfig,
    /// Review-queue behaviour.
    pub review: ReviewConfig,
    /// Batch resolution.
    pub batch: BatchConfig,
}

fn check_unit(field: &str, value: f32) -> Result<(), ValidationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: f64::from(value),
            min: 0.0,
            max: 1.0,
        })
    }
}

fn check_weight(field: &str, value: f32) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value: f64::from(value),
            min: 0.0,
            max: f64::from(f32::MAX),
        })
    }
}

fn check_order(
    higher: &str,
    higher_value: f32,
    lower: &str,
    lower_value: f32,
) -> Result<(), ConfigurationError> {
    if higher_value >= lower_value {
        Ok(())
    } else {
        Err(ConfigurationError::ThresholdOrder {
            higher: higher.to_string(),
            higher_value,
            lower: lower.to_string(),
            lower_value,
        })
    }
}

fn check_nonzero(field: &str, value: usize) -> Result<(), ConfigurationError> {
    if value == 0 {
        Err(ConfigurationError::ZeroSize {
            field: field.to_string(),
        })
    } else {
        Ok(())
    }
}

impl ResolverConfig {
    /// Creates a default configuration for the given mode.
    #[must_use]
    pub fn for_mode(mode: ResolutionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Parse` for malformed JSON or unknown enum
    /// values, or the first validation failure.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigurationError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::Parse` if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Parse {
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        Self::from_json_str(&raw)
    }

    /// Checks ranges, threshold ordering and sizes.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let t = &self.thresholds;
        check_unit("thresholds.high_acronym", t.high_acronym)?;
        check_unit("thresholds.high_fuzzy", t.high_fuzzy)?;
        check_unit("thresholds.auto_merge", t.auto_merge)?;
        check_unit("thresholds.review_low", t.review_low)?;
        check_unit("thresholds.aggregate_auto_merge", t.aggregate_auto_merge)?;
        check_unit("thresholds.aggregate_auto_link", t.aggregate_auto_link)?;
        check_unit("thresholds.aggregate_review", t.aggregate_review)?;
        check_order("auto_merge", t.auto_merge, "review_low", t.review_low)?;
        check_order(
            "aggregate_auto_merge",
            t.aggregate_auto_merge,
            "aggregate_auto_link",
            t.aggregate_auto_link,
        )?;
        check_order(
            "aggregate_auto_link",
            t.aggregate_auto_link,
            "aggregate_review",
            t.aggregate_review,
        )?;

        let w = &self.weights;
        check_weight("weights.exact", w.exact)?;
        check_weight("weights.embedding", w.embedding)?;
        check_weight("weights.fuzzy", w.fuzzy)?;
        check_weight("weights.acronym", w.acronym)?;
        check_weight("weights.contextual", w.contextual)?;

        let f = &self.fuzzy_weights;
        check_weight("fuzzy_weights.token_set", f.token_set)?;
        check_weight("fuzzy_weights.partial", f.partial)?;
        check_weight("fuzzy_weights.levenshtein", f.levenshtein)?;
        check_weight("fuzzy_weights.jaro_winkler", f.jaro_winkler)?;

        let c = &self.citation_thresholds;
        check_unit("citation_thresholds.exact", c.exact)?;
        check_unit("citation_thresholds.fuzzy", c.fuzzy)?;
        check_unit("citation_thresholds.acronym", c.acronym)?;
        check_unit("citation_thresholds.semantic", c.semantic)?;
        check_unit("citation_thresholds.contextual", c.contextual)?;

        check_unit("context.domain_boost", self.context.domain_boost)?;
        check_unit("context.recency_max_boost", self.context.recency_max_boost)?;
        check_nonzero(
            "context.recency_window_days",
            self.context.recency_window_days as usize,
        )?;

        check_nonzero("blocking.prefix_len", self.blocking.prefix_len)?;
        check_nonzero("blocking.min_shared_tokens", self.blocking.min_shared_tokens)?;

        check_nonzero("ann.top_k", self.ann.top_k)?;
        check_nonzero("ann.hnsw_m", self.ann.hnsw_m)?;
        check_nonzero("ann.hnsw_ef_construction", self.ann.hnsw_ef_construction)?;
        check_nonzero("ann.hnsw_ef_search", self.ann.hnsw_ef_search)?;
        check_nonzero("ann.ivf_partitions", self.ann.ivf_partitions)?;
        check_nonzero("ann.ivf_probes", self.ann.ivf_probes)?;
        check_nonzero("ann.ivf_training_sample", self.ann.ivf_training_sample)?;

        check_nonzero("review.max_candidates", self.review.max_candidates)?;
        check_nonzero("batch.workers", self.batch.workers)?;
        check_nonzero("batch.queue_capacity", self.batch.queue_capacity)?;
        Ok(())
    }
}
