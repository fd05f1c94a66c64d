//! Contextual boosts: domain agreement and recency.

use chrono::{DateTime, Utc};

use crate::config::ContextConfig;
use crate::entity::{Entity, Metadata};
use crate::index::exact::BUILTIN_SOURCE;
use crate::outcome::Citation;

fn meta_lower(metadata: &Metadata, key: &str) -> Option<String> {
    metadata
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

fn email_domain(metadata: &Metadata) -> Option<String> {
    let email = meta_lower(metadata, "email")?;
    let (_, domain) = email.split_once('@')?;
    let domain = domain.split('@').next().unwrap_or(domain);
    (!domain.is_empty()).then(|| domain.to_string())
}

/// Boost when the `domain` metadata agree (case-insensitive), else when the
/// domains of the `email` metadata agree.
#[must_use]
pub fn domain_boost(mention: &Metadata, entity: &Metadata, boost: f32) -> (f32, Option<Citation>) {
    if let (Some(m), Some(e)) = (meta_lower(mention, "domain"), meta_lower(entity, "domain")) {
        if m == e {
            return (boost, Some(Citation::new(BUILTIN_SOURCE, "domain_match", boost)));
        }
    }
    if let (Some(m), Some(e)) = (email_domain(mention), email_domain(entity)) {
        if m == e {
            return (boost, Some(Citation::new(BUILTIN_SOURCE, "email_domain_match", boost)));
        }
    }
    (0.0, None)
}

/// Linear decay from `max_boost` to 0 over `window_days` whole days since
/// `last_seen`. Timestamps in the future count as seen now.
#[must_use]
pub fn recency_boost(
    last_seen: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    window_days: u32,
    max_boost: f32,
) -> f32 {
    let Some(last_seen) = last_seen else {
        return 0.0;
    };
    if window_days == 0 {
        return 0.0;
    }
    let days = (now - last_seen).num_days().max(0);
    if days > i64::from(window_days) {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let decay = 1.0 - days as f32 / window_days as f32;
    max_boost * decay
}

/// Combined contextual boost for one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextualSignal {
    /// Domain agreement boost.
    pub domain: f32,
    /// Recency boost.
    pub recency: f32,
    /// Citations for the non-zero boosts.
    pub citations: Vec<Citation>,
}

impl ContextualSignal {
    /// Computes both boosts at `now`.
    ///
    /// Citations are recorded for boosts that are positive and at least
    /// `threshold`.
    #[must_use]
    pub fn score_at(
        mention: &Metadata,
        entity: &Entity,
        config: &ContextConfig,
        threshold: f32,
        now: DateTime<Utc>,
    ) -> Self {
        let mut citations = Vec::new();

        let (domain, citation) = domain_boost(mention, &entity.metadata, config.domain_boost);
        if let Some(c) = citation.filter(|c| c.score > 0.0 && c.score >= threshold) {
            citations.push(c);
        }

        let recency = recency_boost(
            entity.last_seen,
            now,
            config.recency_window_days,
            config.recency_max_boost,
        );
        if recency > 0.0 && recency >= threshold {
            citations.push(Citation::new(BUILTIN_SOURCE, "recency", recency));
        }

        Self {
            domain,
            recency,
            citations,
        }
    }

    /// Total boost.
    #[must_use]
    pub fn score(&self) -> f32 {
        self.domain + self.recency
    }
}
