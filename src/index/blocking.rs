//! Blocking: cheap pre-filters bounding the candidates a mention is scored
//! against.
//!
//! Buckets are keyed on normalized names and aliases. Every blocker returns
//! candidates in a deterministic order (first bucket hit, then insertion).

use std::collections::{HashMap, HashSet};

use crate::config::BlockingConfig;
use crate::entity::{Entity, EntityId};
use crate::mention::Mention;
use crate::normalize::Normalizer;

/// Candidate generator over a mention.
pub trait Blocker {
    /// Candidates for an already-normalized text.
    fn candidates_for(&self, normalized: &str) -> Vec<EntityId>;

    /// Candidates for a mention.
    fn get_candidates(&self, mention: &Mention) -> Vec<EntityId> {
        self.candidates_for(mention.normalized_text())
    }
}

fn push_unique(bucket: &mut Vec<EntityId>, id: EntityId) {
    if !bucket.contains(&id) {
        bucket.push(id);
    }
}

fn index_keys(entity: &Entity, normalizer: &Normalizer) -> Vec<String> {
    std::iter::once(entity.normalized_name.clone())
        .chain(entity.aliases.iter().map(|a| normalizer.normalize(a)))
        .filter(|k| !k.is_empty())
        .collect()
}

/// Buckets entities by the first `prefix_len` characters of each key.
#[derive(Debug, Clone)]
pub struct PrefixBlocker {
    prefix_len: usize,
    buckets: HashMap<String, Vec<EntityId>>,
}

impl PrefixBlocker {
    /// Blocker keyed on the first `prefix_len` characters.
    #[must_use]
    pub fn new(prefix_len: usize) -> Self {
        Self {
            prefix_len: prefix_len.max(1),
            buckets: HashMap::new(),
        }
    }

    fn prefix(&self, key: &str) -> Option<String> {
        if key.chars().count() < self.prefix_len {
            return None;
        }
        Some(key.chars().take(self.prefix_len).collect())
    }

    /// Keys shorter than the prefix length are not bucketed.
    pub fn add_entity(&mut self, entity: &Entity, normalizer: &Normalizer) {
        for key in index_keys(entity, normalizer) {
            if let Some(prefix) = self.prefix(&key) {
                push_unique(self.buckets.entry(prefix).or_default(), entity.id);
            }
        }
    }
}

impl Blocker for PrefixBlocker {
    fn candidates_for(&self, normalized: &str) -> Vec<EntityId> {
        self.prefix(normalized)
            .and_then(|p| self.buckets.get(&p))
            .cloned()
            .unwrap_or_default()
    }
}

/// Buckets entities by every key token of at least `min_token_len` chars.
#[derive(Debug, Clone)]
pub struct TokenBlocker {
    min_token_len: usize,
    min_shared_tokens: usize,
    buckets: HashMap<String, Vec<EntityId>>,
}

impl TokenBlocker {
    /// Blocker keyed on tokens of at least `min_token_len` characters.
    #[must_use]
    pub fn new(min_token_len: usize, min_shared_tokens: usize) -> Self {
        Self {
            min_token_len,
            min_shared_tokens: min_shared_tokens.max(1),
            buckets: HashMap::new(),
        }
    }

    fn tokens<'a>(&self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let min = self.min_token_len;
        key.split_whitespace().filter(move |t| t.chars().count() >= min)
    }

    /// Indexes the entity's name and aliases.
    pub fn add_entity(&mut self, entity: &Entity, normalizer: &Normalizer) {
        for key in index_keys(entity, normalizer) {
            let tokens: Vec<String> = self.tokens(&key).map(str::to_string).collect();
            for token in tokens {
                push_unique(self.buckets.entry(token).or_default(), entity.id);
            }
        }
    }
}

impl Blocker for TokenBlocker {
    /// Entities sharing at least `min_shared_tokens` distinct tokens with
    /// the text.
    fn candidates_for(&self, normalized: &str) -> Vec<EntityId> {
        let mut seen_tokens = HashSet::new();
        let mut order = Vec::new();
        let mut counts: HashMap<EntityId, usize> = HashMap::new();

        for token in self.tokens(normalized) {
            if !seen_tokens.insert(token) {
                continue;
            }
            let Some(bucket) = self.buckets.get(token) else {
                continue;
            };
            for &id in bucket {
                let count = counts.entry(id).or_insert(0);
                if *count == 0 {
                    order.push(id);
                }
                *count += 1;
            }
        }

        order
            .into_iter()
            .filter(|id| counts.get(id).copied().unwrap_or(0) >= self.min_shared_tokens)
            .collect()
    }
}

/// Union of prefix and token candidates, deduplicated.
#[derive(Debug, Clone)]
pub struct CombinedBlocker {
    prefix: PrefixBlocker,
    token: TokenBlocker,
}

impl CombinedBlocker {
    /// Empty blocker.
    #[must_use]
    pub fn new(config: &BlockingConfig) -> Self {
        Self {
            prefix: PrefixBlocker::new(config.prefix_len),
            token: TokenBlocker::new(config.min_token_len, config.min_shared_tokens),
        }
    }

    /// Blocker over `entities`.
    #[must_use]
    pub fn build(entities: &[Entity], normalizer: &Normalizer, config: &BlockingConfig) -> Self {
        let mut blocker = Self::new(config);
        for entity in entities {
            blocker.add_entity(entity, normalizer);
        }
        blocker
    }

    /// Indexes the entity in both blockers.
    pub fn add_entity(&mut self, entity: &Entity, normalizer: &Normalizer) {
        self.prefix.add_entity(entity, normalizer);
        self.token.add_entity(entity, normalizer);
    }
}

impl Blocker for CombinedBlocker {
    fn candidates_for(&self, normalized: &str) -> Vec<EntityId> {
        let mut out = self.prefix.candidates_for(normalized);
        for id in self.token.candidates_for(normalized) {
            push_unique(&mut out, id);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(name: &str, aliases: &[&str]) -> Entity {
        Entity::new(name, &Normalizer::default())
            .unwrap()
            .with_aliases(aliases.iter().copied())
    }

    #[test]
    fn test_prefix_blocker() {
        let n = Normalizer::default();
        let apple = entity("Apple Inc.", &["AAPL"]);
        let hp = entity("HP", &[]);
        let mut blocker = PrefixBlocker::new(3);
        blocker.add_entity(&apple, &n);
        blocker.add_entity(&hp, &n);

        assert_eq!(blocker.candidates_for("applesauce"), vec![apple.id]);
        assert_eq!(blocker.candidates_for("aap"), vec![apple.id]);
        assert!(blocker.candidates_for("ap").is_empty());
        assert!(blocker.candidates_for("hp").is_empty());
    }

    #[test]
    fn test_token_blocker_min_shared() {
        let n = Normalizer::default();
        let gs = entity("Goldman Sachs Group", &[]);
        let gm = entity("General Motors", &[]);
        let mut blocker = TokenBlocker::new(2, 2);
        blocker.add_entity(&gs, &n);
        blocker.add_entity(&gm, &n);

        assert_eq!(blocker.candidates_for("goldman sachs"), vec![gs.id]);
        assert!(blocker.candidates_for("goldman motors").is_empty());
        // repeated tokens count once
        assert!(blocker.candidates_for("goldman goldman").is_empty());
    }

    #[test]
    fn test_token_blocker_skips_short_tokens() {
        let n = Normalizer::default();
        let e = entity("A B Holdings", &[]);
        let mut blocker = TokenBlocker::new(2, 1);
        blocker.add_entity(&e, &n);
        assert!(blocker.candidates_for("a").is_empty());
        assert_eq!(blocker.candidates_for("holdings"), vec![e.id]);
    }

    #[test]
    fn test_combined_union_dedup() {
        let n = Normalizer::default();
        let inc = entity("Apple Inc.", &[]);
        let records = entity("Apple Records", &[]);
        let pie = entity("Pie Apple Bakery", &[]);
        let blocker = CombinedBlocker::build(&[inc.clone(), records.clone(), pie.clone()], &n, &BlockingConfig::default());

        let got = blocker.candidates_for("apple");
        assert_eq!(got, vec![inc.id, records.id, pie.id]);
    }

    #[test]
    fn test_exact_keys_always_blocked() {
        let n = Normalizer::default();
        let entities = vec![
            entity("International Business Machines", &["IBM", "Big Blue"]),
            entity("Deutsche Bank AG", &["DB"]),
        ];
        let blocker = CombinedBlocker::build(&entities, &n, &BlockingConfig::default());
        for e in &entities {
            for key in index_keys(e, &n) {
                assert!(blocker.candidates_for(&key).contains(&e.id), "key {key:?}");
            }
        }
    }
}
