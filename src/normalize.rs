//! Text normalization.
//!
//! Pure functions turning raw names into a comparable form. Every index and
//! signal consumes text through here, so the same rules apply to entity
//! names, aliases and mentions.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

use crate::config::NormalizationConfig;

/// Words ignored when deriving an acronym.
const STOP_WORDS: &[&str] = &["the", "of", "and", "a", "an", "in", "on", "at", "to", "for"];

static DEFAULT_NORMALIZER: OnceLock<Normalizer> = OnceLock::new();

/// Config-driven name normalizer.
///
/// Legal suffixes are compiled once; each suffix is matched at the end of the
/// string case-insensitively, tolerating a preceding comma/period and
/// surrounding whitespace. Suffixes are applied in the configured order and
/// the pass repeats until nothing more strips, so `normalize` is idempotent.
/// A name made only of suffixes ("Co", "Ltd AG") keeps its cleaned form
/// rather than normalizing to nothing.
///
/// # Examples
///
/// ```
/// use entity_resolver::Normalizer;
///
/// let normalizer = Normalizer::default();
/// assert_eq!(normalizer.normalize("Apple, Inc."), "apple");
/// assert_eq!(normalizer.normalize("  Goldman   Sachs & Co. "), "goldman sachs");
/// ```
#[derive(Debug, Clone)]
pub struct Normalizer {
    suffixes: Vec<Regex>,
    lowercase: bool,
    strip_punctuation: bool,
    collapse_whitespace: bool,
}

impl Normalizer {
    /// Builds a normalizer from configuration.
    #[must_use]
    pub fn new(config: &NormalizationConfig) -> Self {
        let suffixes = config
            .legal_suffixes
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .filter_map(|suffix| {
                let pattern = format!(r"(?i)\s*[,.]?\s*\b{}\b\.?\s*$", regex::escape(suffix));
                match Regex::new(&pattern) {
                    Ok(re) => Some(re),
                    Err(err) => {
                        warn!(suffix, error = %err, "skipping legal suffix that does not compile");
                        None
                    }
                }
            })
            .collect();

        Self {
            suffixes,
            lowercase: config.lowercase,
            strip_punctuation: config.strip_punctuation,
            collapse_whitespace: config.collapse_whitespace,
        }
    }

    /// Normalizes a name for matching.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let mut out = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        if self.strip_punctuation {
            out = replace_punctuation(&out);
        }
        if self.collapse_whitespace {
            out = collapse_whitespace(&out);
        }

        let stripped = self.strip_legal_suffixes(out.trim());
        if !stripped.trim().is_empty() {
            out = stripped;
        }

        if self.collapse_whitespace {
            out = collapse_whitespace(&out);
        }
        out.trim().to_string()
    }

    /// Strips configured legal suffixes from the end of `text` until none apply.
    #[must_use]
    pub fn strip_legal_suffixes(&self, text: &str) -> String {
        let mut out = text.to_string();
        loop {
            let before = out.len();
            for re in &self.suffixes {
                if re.is_match(&out) {
                    out = re.replace(&out, "").into_owned();
                }
            }
            if out.len() == before {
                return out;
            }
        }
    }

    /// Number of compiled legal suffixes.
    #[must_use]
    pub fn suffix_count(&self) -> usize {
        self.suffixes.len()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(&NormalizationConfig::default())
    }
}

/// Returns the process-wide normalizer built from default configuration.
///
/// It is immutable; resolvers built with custom suffix lists carry their own
/// [`Normalizer`].
pub fn default_normalizer() -> &'static Normalizer {
    DEFAULT_NORMALIZER.get_or_init(Normalizer::default)
}

/// Normalizes `text` with the default configuration.
#[must_use]
pub fn normalize(text: &str) -> String {
    default_normalizer().normalize(text)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn replace_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| if is_word_char(c) || c.is_whitespace() { c } else { ' ' })
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// Splits text into lowercase tokens after stripping punctuation.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    replace_punctuation(&text.to_lowercase())
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Derives an acronym from the first letters of the significant words.
///
/// Words that are stop-words or contain non-alphabetic characters are skipped.
///
/// ```
/// use entity_resolver::normalize::acronym;
///
/// assert_eq!(acronym("International Business Machines"), "IBM");
/// assert_eq!(acronym("The United States of America"), "USA");
/// ```
#[must_use]
pub fn acronym(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .filter(|w| !STOP_WORDS.contains(w))
        .filter(|w| w.chars().all(char::is_alphabetic))
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

/// True if one text's token set is a subset of the other's.
///
/// Empty token sets never contain or are contained.
#[must_use]
pub fn token_containment(a: &str, b: &str) -> bool {
    let ta: HashSet<String> = tokenize(a).into_iter().collect();
    let tb: HashSet<String> = tokenize(b).into_iter().collect();
    if ta.is_empty() || tb.is_empty() {
        return false;
    }
    ta.is_subset(&tb) || tb.is_subset(&ta)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_suffixes() {
        assert_eq!(normalize("Apple Inc."), "apple");
        assert_eq!(normalize("Apple, Inc."), "apple");
        assert_eq!(normalize("Microsoft Corporation"), "microsoft");
        assert_eq!(normalize("Acme GmbH"), "acme");
        assert_eq!(normalize("Apple Records"), "apple records");
    }

    #[test]
    fn test_suffixes_compound() {
        assert_eq!(normalize("Foo Co. Ltd."), "foo");
        assert_eq!(normalize("Foo Inc Co"), "foo");
        assert_eq!(normalize("Foo Ltd Inc Corp"), "foo");
    }

    #[test]
    fn test_suffix_only_names_survive() {
        assert_eq!(normalize("Co"), "co");
        assert_eq!(normalize("Ltd."), "ltd");
        assert_eq!(normalize("S.A."), "s a");
        assert_eq!(normalize("Inc, Co."), "inc co");
        assert_eq!(normalize(&normalize("Ltd AG")), "ltd ag");
    }

    #[test]
    fn test_suffix_needs_word_boundary() {
        assert_eq!(normalize("Zinc"), "zinc");
        assert_eq!(normalize("Disco"), "disco");
    }

    #[test]
    fn test_punctuation_and_whitespace() {
        assert_eq!(normalize("  AT&T   Mobility!! "), "at t mobility");
        assert_eq!(normalize("snake_case name"), "snake_case name");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn test_normalize_idempotent_on_tricky_inputs() {
        let inputs = [
            "Foo Inc!",
            "Foo Inc Co",
            "Foo-Inc.",
            "  The  Company, Co. ",
            "Inc",
            "Société Générale S.A.",
            "ÀÉÎ corp.",
            "a.b.c. ltd",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_custom_suffix_list() {
        let config = NormalizationConfig {
            legal_suffixes: vec!["holdings".to_string()],
            ..NormalizationConfig::default()
        };
        let normalizer = Normalizer::new(&config);
        assert_eq!(normalizer.normalize("Alphabet Holdings"), "alphabet");
        assert_eq!(normalizer.normalize("Alphabet Inc"), "alphabet inc");
        assert_eq!(normalizer.suffix_count(), 1);
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Apple, Inc."), vec!["apple", "inc"]);
        assert!(tokenize("  ").is_empty());
    }

    #[test]
    fn test_acronym() {
        assert_eq!(acronym("International Business Machines"), "IBM");
        assert_eq!(acronym("The United States of America"), "USA");
        assert_eq!(acronym("Apple Inc."), "A");
        assert_eq!(acronym("3M Company"), "C");
        assert_eq!(acronym(""), "");
    }

    #[test]
    fn test_token_containment() {
        assert!(token_containment("maximem", "maximem ai"));
        assert!(token_containment("Apple Inc", "apple"));
        assert!(!token_containment("apple", "orange"));
        assert!(!token_containment("", "apple"));
        assert!(!token_containment("apple", "!!!"));
    }
}
