// Text analyzer: lowercasing, tokenization, stop word removal, n-grams.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use stop_words::{get, LANGUAGE};

/// Tokens are runs of two or more word characters.
static TOKEN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("valid token pattern"));

/// Settings that shape the vocabulary. Persisted with the fitted vectorizer so
/// inference analyzes text exactly the way training did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Upper bound on vocabulary size (most frequent terms win)
    pub max_features: usize,
    /// Inclusive n-gram range, (1, 2) means unigrams and bigrams
    pub ngram_range: (usize, usize),
    /// Drop English stop words before forming n-grams
    pub stop_words: bool,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: 10_000,
            ngram_range: (1, 2),
            stop_words: true,
        }
    }
}

/// Turns a document into the list of terms (n-grams) it contains.
#[derive(Debug, Clone)]
pub struct Analyzer {
    ngram_range: (usize, usize),
    stop_words: HashSet<String>,
}

impl Analyzer {
    pub fn new(config: &VectorizerConfig) -> Self {
        let stop_words = if config.stop_words {
            let words: Vec<String> = get(LANGUAGE::English);
            words.into_iter().map(|w| w.to_lowercase()).collect()
        } else {
            HashSet::new()
        };

        let (min_n, max_n) = config.ngram_range;
        let min_n = min_n.max(1);
        Self {
            ngram_range: (min_n, max_n.max(min_n)),
            stop_words,
        }
    }

    /// Lowercased tokens with stop words removed.
    pub fn tokens(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        TOKEN_PATTERN
            .find_iter(&lower)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(*t))
            .map(str::to_string)
            .collect()
    }

    /// All n-grams in the configured range, in document order per n.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let tokens = self.tokens(text);
        let (min_n, max_n) = self.ngram_range;

        let mut terms = Vec::new();
        for n in min_n..=max_n {
            if n > tokens.len() {
                break;
            }
            terms.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        terms
    }
}
