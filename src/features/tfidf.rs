// TF-IDF vectorizer.
//
// Fitting counts every n-gram in the training corpus, keeps the most frequent
// `max_features` of them, and records a smoothed inverse document frequency
// per kept term. Transforming a comment multiplies its raw term counts by
// those IDF weights and L2-normalizes the result.
//
// The vocabulary is stored sorted, so the dimension index of a term is its
// position and lookups are a binary search. That keeps the persisted artifact
// a plain list and makes fitting independent of hash map iteration order.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::tokenize::{Analyzer, VectorizerConfig};
use super::vector::SparseVector;
use crate::error::ModerationError;

/// A fitted TF-IDF vectorizer. Immutable once fitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    config: VectorizerConfig,
    /// Vocabulary in ascending order; index = dimension
    terms: Vec<String>,
    /// Smoothed IDF weight per term, parallel to `terms`
    idf: Vec<f64>,
    /// Built on first use, not persisted
    #[serde(skip)]
    analyzer: OnceLock<Analyzer>,
}

impl TfIdfVectorizer {
    /// Learn a vocabulary and IDF weights from `corpus`.
    ///
    /// Deterministic: the same corpus and config always produce the same
    /// vocabulary, indices and weights.
    pub fn fit(corpus: &[String], config: VectorizerConfig) -> Result<Self> {
        if corpus.is_empty() {
            return Err(ModerationError::InvalidTrainingData(
                "cannot fit a vectorizer on an empty corpus".to_string(),
            )
            .into());
        }

        let analyzer = Analyzer::new(&config);

        let mut term_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in corpus {
            let terms = analyzer.analyze(doc);
            let mut seen: HashSet<&str> = HashSet::new();
            for term in &terms {
                *term_counts.entry(term.clone()).or_default() += 1;
                if seen.insert(term.as_str()) {
                    *doc_freq.entry(term.clone()).or_default() += 1;
                }
            }
        }

        if term_counts.is_empty() {
            return Err(ModerationError::InvalidTrainingData(
                "corpus produced an empty vocabulary (only stop words or punctuation?)"
                    .to_string(),
            )
            .into());
        }

        // Most frequent first, ties broken alphabetically so the cut is stable
        let mut ranked: Vec<(String, usize)> = term_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(config.max_features.max(1));

        let mut terms: Vec<String> = ranked.into_iter().map(|(t, _)| t).collect();
        terms.sort();

        let n_docs = corpus.len() as f64;
        let idf = terms
            .iter()
            .map(|t| {
                let df = doc_freq.get(t).copied().unwrap_or(0) as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        info!(
            documents = corpus.len(),
            vocabulary = terms.len(),
            "Fitted TF-IDF vectorizer"
        );

        let cell = OnceLock::new();
        let _ = cell.set(analyzer);

        Ok(Self {
            config,
            terms,
            idf,
            analyzer: cell,
        })
    }

    /// Map `text` into the fitted vector space.
    ///
    /// Out-of-vocabulary terms are ignored. Text with no usable tokens gives
    /// the all-zero vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let analyzer = self.analyzer.get_or_init(|| Analyzer::new(&self.config));

        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in analyzer.analyze(text) {
            if let Some(idx) = self.index_of(&term) {
                *counts.entry(idx).or_default() += 1.0;
            }
        }

        let weighted = counts.into_iter().map(|(i, tf)| (i, tf * self.idf[i]));
        SparseVector::from_pairs(self.dim(), weighted).normalized()
    }

    pub fn transform_batch(&self, texts: &[String]) -> Vec<SparseVector> {
        texts.iter().map(|t| self.transform(t)).collect()
    }

    /// Dimension of every vector this vectorizer produces.
    pub fn dim(&self) -> usize {
        self.terms.len()
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.terms
    }

    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.terms.binary_search_by(|t| t.as_str().cmp(term)).ok()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.index_of(term).map(|i| self.idf[i])
    }

    pub fn config(&self) -> &VectorizerConfig {
        &self.config
    }
}
