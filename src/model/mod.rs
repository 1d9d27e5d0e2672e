// The fitted model: a TF-IDF vectorizer and a logistic regression that were
// trained together. They are only ever stored, loaded and used as a pair.

pub mod cache;
pub mod store;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::classifier::logistic::LogisticRegression;
use crate::classifier::traits::ToxicityClassifier;
use crate::features::tfidf::TfIdfVectorizer;
use crate::output::truncate_chars;

/// A matched extractor + classifier pair from one training run.
#[derive(Debug, Clone)]
pub struct ToxicityModel {
    run_id: String,
    trained_at: DateTime<Utc>,
    extractor: TfIdfVectorizer,
    classifier: LogisticRegression,
}

impl ToxicityModel {
    /// Pair a freshly fitted extractor and classifier under a new run id.
    pub fn new(extractor: TfIdfVectorizer, classifier: LogisticRegression) -> Result<Self> {
        let trained_at = Utc::now();
        let run_id = trained_at.format("run-%Y%m%d%H%M%S%9f").to_string();
        Self::from_parts(run_id, trained_at, extractor, classifier)
    }

    pub(crate) fn from_parts(
        run_id: String,
        trained_at: DateTime<Utc>,
        extractor: TfIdfVectorizer,
        classifier: LogisticRegression,
    ) -> Result<Self> {
        if extractor.dim() != classifier.dim() {
            anyhow::bail!(
                "extractor produces {}-dim vectors but classifier expects {}",
                extractor.dim(),
                classifier.dim()
            );
        }
        Ok(Self {
            run_id,
            trained_at,
            extractor,
            classifier,
        })
    }

    /// Label `text`. Pure and repeatable for a given model.
    pub fn classify(&self, text: &str) -> bool {
        let features = self.extractor.transform(text);
        let is_toxic = self.classifier.predict(&features);
        debug!(
            is_toxic,
            active_features = features.nnz(),
            text_preview = %truncate_chars(text, 50),
            "Classified text"
        );
        is_toxic
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }

    pub fn extractor(&self) -> &TfIdfVectorizer {
        &self.extractor
    }

    pub fn classifier(&self) -> &LogisticRegression {
        &self.classifier
    }
}

impl ToxicityClassifier for ToxicityModel {
    fn is_toxic(&self, text: &str) -> Result<bool> {
        Ok(self.classify(text))
    }
}
