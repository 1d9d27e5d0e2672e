// Training pipeline: corpus -> split -> fit extractor -> fit classifier ->
// evaluate -> publish.
//
// Nothing touches the model directory until every earlier step has succeeded,
// so a failed run leaves the previously published pair in place.

pub mod corpus;
pub mod metrics;
pub mod split;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::classifier::logistic::{LogisticConfig, LogisticRegression};
use crate::error::ModerationError;
use crate::features::tfidf::TfIdfVectorizer;
use crate::features::tokenize::VectorizerConfig;
use crate::model::cache::ModelCache;
use crate::model::store::ModelStore;
use crate::model::ToxicityModel;

use corpus::{clean_rows, read_corpus, CorpusRow, LabeledText};
use metrics::EvaluationReport;
use split::stratified_split;

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    /// Share of each label held out for evaluation
    pub eval_ratio: f64,
    /// Seed for the stratified split
    pub seed: u64,
    pub vectorizer: VectorizerConfig,
    pub classifier: LogisticConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            eval_ratio: 0.2,
            seed: 42,
            vectorizer: VectorizerConfig::default(),
            classifier: LogisticConfig::default(),
        }
    }
}

/// Everything a training run produced.
#[derive(Debug)]
pub struct TrainingRun {
    pub model: ToxicityModel,
    pub report: EvaluationReport,
    pub train_size: usize,
    pub eval_size: usize,
}

pub struct TrainingPipeline {
    store: ModelStore,
    config: TrainingConfig,
}

impl TrainingPipeline {
    pub fn new(store: ModelStore, config: TrainingConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Fit and evaluate without persisting anything.
    pub fn fit(&self, rows: Vec<CorpusRow>) -> Result<TrainingRun> {
        let examples = clean_rows(rows)?;

        let toxic = examples.iter().filter(|e| e.is_toxic).count();
        if toxic == 0 || toxic == examples.len() {
            return Err(ModerationError::InvalidTrainingData(format!(
                "need both toxic and non-toxic examples, got {toxic} toxic of {}",
                examples.len()
            ))
            .into());
        }

        let split = stratified_split(
            examples,
            |e: &LabeledText| e.is_toxic,
            self.config.eval_ratio,
            self.config.seed,
        );
        let (train_text, train_labels) = unzip(&split.train);
        let (eval_text, eval_labels) = unzip(&split.eval);

        info!(
            train = train_text.len(),
            eval = eval_text.len(),
            toxic,
            "Split training corpus"
        );

        // Vocabulary comes from the training partition only
        let extractor = TfIdfVectorizer::fit(&train_text, self.config.vectorizer.clone())
            .context("Failed to fit feature extractor")?;
        let train_vectors = extractor.transform_batch(&train_text);
        let classifier =
            LogisticRegression::fit(&train_vectors, &train_labels, &self.config.classifier)
                .context("Failed to fit classifier")?;

        let eval_vectors = extractor.transform_batch(&eval_text);
        let predictions = classifier.predict_batch(&eval_vectors);
        let report = EvaluationReport::evaluate(&eval_labels, &predictions);

        if let Some(accuracy) = report.accuracy {
            info!(accuracy, toxic_f1 = report.toxic.f1, "Evaluated on held-out rows");
        }

        let model = ToxicityModel::new(extractor, classifier)?;

        Ok(TrainingRun {
            model,
            report,
            train_size: train_text.len(),
            eval_size: eval_text.len(),
        })
    }

    /// Fit, evaluate, and publish the pair as the current model.
    pub fn train(&self, rows: Vec<CorpusRow>) -> Result<TrainingRun> {
        let run = self.fit(rows)?;
        self.store
            .publish(&run.model)
            .context("Failed to publish model artifacts")?;
        Ok(run)
    }

    /// `train`, then install the new model in `cache`. Handles taken from the
    /// cache before this call keep the model they were given.
    pub fn train_into(&self, rows: Vec<CorpusRow>, cache: &ModelCache) -> Result<TrainingRun> {
        let run = self.train(rows)?;
        cache.replace(run.model.clone())?;
        Ok(run)
    }

    /// `train` on a CSV corpus with `text` and `label` columns.
    pub fn train_from_path(&self, path: &Path) -> Result<TrainingRun> {
        self.train(load_corpus(path)?)
    }

    /// `train_into` on a CSV corpus.
    pub fn train_from_path_into(&self, path: &Path, cache: &ModelCache) -> Result<TrainingRun> {
        self.train_into(load_corpus(path)?, cache)
    }
}

fn load_corpus(path: &Path) -> Result<Vec<CorpusRow>> {
    let rows = read_corpus(path)?;
    info!(rows = rows.len(), "Loaded training corpus from {}", path.display());
    Ok(rows)
}

fn unzip(examples: &[LabeledText]) -> (Vec<String>, Vec<bool>) {
    examples
        .iter()
        .map(|e| (e.text.clone(), e.is_toxic))
        .unzip()
}
