// On-disk artifact store.
//
// Layout under the model directory:
//
//   CURRENT                      name of the active run directory
//   run-<timestamp>/
//     tfidf_vectorizer.json      fitted extractor
//     toxicity_classifier.json   fitted classifier
//
// Publishing writes a complete run directory under a staging name, renames it
// into place, then replaces CURRENT with a temp file + rename. A reader that
// resolves CURRENT therefore always finds both files of one run, and the run
// id embedded in each file is checked on load.

use std::fs;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::ToxicityModel;
use crate::classifier::logistic::LogisticRegression;
use crate::error::ModerationError;
use crate::features::tfidf::TfIdfVectorizer;

pub const EXTRACTOR_FILE: &str = "tfidf_vectorizer.json";
pub const CLASSIFIER_FILE: &str = "toxicity_classifier.json";
const CURRENT_FILE: &str = "CURRENT";
const STAGING_PREFIX: &str = ".staging-";

#[derive(Serialize, Deserialize)]
struct ExtractorArtifact {
    run_id: String,
    trained_at: DateTime<Utc>,
    vectorizer: TfIdfVectorizer,
}

#[derive(Serialize, Deserialize)]
struct ClassifierArtifact {
    run_id: String,
    trained_at: DateTime<Utc>,
    classifier: LogisticRegression,
}

/// Reads and publishes matched artifact pairs in one directory.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
}

impl ModelStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The run id CURRENT points at, or None if nothing was ever published.
    pub fn current_run(&self) -> Result<Option<String>> {
        let path = self.dir.join(CURRENT_FILE);
        match fs::read_to_string(&path) {
            Ok(s) => {
                let run = s.trim().to_string();
                Ok((!run.is_empty()).then_some(run))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Whether a complete pair is present for the current run.
    pub fn artifacts_present(&self) -> bool {
        match self.current_run() {
            Ok(Some(run)) => {
                let run_dir = self.dir.join(run);
                run_dir.join(EXTRACTOR_FILE).exists() && run_dir.join(CLASSIFIER_FILE).exists()
            }
            _ => false,
        }
    }

    /// Load the current matched pair.
    ///
    /// Fails with `ArtifactMissing` if nothing is published or a file is
    /// gone, and with `ArtifactMismatch` if the two files disagree on run id.
    pub fn load(&self) -> Result<ToxicityModel> {
        let run = self
            .current_run()?
            .ok_or_else(|| ModerationError::ArtifactMissing {
                path: self.dir.join(CURRENT_FILE),
            })?;
        let run_dir = self.dir.join(&run);

        let extractor: ExtractorArtifact = read_artifact(&run_dir.join(EXTRACTOR_FILE))?;
        let classifier: ClassifierArtifact = read_artifact(&run_dir.join(CLASSIFIER_FILE))?;

        if extractor.run_id != classifier.run_id || extractor.run_id != run {
            return Err(ModerationError::ArtifactMismatch {
                extractor_run: extractor.run_id,
                classifier_run: classifier.run_id,
            }
            .into());
        }

        debug!(run_id = %run, "Loaded model artifacts from {}", run_dir.display());

        ToxicityModel::from_parts(
            extractor.run_id,
            extractor.trained_at,
            extractor.vectorizer,
            classifier.classifier,
        )
        .with_context(|| format!("Corrupt artifact pair in {}", run_dir.display()))
    }

    /// Persist `model` and make it the current pair.
    ///
    /// Earlier runs are removed except the one being replaced, which stays
    /// so a reader that resolved CURRENT just before the swap can finish.
    pub fn publish(&self, model: &ToxicityModel) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create model directory: {}", self.dir.display()))?;

        let run = model.run_id();
        let final_dir = self.dir.join(run);
        if final_dir.exists() {
            anyhow::bail!("Run {run} is already published in {}", self.dir.display());
        }

        let staging = self.dir.join(format!("{STAGING_PREFIX}{run}"));
        if staging.exists() {
            fs::remove_dir_all(&staging)
                .with_context(|| format!("Failed to clear {}", staging.display()))?;
        }
        fs::create_dir_all(&staging)
            .with_context(|| format!("Failed to create {}", staging.display()))?;

        let staged = write_artifact(
            &staging.join(EXTRACTOR_FILE),
            &ExtractorArtifact {
                run_id: run.to_string(),
                trained_at: model.trained_at(),
                vectorizer: model.extractor().clone(),
            },
        )
        .and_then(|_| {
            write_artifact(
                &staging.join(CLASSIFIER_FILE),
                &ClassifierArtifact {
                    run_id: run.to_string(),
                    trained_at: model.trained_at(),
                    classifier: model.classifier().clone(),
                },
            )
        })
        .and_then(|_| {
            fs::rename(&staging, &final_dir)
                .with_context(|| format!("Failed to move {} into place", staging.display()))
        });

        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&staging);
            return Err(e);
        }

        let previous = self.current_run()?;
        self.swap_current(run)?;

        info!(
            run_id = run,
            previous = previous.as_deref().unwrap_or("none"),
            "Published model artifacts to {}",
            self.dir.display()
        );

        let mut keep = vec![run.to_string()];
        keep.extend(previous);
        self.prune(&keep);

        Ok(())
    }

    /// Point CURRENT at `run` with a temp file + rename.
    fn swap_current(&self, run: &str) -> Result<()> {
        let tmp = self.dir.join(format!(".{CURRENT_FILE}.tmp"));
        let target = self.dir.join(CURRENT_FILE);

        let mut file = fs::File::create(&tmp)
            .with_context(|| format!("Failed to create {}", tmp.display()))?;
        writeln!(file, "{run}")?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, &target).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            anyhow::Error::new(e).context(format!("Failed to update {}", target.display()))
        })
    }

    /// Remove run directories not in `keep`. Failures are logged, not fatal.
    fn prune(&self, keep: &[String]) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Could not list model directory for pruning");
                return;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().to_string();
            let is_run = name.starts_with("run-") && entry.path().is_dir();
            if !is_run || keep.contains(&name) {
                continue;
            }
            match fs::remove_dir_all(entry.path()) {
                Ok(()) => debug!(run_id = %name, "Pruned old model run"),
                Err(e) => warn!(run_id = %name, error = %e, "Failed to prune old model run"),
            }
        }
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ModerationError::ArtifactMissing {
                path: path.to_path_buf(),
            }
            .into());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to open {}", path.display()));
        }
    };
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse artifact {}", path.display()))
}

fn write_artifact<T: Serialize>(path: &Path, artifact: &T) -> Result<()> {
    let file =
        fs::File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, artifact)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    writer.flush()?;
    writer
        .get_ref()
        .sync_all()
        .with_context(|| format!("Failed to sync {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::logistic::LogisticConfig;
    use crate::features::tokenize::VectorizerConfig;

    fn tiny_model() -> ToxicityModel {
        let texts = vec!["lovely kind words".to_string(), "stupid idiot".to_string()];
        let extractor = TfIdfVectorizer::fit(&texts, VectorizerConfig::default()).unwrap();
        let vectors = extractor.transform_batch(&texts);
        let classifier =
            LogisticRegression::fit(&vectors, &[false, true], &LogisticConfig::default()).unwrap();
        ToxicityModel::new(extractor, classifier).unwrap()
    }

    fn is_missing(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<ModerationError>(),
            Some(ModerationError::ArtifactMissing { .. })
        )
    }

    #[test]
    fn test_load_without_publish_is_artifact_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path());
        assert!(!store.artifacts_present());
        assert!(is_missing(&store.load().unwrap_err()));
    }

    #[test]
    fn test_publish_then_load_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path().join("models"));
        let model = tiny_model();

        store.publish(&model).unwrap();
        assert!(store.artifacts_present());
        assert_eq!(store.current_run().unwrap().as_deref(), Some(model.run_id()));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.run_id(), model.run_id());
        assert_eq!(loaded.classify("stupid idiot"), model.classify("stupid idiot"));
    }

    #[test]
    fn test_missing_classifier_file_is_artifact_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path());
        let model = tiny_model();
        store.publish(&model).unwrap();

        fs::remove_file(tmp.path().join(model.run_id()).join(CLASSIFIER_FILE)).unwrap();
        assert!(is_missing(&store.load().unwrap_err()));
    }

    #[test]
    fn test_mixed_runs_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path());
        let first = tiny_model();
        store.publish(&first).unwrap();
        let second = tiny_model();
        store.publish(&second).unwrap();

        // Graft the older classifier into the current run directory
        fs::copy(
            tmp.path().join(first.run_id()).join(CLASSIFIER_FILE),
            tmp.path().join(second.run_id()).join(CLASSIFIER_FILE),
        )
        .unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ModerationError>(),
            Some(ModerationError::ArtifactMismatch { .. })
        ));
    }

    #[test]
    fn test_publish_prunes_all_but_current_and_previous() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ModelStore::new(tmp.path());
        let runs: Vec<ToxicityModel> = (0..3).map(|_| tiny_model()).collect();
        for model in &runs {
            store.publish(model).unwrap();
        }

        assert!(!tmp.path().join(runs[0].run_id()).exists());
        assert!(tmp.path().join(runs[1].run_id()).exists());
        assert!(tmp.path().join(runs[2].run_id()).exists());
        assert_eq!(store.load().unwrap().run_id(), runs[2].run_id());
    }
}
