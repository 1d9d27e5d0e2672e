use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::model::store::ModelStore;

pub const DEFAULT_LEDGER_PATH: &str = "./submitted_comments.csv";
pub const DEFAULT_MAX_FEATURES: usize = 10_000;

/// Central configuration loaded from environment variables.
///
/// Nothing here is secret. The .env file is loaded automatically at startup
/// via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    /// CSV file holding every published comment
    pub ledger_path: PathBuf,
    /// Directory holding the trained model runs and the CURRENT pointer
    pub model_dir: PathBuf,
    /// Vocabulary cap for the feature extractor when training
    pub max_features: usize,
}

impl Config {
    /// Load configuration from environment variables. Every value has a default.
    pub fn load() -> Result<Self> {
        let max_features = match env::var("TOXGATE_MAX_FEATURES") {
            Ok(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("TOXGATE_MAX_FEATURES must be a positive integer, got {raw:?}"))?,
            Err(_) => DEFAULT_MAX_FEATURES,
        };
        if max_features == 0 {
            anyhow::bail!("TOXGATE_MAX_FEATURES must be greater than zero");
        }

        Ok(Self {
            ledger_path: env::var("TOXGATE_LEDGER_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_LEDGER_PATH)),
            model_dir: env::var("TOXGATE_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_model_dir()),
            max_features,
        })
    }

    /// Check that a trained model has been published.
    /// Call this before any operation that needs to classify text.
    pub fn require_model(&self) -> Result<()> {
        if !ModelStore::new(&self.model_dir).artifacts_present() {
            anyhow::bail!(
                "No trained model found in {}\n\
                 Run `toxgate train <corpus.csv>` first.",
                self.model_dir.display()
            );
        }
        Ok(())
    }
}

/// Platform data directory, e.g. ~/.local/share/toxgate/models on Linux.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("toxgate")
        .join("models")
}
