// Process-wide handle to the current model.
//
// The pair is loaded from disk at most once and shared as Arc<ToxicityModel>.
// Sessions clone the Arc when they start and keep classifying with it even if
// a retrain swaps the cache underneath them. A training run that was handed
// the cache installs its model via `replace` right after publishing it.

use std::sync::{Arc, RwLock};

use anyhow::Result;
use tracing::info;

use super::store::ModelStore;
use super::ToxicityModel;
use crate::classifier::traits::ToxicityClassifier;

pub struct ModelCache {
    store: ModelStore,
    current: RwLock<Option<Arc<ToxicityModel>>>,
}

impl ModelCache {
    pub fn new(store: ModelStore) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    /// The cached model, loading it on first use.
    pub fn get(&self) -> Result<Arc<ToxicityModel>> {
        {
            let guard = self
                .current
                .read()
                .map_err(|e| anyhow::anyhow!("Model cache lock poisoned: {}", e))?;
            if let Some(model) = guard.as_ref() {
                return Ok(Arc::clone(model));
            }
        }

        let mut guard = self
            .current
            .write()
            .map_err(|e| anyhow::anyhow!("Model cache lock poisoned: {}", e))?;
        // Another caller may have loaded it while we waited for the write lock
        if let Some(model) = guard.as_ref() {
            return Ok(Arc::clone(model));
        }

        let model = Arc::new(self.store.load()?);
        info!(run_id = model.run_id(), "Loaded toxicity model");
        *guard = Some(Arc::clone(&model));
        Ok(model)
    }

    /// Install a model that was just published by a training run.
    pub fn replace(&self, model: ToxicityModel) -> Result<Arc<ToxicityModel>> {
        let model = Arc::new(model);
        let mut guard = self
            .current
            .write()
            .map_err(|e| anyhow::anyhow!("Model cache lock poisoned: {}", e))?;
        *guard = Some(Arc::clone(&model));
        info!(run_id = model.run_id(), "Model cache refreshed");
        Ok(model)
    }

    pub fn is_loaded(&self) -> bool {
        self.current.read().map(|g| g.is_some()).unwrap_or(false)
    }
}

/// Classifies with the cached model, loading it only when first needed.
///
/// Handy for ledger reads, where a model is only required if some row still
/// lacks a label.
impl ToxicityClassifier for ModelCache {
    fn is_toxic(&self, text: &str) -> Result<bool> {
        self.get()?.is_toxic(text)
    }
}
