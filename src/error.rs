// Domain error taxonomy.
//
// Most functions return anyhow::Result so context can be layered on as errors
// bubble up. These variants mark the failures callers need to tell apart, and
// are recovered with `err.downcast_ref::<ModerationError>()`.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModerationError {
    /// Model files are absent. Inference must halt until training runs.
    #[error("model artifact not found: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    /// Extractor and classifier on disk come from different training runs.
    #[error("artifact pair mismatch: extractor from run {extractor_run}, classifier from run {classifier_run}")]
    ArtifactMismatch {
        extractor_run: String,
        classifier_run: String,
    },

    #[error("invalid training data: {0}")]
    InvalidTrainingData(String),

    #[error("training set is empty after dropping rows without text or label")]
    EmptyTrainingSet,

    /// A single field of a stored ledger row could not be parsed. The row is
    /// kept with that field degraded, so this is only ever logged.
    #[error("malformed ledger row {line}: bad {field} value {value:?}")]
    MalformedPersistedRow {
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("comment text is empty")]
    EmptyComment,

    #[error("cannot apply {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
}

/// True if `err` (or anything in its chain) is the given domain error kind.
pub fn is_kind(err: &anyhow::Error, pred: impl Fn(&ModerationError) -> bool) -> bool {
    err.chain()
        .filter_map(|e| e.downcast_ref::<ModerationError>())
        .any(pred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_is_kind_sees_through_context() {
        let err: anyhow::Result<()> = Err(ModerationError::EmptyTrainingSet.into());
        let err = err.context("training failed").unwrap_err();
        assert!(is_kind(&err, |e| matches!(e, ModerationError::EmptyTrainingSet)));
        assert!(!is_kind(&err, |e| matches!(e, ModerationError::EmptyComment)));
    }

    #[test]
    fn test_artifact_missing_message_names_path() {
        let err = ModerationError::ArtifactMissing {
            path: PathBuf::from("/tmp/models/CURRENT"),
        };
        assert!(err.to_string().contains("/tmp/models/CURRENT"));
    }
}
