// Ledger trait, backend-agnostic async interface for comment storage.

use anyhow::Result;
use async_trait::async_trait;

use super::models::{Comment, NewComment};
use crate::classifier::traits::ToxicityClassifier;

#[async_trait]
pub trait CommentLedger: Send + Sync {
    /// Add exactly one row, stamped with the current local time.
    ///
    /// Concurrent calls on the same ledger are serialized; none of the rows
    /// is lost.
    async fn append(&self, comment: NewComment) -> Result<Comment>;

    /// Every stored row, oldest first.
    ///
    /// Rows without a usable label are classified with `classifier` and the
    /// labels are written back, so later loads do not classify them again.
    /// A ledger that does not exist yet is empty, not an error.
    async fn load_all(&self, classifier: &dyn ToxicityClassifier) -> Result<Vec<Comment>>;

    /// Number of stored rows, without backfilling.
    async fn count(&self) -> Result<usize>;
}
