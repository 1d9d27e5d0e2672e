// Classifier trait, the seam between inference and its consumers.

use anyhow::Result;

/// Anything that can label a comment as toxic or not.
///
/// Implementations are synchronous: inference is local and bounded. The
/// answer is a label, never a probability.
pub trait ToxicityClassifier: Send + Sync {
    fn is_toxic(&self, text: &str) -> Result<bool>;

    /// Label several texts, in order. Stops at the first failure.
    fn is_toxic_batch(&self, texts: &[String]) -> Result<Vec<bool>> {
        texts.iter().map(|t| self.is_toxic(t)).collect()
    }
}
