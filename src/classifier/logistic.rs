// L2-regularized logistic regression over sparse TF-IDF vectors.
//
// Objective (scaled by 1/n so the step size does not depend on corpus size):
//
//   J(w, b) = mean(log_loss(x_i, y_i)) + ||w||^2 / (2 * C * n)
//
// The intercept is not penalized. Fitting is full-batch gradient descent with
// a fixed step of 1/L, where L bounds the gradient's Lipschitz constant. With
// unit-length inputs that bound is cheap to compute and the descent is
// monotone, so no line search is needed.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ModerationError;
use crate::features::vector::SparseVector;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticConfig {
    /// Inverse regularization strength (larger = weaker penalty)
    pub c: f64,
    pub max_iter: usize,
    /// Stop once every gradient component is below this
    pub tolerance: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 1000,
            tolerance: 1e-4,
        }
    }
}

/// A fitted binary decision function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    intercept: f64,
    iterations: usize,
    converged: bool,
}

impl LogisticRegression {
    /// Fit on `vectors` with boolean `labels` (true = toxic).
    pub fn fit(vectors: &[SparseVector], labels: &[bool], config: &LogisticConfig) -> Result<Self> {
        if vectors.is_empty() {
            return Err(invalid("no training vectors"));
        }
        if vectors.len() != labels.len() {
            return Err(invalid(&format!(
                "{} vectors but {} labels",
                vectors.len(),
                labels.len()
            )));
        }
        let positives = labels.iter().filter(|&&y| y).count();
        if positives == 0 || positives == labels.len() {
            return Err(invalid("labels must contain both toxic and non-toxic examples"));
        }

        let dim = vectors[0].dim();
        if let Some(bad) = vectors.iter().find(|v| v.dim() != dim) {
            return Err(invalid(&format!(
                "vector dimension mismatch: expected {dim}, got {}",
                bad.dim()
            )));
        }
        if config.c <= 0.0 {
            return Err(invalid("regularization strength C must be positive"));
        }

        let n = vectors.len() as f64;
        let penalty = 1.0 / (config.c * n);
        let max_sq_norm = vectors
            .iter()
            .map(|v| v.norm().powi(2))
            .fold(0.0_f64, f64::max);
        let lipschitz = 0.25 * (max_sq_norm + 1.0) + penalty;
        let step = 1.0 / lipschitz;

        let mut weights = vec![0.0; dim];
        let mut intercept = 0.0;
        let mut grad_w = vec![0.0; dim];
        let mut iterations = 0;
        let mut converged = false;

        while iterations < config.max_iter {
            iterations += 1;

            grad_w.iter_mut().for_each(|g| *g = 0.0);
            let mut grad_b = 0.0;

            for (x, &y) in vectors.iter().zip(labels) {
                let p = sigmoid(x.dot(&weights) + intercept);
                let residual = p - if y { 1.0 } else { 0.0 };
                for (i, v) in x.iter() {
                    grad_w[i] += residual * v;
                }
                grad_b += residual;
            }

            let mut max_grad = (grad_b / n).abs();
            for (g, w) in grad_w.iter_mut().zip(&weights) {
                *g = *g / n + penalty * w;
                max_grad = max_grad.max(g.abs());
            }

            if max_grad < config.tolerance {
                converged = true;
                break;
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= step * g;
            }
            intercept -= step * grad_b / n;
        }

        if converged {
            debug!(iterations, "Logistic regression converged");
        }
        info!(
            samples = vectors.len(),
            features = dim,
            iterations,
            converged,
            "Fitted logistic regression"
        );

        Ok(Self {
            weights,
            intercept,
            iterations,
            converged,
        })
    }

    /// Signed distance from the decision boundary. Positive means toxic.
    pub fn decision_function(&self, x: &SparseVector) -> f64 {
        x.dot(&self.weights) + self.intercept
    }

    pub fn predict(&self, x: &SparseVector) -> bool {
        self.decision_function(x) > 0.0
    }

    pub fn predict_batch(&self, xs: &[SparseVector]) -> Vec<bool> {
        xs.iter().map(|x| self.predict(x)).collect()
    }

    pub fn dim(&self) -> usize {
        self.weights.len()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

fn invalid(reason: &str) -> anyhow::Error {
    ModerationError::InvalidTrainingData(reason.to_string()).into()
}

/// Sigmoid activation, written to avoid overflow for large |x|.
fn sigmoid(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dim: usize, index: usize) -> SparseVector {
        SparseVector::from_pairs(dim, vec![(index, 1.0)])
    }

    #[test]
    fn test_sigmoid_zero() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_sigmoid_extremes_do_not_overflow() {
        assert!(sigmoid(800.0) <= 1.0 && sigmoid(800.0) > 0.999);
        assert!(sigmoid(-800.0) >= 0.0 && sigmoid(-800.0) < 0.001);
    }

    #[test]
    fn test_sigmoid_symmetry() {
        for x in [0.5, 1.0, 2.0, 5.0] {
            assert!((sigmoid(x) + sigmoid(-x) - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_separates_one_hot_features() {
        let xs = vec![unit(3, 0), unit(3, 0), unit(3, 1), unit(3, 1)];
        let ys = vec![false, false, true, true];
        let model = LogisticRegression::fit(&xs, &ys, &LogisticConfig::default()).unwrap();

        assert!(!model.predict(&unit(3, 0)));
        assert!(model.predict(&unit(3, 1)));
        assert_eq!(model.dim(), 3);
    }

    #[test]
    fn test_zero_vector_follows_majority_via_intercept() {
        let xs = vec![
            SparseVector::zeros(2),
            SparseVector::zeros(2),
            SparseVector::zeros(2),
            unit(2, 1),
        ];
        let ys = vec![false, false, false, true];
        let model = LogisticRegression::fit(&xs, &ys, &LogisticConfig::default()).unwrap();

        assert!(model.intercept() < 0.0);
        assert!(!model.predict(&SparseVector::zeros(2)));
    }

    #[test]
    fn test_single_label_is_rejected() {
        let xs = vec![unit(2, 0), unit(2, 1)];
        let err = LogisticRegression::fit(&xs, &[true, true], &LogisticConfig::default())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ModerationError>(),
            Some(ModerationError::InvalidTrainingData(_))
        ));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let xs = vec![unit(2, 0), unit(2, 1)];
        assert!(LogisticRegression::fit(&xs, &[true], &LogisticConfig::default()).is_err());
    }

    #[test]
    fn test_empty_input_is_rejected() {
        assert!(LogisticRegression::fit(&[], &[], &LogisticConfig::default()).is_err());
    }

    #[test]
    fn test_fit_is_deterministic() {
        let xs = vec![unit(4, 0), unit(4, 2), unit(4, 3), unit(4, 1)];
        let ys = vec![false, true, true, false];
        let a = LogisticRegression::fit(&xs, &ys, &LogisticConfig::default()).unwrap();
        let b = LogisticRegression::fit(&xs, &ys, &LogisticConfig::default()).unwrap();
        assert_eq!(a.weights, b.weights);
        assert_eq!(a.intercept, b.intercept);
    }
}
