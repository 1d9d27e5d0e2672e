// Held-out evaluation: accuracy plus per-class precision / recall / F1.
//
// Division by zero yields 0.0 for the affected metric.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    /// None when the evaluation partition was empty
    pub accuracy: Option<f64>,
    pub non_toxic: ClassMetrics,
    pub toxic: ClassMetrics,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl EvaluationReport {
    /// Compare predictions with ground truth (true = toxic).
    pub fn evaluate(truth: &[bool], predicted: &[bool]) -> Self {
        let pairs: Vec<(bool, bool)> = truth.iter().copied().zip(predicted.iter().copied()).collect();
        let total = pairs.len();

        let correct = pairs.iter().filter(|(t, p)| t == p).count();
        let accuracy = (total > 0).then(|| correct as f64 / total as f64);

        let toxic = class_metrics(&pairs, true);
        let non_toxic = class_metrics(&pairs, false);

        let macro_avg = ClassMetrics {
            precision: (toxic.precision + non_toxic.precision) / 2.0,
            recall: (toxic.recall + non_toxic.recall) / 2.0,
            f1: (toxic.f1 + non_toxic.f1) / 2.0,
            support: total,
        };

        let weight = |a: f64, b: f64| {
            if total == 0 {
                0.0
            } else {
                (a * non_toxic.support as f64 + b * toxic.support as f64) / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weight(non_toxic.precision, toxic.precision),
            recall: weight(non_toxic.recall, toxic.recall),
            f1: weight(non_toxic.f1, toxic.f1),
            support: total,
        };

        Self {
            accuracy,
            non_toxic,
            toxic,
            macro_avg,
            weighted_avg,
        }
    }

    pub fn eval_size(&self) -> usize {
        self.macro_avg.support
    }
}

fn class_metrics(pairs: &[(bool, bool)], class: bool) -> ClassMetrics {
    let tp = pairs.iter().filter(|&&(t, p)| t == class && p == class).count();
    let fp = pairs.iter().filter(|&&(t, p)| t != class && p == class).count();
    let fn_ = pairs.iter().filter(|&&(t, p)| t == class && p != class).count();

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    ClassMetrics {
        precision,
        recall,
        f1,
        support: tp + fn_,
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (name, m) in [("non-toxic", &self.non_toxic), ("toxic", &self.toxic)] {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        match self.accuracy {
            Some(acc) => writeln!(
                f,
                "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
                "accuracy",
                "",
                "",
                acc,
                self.eval_size()
            )?,
            None => writeln!(f, "{:>12} {:>9}", "accuracy", "n/a")?,
        }
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}
