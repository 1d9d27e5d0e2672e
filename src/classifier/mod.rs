// Binary toxicity classification.
//
// The ToxicityClassifier trait is what the rest of the crate classifies
// through. The fitted model (features + logistic regression) implements it,
// and tests swap in stubs without touching the ledger or workflow code.

pub mod logistic;
pub mod traits;
