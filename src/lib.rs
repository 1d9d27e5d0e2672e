// Toxgate: toxicity-gated comment moderation
//
// This is the library root. Each module corresponds to a major subsystem:
// text features and the classifier, the training pipeline and model store,
// the comment ledger, and the per-submission moderation workflow.

pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod ledger;
pub mod model;
pub mod moderation;
pub mod output;
pub mod profile;
pub mod report;
pub mod status;
pub mod training;
