//! nba-career-classifiers: evaluation and tuning of NBA career classifiers.
//!
//! Given rookie-season statistics, the crate predicts whether a player's
//! career lasts five years or more (class 1). It provides model wrappers
//! (SVC, random forests, gradient boosting), seeded k-fold partitioning,
//! grid and adaptive hyper-parameter search, a cross-validated evaluator
//! with fold-averaged and pooled metrics, and single-player prediction.
//!
//! Models implement the `Classifier` trait, so the evaluator also accepts
//! user supplied classifiers through `CrossValidatedEvaluator::evaluate_with`.
pub mod config;
pub mod cross_validation;
pub mod data_handling;
pub mod error;
pub mod evaluator;
pub mod inference;
pub mod io;
pub mod metrics;
pub mod models;
pub mod preprocessing;
pub mod report;
pub mod search;

pub use error::{ClassifierError, Result};
