//! Error type shared by every module of the crate.

use thiserror::Error;

/// Errors raised while loading data, partitioning, tuning or fitting models.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid {name} '{value}'. Choose one of: {expected}")]
    InvalidChoice {
        name: String,
        value: String,
        expected: String,
    },

    #[error("Hyperparameter tuning for {0} is not supported")]
    UnsupportedFamily(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    #[error("Invalid label {0}: labels must be 0 or 1")]
    InvalidLabel(f64),

    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Saving {0} models is not supported")]
    UnsupportedPersistence(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClassifierError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ClassifierError::InvalidParameter("num_folds must be at least 2".to_string());
        assert!(err.to_string().contains("num_folds"));

        let err = ClassifierError::InvalidChoice {
            name: "kfold_type".to_string(),
            value: "loo".to_string(),
            expected: "kfold, stratified".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("kfold_type"));
        assert!(msg.contains("loo"));

        let err = ClassifierError::UnsupportedFamily("KNeighborsClassifier".to_string());
        assert!(err.to_string().contains("KNeighborsClassifier is not supported"));

        let err = ClassifierError::InvalidLabel(2.0);
        assert!(err.to_string().contains("must be 0 or 1"));
    }
}
