use crate::config::{ModelConfig, ModelType};
use crate::error::Result;
use crate::models::classifier_trait::Classifier;
use crate::models::gbdt::GradientBoostingClassifier;
use crate::models::random_forest::RandomForestClassifier;
use crate::models::svm::SvcClassifier;

/// Build a fresh, unfitted classifier from a `ModelConfig`.
pub fn build_model(config: ModelConfig) -> Result<Box<dyn Classifier>> {
    Ok(match config.model_type {
        ModelType::Svc(_) => Box::new(SvcClassifier::new(config)?),
        ModelType::RandomForest(_) | ModelType::BalancedRandomForest(_) => {
            Box::new(RandomForestClassifier::new(config)?)
        }
        ModelType::GradientBoosting(_) => Box::new(GradientBoostingClassifier::new(config)?),
    })
}
