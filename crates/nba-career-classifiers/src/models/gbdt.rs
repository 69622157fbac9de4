use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use log::debug;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::config::{BoostingParams, ClassifierFamily, ModelConfig, ModelType};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::{check_training_data, check_width, Classifier};

/// Gradient boosted trees with a logistic loss.
#[derive(Serialize, Deserialize)]
pub struct GradientBoostingClassifier {
    params: BoostingParams,
    model: Option<GBDT>,
    n_features: Option<usize>,
}

impl GradientBoostingClassifier {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let params = match config.model_type {
            ModelType::GradientBoosting(p) => p,
            other => {
                return Err(ClassifierError::InvalidParameter(format!(
                    "expected gradient boosting parameters, got {}",
                    other.family()
                )))
            }
        };
        if !(params.subsample > 0.0 && params.subsample <= 1.0)
            || !(params.colsample_bytree > 0.0 && params.colsample_bytree <= 1.0)
        {
            return Err(ClassifierError::InvalidParameter(
                "subsample and colsample_bytree must lie in (0, 1]".to_string(),
            ));
        }
        Ok(Self {
            params,
            model: None,
            n_features: None,
        })
    }

    fn config(&self, feature_size: usize) -> Config {
        let mut config = Config::new();
        config.set_feature_size(feature_size);
        config.set_shrinkage(self.params.learning_rate);
        config.set_max_depth(self.params.max_depth);
        config.set_iterations(self.params.n_estimators);
        config.set_data_sample_ratio(self.params.subsample);
        config.set_feature_sample_ratio(self.params.colsample_bytree);
        config.set_debug(false);
        config.set_training_optimization_level(2);
        config.set_loss("LogLikelyhood");
        config
    }
}

fn row_features(x: &Array2<f64>, row: usize) -> Vec<f32> {
    x.row(row).iter().map(|&v| v as f32).collect()
}

impl Classifier for GradientBoostingClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<u8>) -> Result<()> {
        check_training_data(x, y)?;
        let feature_size = x.ncols();
        let mut gbdt = GBDT::new(&self.config(feature_size));

        // LogLikelyhood expects -1/1 labels.
        let mut train_x = DataVec::new();
        for (row, &label) in y.iter().enumerate() {
            let target = if label == 1 { 1.0 } else { -1.0 };
            train_x.push(Data::new_training_data(
                row_features(x, row),
                1.0,
                target,
                None,
            ));
        }

        debug!(
            "Fitting GBDT: {} rounds, depth {}, shrinkage {}",
            self.params.n_estimators, self.params.max_depth, self.params.learning_rate
        );
        gbdt.fit(&mut train_x);

        self.model = Some(gbdt);
        self.n_features = Some(feature_size);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(self.n_features, x)?;
        let model = self.model.as_ref().ok_or(ClassifierError::NotFitted)?;

        let mut test_x = DataVec::new();
        for row in 0..x.nrows() {
            test_x.push(Data::new_test_data(row_features(x, row), None));
        }
        let predictions = model.predict(&test_x);
        Ok(predictions
            .into_iter()
            .map(|p| (p as f64).clamp(0.0, 1.0))
            .collect())
    }

    fn name(&self) -> &str {
        "GradientBoostingClassifier"
    }

    fn family(&self) -> Option<ClassifierFamily> {
        Some(ClassifierFamily::GradientBoosting)
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        if self.model.is_none() {
            return Err(ClassifierError::NotFitted);
        }
        Ok(serde_json::to_value(self)?)
    }
}
