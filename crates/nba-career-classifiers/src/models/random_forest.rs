use log::{debug, trace};
use ndarray::{Array1, Array2};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ClassifierFamily, ForestParams, ModelConfig, ModelType};
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::{check_training_data, check_width, Classifier};
use crate::models::decision_tree::DecisionTree;

/// Bagged ensemble of gini trees.
///
/// With `balanced` set, every tree is grown on a bootstrap that draws the
/// same number of rows from each class (the minority class count), the way
/// a balanced random forest under-samples the majority class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    params: ForestParams,
    random_state: u64,
    balanced: bool,
    trees: Vec<DecisionTree>,
    n_features: Option<usize>,
}

impl RandomForestClassifier {
    pub fn new(config: ModelConfig) -> Result<Self> {
        let (params, balanced) = match config.model_type {
            ModelType::RandomForest(p) => (p, false),
            ModelType::BalancedRandomForest(p) => (p, true),
            other => {
                return Err(ClassifierError::InvalidParameter(format!(
                    "expected forest parameters, got {}",
                    other.family()
                )))
            }
        };
        if params.n_estimators == 0 {
            return Err(ClassifierError::InvalidParameter(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            params,
            random_state: config.random_state,
            balanced,
            trees: Vec::new(),
            n_features: None,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    fn bootstrap(&self, y: &Array1<u8>, rng: &mut ChaCha8Rng) -> Vec<usize> {
        let n_samples = y.len();
        if self.balanced {
            let (negatives, positives): (Vec<usize>, Vec<usize>) =
                (0..n_samples).partition(|&i| y[i] == 0);
            let per_class = negatives.len().min(positives.len());
            if per_class > 0 {
                let mut sample = Vec::with_capacity(2 * per_class);
                for class_indices in [&negatives, &positives] {
                    sample.extend(
                        (0..per_class).map(|_| class_indices[rng.gen_range(0..class_indices.len())]),
                    );
                }
                return sample;
            }
        }
        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<u8>) -> Result<()> {
        check_training_data(x, y)?;
        let n_features = x.ncols();
        let max_features = self.params.max_features.resolve(n_features);
        debug!(
            "Fitting {} with {} trees on {} rows ({} features per split)",
            self.name(),
            self.params.n_estimators,
            x.nrows(),
            max_features
        );

        let this = &*self;
        let trees: Vec<DecisionTree> = (0..this.params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let seed = this.random_state.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let sample = this.bootstrap(y, &mut rng);

                let mut tree = DecisionTree::default()
                    .with_max_depth(this.params.max_depth)
                    .with_min_samples_split(this.params.min_samples_split)
                    .with_min_samples_leaf(this.params.min_samples_leaf)
                    .with_max_features(max_features);
                tree.fit_indices(x, y, &sample, &mut rng);
                trace!("tree {} grown to depth {}", tree_idx, tree.depth());
                tree
            })
            .collect();

        self.trees = trees;
        self.n_features = Some(n_features);
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(self.n_features, x)?;
        let n_trees = self.trees.len() as f64;
        let proba = x
            .outer_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect::<Vec<f64>>();
        Ok(Array1::from_vec(proba))
    }

    fn name(&self) -> &str {
        if self.balanced {
            "BalancedRandomForestClassifier"
        } else {
            "RandomForestClassifier"
        }
    }

    fn family(&self) -> Option<ClassifierFamily> {
        Some(if self.balanced {
            ClassifierFamily::BalancedRandomForest
        } else {
            ClassifierFamily::RandomForest
        })
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        if self.n_features.is_none() {
            return Err(ClassifierError::NotFitted);
        }
        Ok(serde_json::to_value(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn blobs() -> (Array2<f64>, Array1<u8>) {
        let x = array![
            [0.1, 1.0],
            [0.3, 0.8],
            [0.2, 1.2],
            [0.4, 0.9],
            [0.5, 1.1],
            [2.1, 3.0],
            [2.3, 3.2],
            [2.2, 2.9],
            [2.6, 3.1],
            [2.4, 2.8],
        ];
        let y = array![0u8, 0, 0, 0, 0, 1, 1, 1, 1, 1];
        (x, y)
    }

    fn forest_config(balanced: bool) -> ModelConfig {
        let params = ForestParams {
            n_estimators: 15,
            ..ForestParams::default()
        };
        let model_type = if balanced {
            ModelType::BalancedRandomForest(params)
        } else {
            ModelType::RandomForest(params)
        };
        ModelConfig::new(model_type).with_random_state(7)
    }

    #[test]
    fn test_forest_learns_separable_blobs() {
        let (x, y) = blobs();
        let mut rf = RandomForestClassifier::new(forest_config(false)).unwrap();
        rf.fit(&x, &y).unwrap();
        assert_eq!(rf.n_trees(), 15);

        let preds = rf.predict(&x).unwrap();
        assert_eq!(preds, y);
        let proba = rf.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_same_seed_same_probabilities() {
        let (x, y) = blobs();
        let mut a = RandomForestClassifier::new(forest_config(true)).unwrap();
        let mut b = RandomForestClassifier::new(forest_config(true)).unwrap();
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict_proba(&x).unwrap(), b.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_balanced_bootstrap_draws_equal_classes() {
        let y = array![0u8, 0, 0, 0, 0, 0, 0, 1, 1, 1];
        let rf = RandomForestClassifier::new(forest_config(true)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let sample = rf.bootstrap(&y, &mut rng);
        assert_eq!(sample.len(), 6);
        assert_eq!(sample.iter().filter(|&&i| y[i] == 1).count(), 3);
    }

    #[test]
    fn test_predict_before_fit_errors() {
        let (x, _) = blobs();
        let rf = RandomForestClassifier::new(forest_config(false)).unwrap();
        assert!(matches!(rf.predict_proba(&x), Err(ClassifierError::NotFitted)));
    }

    #[test]
    fn test_width_mismatch_errors() {
        let (x, y) = blobs();
        let mut rf = RandomForestClassifier::new(forest_config(false)).unwrap();
        rf.fit(&x, &y).unwrap();
        let narrow = array![[0.1]];
        assert!(matches!(
            rf.predict_proba(&narrow),
            Err(ClassifierError::ShapeMismatch { .. })
        ));
    }
}
