//! Exhaustive search over an explicit parameter grid.

use std::collections::BTreeMap;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ClassifierFamily, ModelConfig};
use crate::cross_validation::FoldPolicy;
use crate::data_handling::Dataset;
use crate::error::{ClassifierError, Result};
use crate::search::cross_val_f1;
use crate::search::space::{format_params, ParamSet, ParamValue};

/// Candidate values per parameter.
///
/// Combinations enumerate parameters by name, the last name varying fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamGrid {
    params: BTreeMap<String, Vec<ParamValue>>,
}

impl ParamGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ParamValue>,
    {
        self.params
            .insert(name.to_string(), values.into_iter().map(Into::into).collect());
        self
    }

    /// A small grid around the defaults of `family`.
    pub fn default_for(family: ClassifierFamily) -> Self {
        match family {
            ClassifierFamily::Svc => ParamGrid::new()
                .with("C", [0.1, 1.0, 10.0])
                .with(
                    "gamma",
                    [ParamValue::from("scale"), ParamValue::Float(0.01)],
                ),
            ClassifierFamily::RandomForest | ClassifierFamily::BalancedRandomForest => {
                ParamGrid::new()
                    .with("n_estimators", [100i64, 300])
                    .with(
                        "max_depth",
                        [ParamValue::Int(5), ParamValue::Int(10), ParamValue::None],
                    )
            }
            ClassifierFamily::GradientBoosting => ParamGrid::new()
                .with("n_estimators", [100i64, 300])
                .with("max_depth", [3i64, 5])
                .with("learning_rate", [0.05, 0.1]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of combinations.
    pub fn len(&self) -> usize {
        if self.params.is_empty() {
            return 0;
        }
        self.params.values().map(Vec::len).product()
    }

    /// Every combination of the grid, in enumeration order.
    pub fn combinations(&self) -> Vec<ParamSet> {
        if self.params.is_empty() {
            return Vec::new();
        }
        let mut combos = vec![ParamSet::new()];
        for (name, values) in &self.params {
            combos = combos
                .into_iter()
                .flat_map(|combo| {
                    values.iter().map(move |value| {
                        let mut next = combo.clone();
                        next.insert(name.clone(), value.clone());
                        next
                    })
                })
                .collect();
        }
        combos
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSearchResult {
    pub best_params: ParamSet,
    pub best_config: ModelConfig,
    pub best_score: f64,
    /// Mean inner F1 of every combination, in enumeration order.
    pub scores: Vec<(ParamSet, f64)>,
}

/// Inner cross-validated grid search around a base configuration.
#[derive(Debug, Clone)]
pub struct GridSearch {
    pub base: ModelConfig,
    pub grid: ParamGrid,
    pub num_folds: usize,
    pub policy: FoldPolicy,
    pub seed: u64,
    /// Worker threads, all cores when `None`.
    pub n_jobs: Option<usize>,
}

impl GridSearch {
    pub fn new(base: ModelConfig, grid: ParamGrid) -> Self {
        Self {
            base,
            grid,
            num_folds: 5,
            policy: FoldPolicy::Stratified,
            seed: 42,
            n_jobs: None,
        }
    }

    pub fn with_folds(mut self, num_folds: usize, policy: FoldPolicy, seed: u64) -> Self {
        self.num_folds = num_folds;
        self.policy = policy;
        self.seed = seed;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// Score every combination on `dataset` and keep the best one.
    ///
    /// Ties go to the combination enumerated first.
    pub fn fit(&self, dataset: &Dataset) -> Result<GridSearchResult> {
        let combos = self.grid.combinations();
        if combos.is_empty() {
            return Err(ClassifierError::InvalidParameter(
                "parameter grid has no combinations".to_string(),
            ));
        }
        let configs = combos
            .iter()
            .map(|params| {
                Ok(ModelConfig {
                    model_type: self.base.model_type.with_params(params)?,
                    ..self.base.clone()
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Fitting {} folds for each of {} candidates, totalling {} fits",
            self.num_folds,
            configs.len(),
            self.num_folds * configs.len()
        );

        let score_all = || {
            configs
                .par_iter()
                .map(|config| cross_val_f1(dataset, config, self.num_folds, self.policy, self.seed))
                .collect::<Result<Vec<f64>>>()
        };
        let scores = match self.n_jobs {
            None => score_all()?,
            Some(n) => rayon::ThreadPoolBuilder::new()
                .num_threads(n.max(1))
                .build()
                .map_err(|e| ClassifierError::InvalidParameter(e.to_string()))?
                .install(score_all)?,
        };

        let mut best_idx = 0;
        for (idx, score) in scores.iter().enumerate() {
            debug!("{} -> mean f1 {:.4}", format_params(&combos[idx]), score);
            if *score > scores[best_idx] {
                best_idx = idx;
            }
        }

        Ok(GridSearchResult {
            best_params: combos[best_idx].clone(),
            best_config: configs[best_idx].clone(),
            best_score: scores[best_idx],
            scores: combos.into_iter().zip(scores).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combinations_order() {
        let grid = ParamGrid::new()
            .with("n_estimators", [100i64, 200])
            .with("max_depth", [ParamValue::Int(3), ParamValue::None]);
        let combos = grid.combinations();
        assert_eq!(grid.len(), 4);
        assert_eq!(combos.len(), 4);
        // max_depth sorts first, n_estimators varies fastest.
        assert_eq!(combos[0]["max_depth"], ParamValue::Int(3));
        assert_eq!(combos[0]["n_estimators"], ParamValue::Int(100));
        assert_eq!(combos[1]["max_depth"], ParamValue::Int(3));
        assert_eq!(combos[1]["n_estimators"], ParamValue::Int(200));
        assert_eq!(combos[2]["max_depth"], ParamValue::None);
    }

    #[test]
    fn test_empty_grid_has_no_combinations() {
        assert!(ParamGrid::new().combinations().is_empty());
        let grid = ParamGrid::new().with("C", Vec::<f64>::new());
        assert!(grid.combinations().is_empty());
    }

    #[test]
    fn test_grid_json_form() {
        let grid: ParamGrid =
            serde_json::from_str(r#"{"max_depth": [5, null], "max_features": ["sqrt"]}"#).unwrap();
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_ties_go_to_first_combination() {
        let rows: Vec<Vec<f64>> = (0..24)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect();
        let labels: Vec<u8> = (0..24).map(|i| u8::from(i % 3 != 0)).collect();
        let dataset = Dataset::from_rows(&rows, &labels).unwrap();

        // Trees never get deep enough for the depth limit to matter, so
        // both candidates produce identical forests and identical scores.
        let base = ModelConfig::new(crate::config::ModelType::RandomForest(
            crate::config::ForestParams {
                n_estimators: 5,
                ..Default::default()
            },
        ));
        let grid = ParamGrid::new().with("max_depth", [ParamValue::None, ParamValue::Int(60)]);
        let result = GridSearch::new(base, grid)
            .with_folds(3, FoldPolicy::Stratified, 0)
            .with_n_jobs(Some(2))
            .fit(&dataset)
            .unwrap();

        assert_eq!(result.scores.len(), 2);
        assert_eq!(result.scores[0].1, result.scores[1].1);
        assert_eq!(result.best_params["max_depth"], ParamValue::None);
    }

    #[test]
    fn test_best_scoring_combination_wins() {
        // Alternating blocks of ten along one feature; a stump cannot follow them.
        let rows: Vec<Vec<f64>> = (0..60).map(|i| vec![i as f64]).collect();
        let labels: Vec<u8> = (0..60).map(|i| u8::from((i / 10) % 2 == 1)).collect();
        let dataset = Dataset::from_rows(&rows, &labels).unwrap();

        let base = ModelConfig::new(crate::config::ModelType::RandomForest(
            crate::config::ForestParams {
                n_estimators: 10,
                ..Default::default()
            },
        ));
        let grid = ParamGrid::new().with("max_depth", [ParamValue::Int(1), ParamValue::None]);
        let result = GridSearch::new(base, grid)
            .with_folds(3, FoldPolicy::Stratified, 7)
            .fit(&dataset)
            .unwrap();

        let max_score = result
            .scores
            .iter()
            .map(|(_, score)| *score)
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(result.best_params["max_depth"], ParamValue::None);
        assert_eq!(result.best_score, max_score);
        assert!(result.scores[1].1 > result.scores[0].1);
    }

    #[test]
    fn test_default_grids_apply_to_their_family() {
        for family in ClassifierFamily::ALL {
            let base = ModelConfig::new(crate::config::ModelType::default_for(family));
            for params in ParamGrid::default_for(family).combinations() {
                base.model_type.with_params(&params).unwrap();
            }
        }
    }
}
