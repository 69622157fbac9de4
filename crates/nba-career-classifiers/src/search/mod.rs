//! Hyperparameter search: declared spaces, exhaustive grids and adaptive
//! history-informed search, all scored by cross-validated F1 on class 1.

pub mod adaptive;
pub mod grid;
pub mod space;

use ndarray::Array1;

use crate::config::ModelConfig;
use crate::cross_validation::{CrossValidator, FoldPolicy};
use crate::data_handling::Dataset;
use crate::error::Result;
use crate::metrics::ConfusionMatrix;
use crate::models::classifier_trait::Classifier;
use crate::models::factory::build_model;

/// Fit a fresh classifier built from `config` on `train`.
pub(crate) fn fit_model(config: &ModelConfig, train: &Dataset) -> Result<Box<dyn Classifier>> {
    let mut model = build_model(config.clone())?;
    model.fit(&train.x, &train.y)?;
    Ok(model)
}

/// Fit on `train` and return hard predictions for `test`.
pub(crate) fn fit_predict(
    config: &ModelConfig,
    train: &Dataset,
    test: &Dataset,
) -> Result<Array1<u8>> {
    fit_model(config, train)?.predict(&test.x)
}

/// Mean F1 (positive label 1) of `config` over `num_folds` folds of `dataset`.
pub fn cross_val_f1(
    dataset: &Dataset,
    config: &ModelConfig,
    num_folds: usize,
    policy: FoldPolicy,
    seed: u64,
) -> Result<f64> {
    let folds = CrossValidator::new(policy, num_folds)
        .with_seed(seed)
        .split(&dataset.y)?;
    let mut total = 0.0;
    for fold in &folds {
        let train = dataset.select(&fold.train_indices);
        let test = dataset.select(&fold.test_indices);
        let predicted = fit_predict(config, &train, &test)?;
        total += ConfusionMatrix::from_arrays(&test.y, &predicted).f1(1);
    }
    Ok(total / folds.len() as f64)
}
