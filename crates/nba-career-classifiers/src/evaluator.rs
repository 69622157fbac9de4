//! Cross-validated evaluation of a classifier, with optional tuning.
//!
//! The dataset is partitioned once. Every outer fold gets a fresh classifier
//! that is fitted on the fold's training rows and scored on its test rows.
//! Per-fold scores are averaged over the folds, while the pooled report is
//! computed once over all out-of-fold predictions.
//!
//! Grid tuning re-runs the grid search inside every outer fold. Adaptive
//! tuning searches once on the full dataset and reuses the winner for every
//! fold.

use log::info;
use ndarray::Array1;

use crate::config::{ClassifierFamily, ModelConfig};
use crate::cross_validation::{partition, Fold, FoldPolicy};
use crate::data_handling::Dataset;
use crate::error::Result;
use crate::metrics::{ClassMetrics, ClassificationReport, ConfusionMatrix, FoldMetrics};
use crate::models::classifier_trait::Classifier;
use crate::report::AggregateReport;
use crate::search::adaptive::{AdaptiveSearch, Trial};
use crate::search::grid::{GridSearch, ParamGrid};
use crate::search::space::format_params;
use crate::search::{fit_model, fit_predict};

/// How the configuration of each fold is chosen.
#[derive(Debug, Clone)]
pub enum Tuning {
    Fixed(ModelConfig),
    /// Grid search on every fold's training rows.
    Grid { base: ModelConfig, grid: ParamGrid },
    /// One adaptive search on the full dataset.
    Adaptive {
        family: ClassifierFamily,
        n_trials: usize,
    },
}

/// Result of `CrossValidatedEvaluator::evaluate`.
pub struct EvaluationOutcome {
    pub report: AggregateReport,
    /// Configuration of the refit model, or of every fold for fixed and
    /// adaptive tuning.
    pub best_config: Option<ModelConfig>,
    /// Configuration used on each outer fold.
    pub fold_configs: Vec<ModelConfig>,
    /// Adaptive search history, empty for other tuning modes.
    pub trials: Vec<Trial>,
    /// Best configuration fitted on every row, when refit is enabled.
    pub model: Option<Box<dyn Classifier>>,
}

#[derive(Default)]
struct MetricAccumulator {
    confusion_sum: ConfusionMatrix,
    class_0_sum: ClassMetrics,
    class_1_sum: ClassMetrics,
    folds: Vec<FoldMetrics>,
    pooled_true: Vec<u8>,
    pooled_pred: Vec<u8>,
}

impl MetricAccumulator {
    fn add_fold(&mut self, fold: usize, y_true: &Array1<u8>, y_pred: &Array1<u8>) -> &FoldMetrics {
        let metrics = FoldMetrics::new(fold, ConfusionMatrix::from_arrays(y_true, y_pred));
        self.confusion_sum += metrics.confusion;
        self.class_0_sum += metrics.class_0;
        self.class_1_sum += metrics.class_1;
        self.pooled_true.extend(y_true.iter());
        self.pooled_pred.extend(y_pred.iter());
        self.folds.push(metrics);
        &self.folds[self.folds.len() - 1]
    }

    fn finish(self, fold_policy: FoldPolicy, num_folds: usize) -> AggregateReport {
        let k = num_folds as f64;
        let cm = self.confusion_sum;
        AggregateReport {
            fold_policy,
            num_folds,
            confusion_mean: [
                [cm.true_negative as f64 / k, cm.false_positive as f64 / k],
                [cm.false_negative as f64 / k, cm.true_positive as f64 / k],
            ],
            confusion_sum: cm,
            class_0: self.class_0_sum.scaled(1.0 / k),
            class_1: self.class_1_sum.scaled(1.0 / k),
            pooled: ClassificationReport::new(&self.pooled_true, &self.pooled_pred),
            folds: self.folds,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CrossValidatedEvaluator {
    pub fold_policy: FoldPolicy,
    pub num_folds: usize,
    pub seed: u64,
    /// Fit the best configuration on all rows after scoring.
    pub refit: bool,
    /// Grid search worker threads, all cores when `None`.
    pub n_jobs: Option<usize>,
}

impl Default for CrossValidatedEvaluator {
    fn default() -> Self {
        Self {
            fold_policy: FoldPolicy::Stratified,
            num_folds: 5,
            seed: 42,
            refit: true,
            n_jobs: None,
        }
    }
}

impl CrossValidatedEvaluator {
    pub fn new(fold_policy: FoldPolicy, num_folds: usize, seed: u64) -> Self {
        Self {
            fold_policy,
            num_folds,
            seed,
            ..Self::default()
        }
    }

    pub fn with_refit(mut self, refit: bool) -> Self {
        self.refit = refit;
        self
    }

    pub fn with_n_jobs(mut self, n_jobs: Option<usize>) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    fn folds(&self, dataset: &Dataset) -> Result<Vec<Fold>> {
        partition(
            &dataset.x,
            &dataset.y,
            self.num_folds,
            self.fold_policy,
            self.seed,
        )
    }

    fn grid_search(&self, base: &ModelConfig, grid: &ParamGrid) -> GridSearch {
        GridSearch::new(base.clone(), grid.clone())
            .with_folds(self.num_folds, self.fold_policy, self.seed)
            .with_n_jobs(self.n_jobs)
    }

    /// Run the evaluation loop, calling `predict_fold` for the predictions
    /// of every fold.
    fn run_folds<F>(&self, dataset: &Dataset, mut predict_fold: F) -> Result<AggregateReport>
    where
        F: FnMut(&Fold, &Dataset, &Dataset) -> Result<Array1<u8>>,
    {
        let folds = self.folds(dataset)?;
        let mut acc = MetricAccumulator::default();
        for fold in &folds {
            let train = dataset.select(&fold.train_indices);
            let test = dataset.select(&fold.test_indices);
            let predicted = predict_fold(fold, &train, &test)?;
            let metrics = acc.add_fold(fold.index, &test.y, &predicted);
            info!(
                "Fold {}/{}: f1 (class 1) = {:.4}, f1 (class 0) = {:.4}",
                fold.index + 1,
                folds.len(),
                metrics.class_1.f1,
                metrics.class_0.f1
            );
        }
        let report = acc.finish(self.fold_policy, self.num_folds);
        for line in report.summary().lines() {
            info!("{}", line);
        }
        Ok(report)
    }

    /// Evaluate classifiers produced by `make_classifier`, one per fold.
    ///
    /// Any `Classifier` implementation works here; no tuning is done.
    pub fn evaluate_with<F>(&self, dataset: &Dataset, mut make_classifier: F) -> Result<AggregateReport>
    where
        F: FnMut() -> Box<dyn Classifier>,
    {
        self.run_folds(dataset, |_, train, test| {
            let mut model = make_classifier();
            model.fit(&train.x, &train.y)?;
            model.predict(&test.x)
        })
    }

    pub fn evaluate(&self, dataset: &Dataset, tuning: &Tuning) -> Result<EvaluationOutcome> {
        dataset.log_input_data_summary();
        match tuning {
            Tuning::Fixed(config) => self.evaluate_fixed(dataset, config.clone(), Vec::new()),
            Tuning::Adaptive { family, n_trials } => {
                let mut search = AdaptiveSearch::for_family(*family, self.seed);
                let best = search.optimize(dataset, *n_trials, self.num_folds, self.fold_policy)?;
                let config = search.config_for(&best.params)?;
                self.evaluate_fixed(dataset, config, search.trials().to_vec())
            }
            Tuning::Grid { base, grid } => {
                let mut fold_configs = Vec::with_capacity(self.num_folds);
                let report = self.run_folds(dataset, |fold, train, test| {
                    let result = self.grid_search(base, grid).fit(train)?;
                    info!(
                        "Fold {}: best parameters {} (inner f1 {:.4})",
                        fold.index + 1,
                        format_params(&result.best_params),
                        result.best_score
                    );
                    let predicted = fit_predict(&result.best_config, train, test)?;
                    fold_configs.push(result.best_config);
                    Ok(predicted)
                })?;

                let (best_config, model) = if self.refit {
                    let result = self.grid_search(base, grid).fit(dataset)?;
                    info!(
                        "Refitting on all data with {}",
                        format_params(&result.best_params)
                    );
                    let model = fit_model(&result.best_config, dataset)?;
                    (Some(result.best_config), Some(model))
                } else {
                    (None, None)
                };

                Ok(EvaluationOutcome {
                    report,
                    best_config,
                    fold_configs,
                    trials: Vec::new(),
                    model,
                })
            }
        }
    }

    fn evaluate_fixed(
        &self,
        dataset: &Dataset,
        config: ModelConfig,
        trials: Vec<Trial>,
    ) -> Result<EvaluationOutcome> {
        let report = self.run_folds(dataset, |_, train, test| fit_predict(&config, train, test))?;
        let model = if self.refit {
            info!("Refitting {} on all {} rows", config.family(), dataset.n_samples());
            Some(fit_model(&config, dataset)?)
        } else {
            None
        };
        Ok(EvaluationOutcome {
            report,
            fold_configs: vec![config.clone(); self.num_folds],
            best_config: Some(config),
            trials,
            model,
        })
    }
}
