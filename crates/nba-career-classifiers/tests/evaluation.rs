use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use nba_career_classifiers::config::{ClassifierFamily, ForestParams, ModelConfig, ModelType};
use nba_career_classifiers::cross_validation::FoldPolicy;
use nba_career_classifiers::data_handling::{Dataset, FEATURE_NAMES};
use nba_career_classifiers::error::{ClassifierError, Result};
use nba_career_classifiers::evaluator::{CrossValidatedEvaluator, Tuning};
use nba_career_classifiers::models::classifier_trait::Classifier;
use nba_career_classifiers::search::adaptive::AdaptiveSearch;
use nba_career_classifiers::search::grid::ParamGrid;
use nba_career_classifiers::search::space::{ParamValue, SearchSpace};

/// `n_pos` long careers followed by `n_neg` short ones, 19 noisy features.
fn career_dataset(n_pos: usize, n_neg: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let n = n_pos + n_neg;
    let mut values = Vec::with_capacity(n * FEATURE_NAMES.len());
    let mut labels = Vec::with_capacity(n);
    for row in 0..n {
        let label = u8::from(row < n_pos);
        let shift = if label == 1 { 1.0 } else { 0.0 };
        for col in 0..FEATURE_NAMES.len() {
            let scale = (col + 1) as f64;
            values.push(scale * (shift + rng.gen_range(-0.8..0.8)));
        }
        labels.push(label);
    }
    let x = Array2::from_shape_vec((n, FEATURE_NAMES.len()), values).unwrap();
    let names = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
    Dataset::new(x, Array1::from_vec(labels), names).unwrap()
}

fn small_forest() -> ModelConfig {
    ModelConfig::new(ModelType::RandomForest(ForestParams {
        n_estimators: 10,
        ..Default::default()
    }))
}

#[test]
fn test_fixed_stratified_evaluation_aggregates_every_row() {
    let dataset = career_dataset(80, 20, 7);
    let evaluator = CrossValidatedEvaluator::new(FoldPolicy::Stratified, 5, 42);
    let outcome = evaluator
        .evaluate(&dataset, &Tuning::Fixed(small_forest()))
        .unwrap();
    let report = &outcome.report;

    let mean_total: f64 = report.confusion_mean.iter().flatten().sum();
    assert!((mean_total - 20.0).abs() < 1e-9);
    assert_eq!(report.confusion_sum.total(), 100);
    assert_eq!(report.pooled.support(), 100);
    assert_eq!(report.folds.len(), 5);
    for fold in &report.folds {
        // 16 long and 4 short careers in every test fold.
        assert_eq!(fold.confusion.support(1), 16);
        assert_eq!(fold.confusion.support(0), 4);
    }
    for m in [report.class_0, report.class_1] {
        assert!((0.0..=1.0).contains(&m.precision));
        assert!((0.0..=1.0).contains(&m.recall));
        assert!((0.0..=1.0).contains(&m.f1));
    }
    assert!(outcome.model.is_some());
    assert_eq!(outcome.fold_configs.len(), 5);
}

#[test]
fn test_evaluation_is_reproducible() {
    let dataset = career_dataset(30, 20, 3);
    let evaluator = CrossValidatedEvaluator::new(FoldPolicy::KFold, 4, 11).with_refit(false);
    let a = evaluator.evaluate(&dataset, &Tuning::Fixed(small_forest())).unwrap();
    let b = evaluator.evaluate(&dataset, &Tuning::Fixed(small_forest())).unwrap();
    assert_eq!(a.report, b.report);
    assert!(a.model.is_none());
}

#[test]
fn test_adaptive_svc_runs_the_requested_trials() {
    let dataset = career_dataset(60, 40, 5);
    let mut search = AdaptiveSearch::for_family(ClassifierFamily::Svc, 42);
    let best = search
        .optimize(&dataset, 5, 3, FoldPolicy::Stratified)
        .unwrap();
    assert_eq!(search.trials().len(), 5);
    assert!(search.trials().iter().all(|t| t.value.is_some()));
    let value = best.value.unwrap();
    assert!((0.0..=1.0).contains(&value));
    let max = search
        .trials()
        .iter()
        .filter_map(|t| t.value)
        .fold(f64::MIN, f64::max);
    assert_eq!(value, max);
}

#[test]
fn test_adaptive_tuning_reuses_one_configuration() {
    let dataset = career_dataset(30, 30, 9);
    let evaluator = CrossValidatedEvaluator::new(FoldPolicy::Stratified, 3, 1);
    let outcome = evaluator
        .evaluate(
            &dataset,
            &Tuning::Adaptive {
                family: ClassifierFamily::GradientBoosting,
                n_trials: 2,
            },
        )
        .unwrap();
    assert_eq!(outcome.trials.len(), 2);
    let best = outcome.best_config.unwrap();
    assert!(outcome.fold_configs.iter().all(|c| *c == best));
}

#[test]
fn test_grid_tuning_selects_per_fold() {
    let dataset = career_dataset(30, 30, 13);
    let grid = ParamGrid::new()
        .with("n_estimators", [5i64])
        .with("max_depth", [ParamValue::Int(2), ParamValue::None]);
    let evaluator = CrossValidatedEvaluator::new(FoldPolicy::Stratified, 3, 42).with_n_jobs(Some(2));
    let outcome = evaluator
        .evaluate(
            &dataset,
            &Tuning::Grid {
                base: small_forest(),
                grid,
            },
        )
        .unwrap();
    assert_eq!(outcome.fold_configs.len(), 3);
    assert!(outcome.best_config.is_some());
    assert_eq!(outcome.report.pooled.support(), 60);
}

#[test]
fn test_adaptive_search_rejects_zero_trials() {
    let dataset = career_dataset(10, 10, 1);
    let mut search = AdaptiveSearch::for_family(ClassifierFamily::RandomForest, 0);
    let err = search
        .optimize(&dataset, 0, 2, FoldPolicy::KFold)
        .unwrap_err();
    assert!(matches!(err, ClassifierError::InvalidParameter(_)));
}

/// Predicts class 1 for every row.
struct AlwaysLong {
    width: Option<usize>,
}

impl Classifier for AlwaysLong {
    fn fit(&mut self, x: &Array2<f64>, _y: &Array1<u8>) -> Result<()> {
        self.width = Some(x.ncols());
        Ok(())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(Array1::from_elem(x.nrows(), 1.0))
    }

    fn n_features(&self) -> Option<usize> {
        self.width
    }
}

#[test]
fn test_custom_classifier_is_unsupported_for_search() {
    let custom = AlwaysLong { width: None };
    let err = SearchSpace::for_classifier(&custom).unwrap_err();
    assert!(matches!(err, ClassifierError::UnsupportedFamily(_)));
    assert!(AdaptiveSearch::for_classifier(&custom, 42).is_err());
}

#[test]
fn test_custom_classifier_degenerate_folds_score_zero() {
    let dataset = career_dataset(20, 10, 2);
    let evaluator = CrossValidatedEvaluator::new(FoldPolicy::Stratified, 5, 42);
    let report = evaluator
        .evaluate_with(&dataset, || Box::new(AlwaysLong { width: None }))
        .unwrap();
    // Class 0 is never predicted: precision and recall fall back to zero.
    assert_eq!(report.class_0.precision, 0.0);
    assert_eq!(report.class_0.recall, 0.0);
    assert_eq!(report.class_0.f1, 0.0);
    assert_eq!(report.class_1.recall, 1.0);
    assert_eq!(report.confusion_sum.true_positive, 20);
    assert_eq!(report.confusion_sum.false_positive, 10);
}
