//! CLI evaluation helpers for nba-career-classifiers.
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use nba_career_classifiers::config::ModelConfig;
use nba_career_classifiers::cross_validation::FoldPolicy;
use nba_career_classifiers::data_handling::read_dataset_csv;
use nba_career_classifiers::evaluator::{CrossValidatedEvaluator, EvaluationOutcome, Tuning};
use nba_career_classifiers::io::save_model;
use nba_career_classifiers::report::html::save_html;
use nba_career_classifiers::search::grid::ParamGrid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TuningMode {
    #[default]
    Fixed,
    Grid,
    Adaptive,
}

impl fmt::Display for TuningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TuningMode::Fixed => "fixed",
            TuningMode::Grid => "grid",
            TuningMode::Adaptive => "adaptive",
        })
    }
}

impl FromStr for TuningMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(TuningMode::Fixed),
            "grid" => Ok(TuningMode::Grid),
            "adaptive" => Ok(TuningMode::Adaptive),
            other => anyhow::bail!("Unknown tuning mode '{}'. Choose one of: fixed, grid, adaptive", other),
        }
    }
}

/// Parameters for one cross-validated evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluateConfig {
    /// Fixed configuration, the grid base, or (family only) the adaptive target.
    pub model: ModelConfig,
    pub tuning: TuningMode,
    pub fold_policy: FoldPolicy,
    pub num_folds: usize,
    pub seed: u64,
    pub n_trials: usize,
    /// Grid for `TuningMode::Grid`; the family's default grid when absent.
    pub grid: Option<ParamGrid>,
    pub refit: bool,
    pub n_jobs: Option<usize>,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            tuning: TuningMode::default(),
            fold_policy: FoldPolicy::Stratified,
            num_folds: 5,
            seed: 42,
            n_trials: 20,
            grid: None,
            refit: true,
            n_jobs: None,
        }
    }
}

impl EvaluateConfig {
    pub fn to_tuning(&self) -> Tuning {
        match self.tuning {
            TuningMode::Fixed => Tuning::Fixed(self.model.clone()),
            TuningMode::Grid => Tuning::Grid {
                base: self.model.clone(),
                grid: self
                    .grid
                    .clone()
                    .unwrap_or_else(|| ParamGrid::default_for(self.model.family())),
            },
            TuningMode::Adaptive => Tuning::Adaptive {
                family: self.model.family(),
                n_trials: self.n_trials,
            },
        }
    }

    pub fn evaluator(&self) -> CrossValidatedEvaluator {
        CrossValidatedEvaluator::new(self.fold_policy, self.num_folds, self.seed)
            .with_refit(self.refit)
            .with_n_jobs(self.n_jobs)
    }
}

/// Load an evaluation configuration from a JSON file.
pub fn load_evaluate_config<P: AsRef<Path>>(path: P) -> Result<EvaluateConfig> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config: {}", path.as_ref().display()))?;
    let config: EvaluateConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.as_ref().display()))?;
    Ok(config)
}

/// Load `data_path`, evaluate, and write the refit model and HTML report
/// when paths are given.
pub fn run<P: AsRef<Path>>(
    data_path: P,
    config: &EvaluateConfig,
    model_output: Option<&Path>,
    report_output: Option<&Path>,
) -> Result<EvaluationOutcome> {
    let dataset = read_dataset_csv(&data_path)
        .with_context(|| format!("Failed to load data: {}", data_path.as_ref().display()))?;
    log::info!(
        "Evaluating {} with {} tuning over {} {} folds",
        config.model.family(),
        config.tuning,
        config.num_folds,
        config.fold_policy
    );

    let outcome = config.evaluator().evaluate(&dataset, &config.to_tuning())?;

    if let (Some(path), Some(model)) = (model_output, outcome.model.as_ref()) {
        save_model(model.as_ref(), &dataset.feature_names, path)
            .with_context(|| format!("Failed to save model: {}", path.display()))?;
    }
    if let Some(path) = report_output {
        save_html(&outcome, path)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
    }
    Ok(outcome)
}
