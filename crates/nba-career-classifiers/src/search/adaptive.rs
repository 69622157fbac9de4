//! Sequential model-based search in the style of a tree-structured Parzen
//! estimator.
//!
//! The first `n_startup` trials sample the prior of the search space. After
//! that, completed trials are split into a good group (top `GAMMA` quantile
//! by objective) and a bad group, and each parameter is drawn where the good
//! density is high relative to the bad density. The objective is maximized.

use log::{debug, info};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::{ClassifierFamily, ModelConfig, ModelType};
use crate::cross_validation::FoldPolicy;
use crate::data_handling::Dataset;
use crate::error::{ClassifierError, Result};
use crate::models::classifier_trait::Classifier;
use crate::search::cross_val_f1;
use crate::search::space::{format_params, ParamDomain, ParamSet, ParamValue, SearchSpace};

/// Fraction of completed trials forming the good group.
const GAMMA: f64 = 0.25;

/// One evaluated (or pending) configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub number: usize,
    pub params: ParamSet,
    /// Mean cross-validated F1, `None` until recorded.
    pub value: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AdaptiveSearch {
    space: SearchSpace,
    rng: ChaCha8Rng,
    seed: u64,
    n_startup: usize,
    n_candidates: usize,
    /// Number handed to the next suggested trial.
    next_number: usize,
    trials: Vec<Trial>,
}

impl AdaptiveSearch {
    pub fn new(space: SearchSpace, seed: u64) -> Self {
        Self {
            space,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
            n_startup: 10,
            n_candidates: 24,
            next_number: 0,
            trials: Vec::new(),
        }
    }

    pub fn for_family(family: ClassifierFamily, seed: u64) -> Self {
        Self::new(SearchSpace::for_family(family), seed)
    }

    /// Fails with an unsupported-family error for unregistered classifiers.
    pub fn for_classifier(classifier: &dyn Classifier, seed: u64) -> Result<Self> {
        Ok(Self::new(SearchSpace::for_classifier(classifier)?, seed))
    }

    pub fn with_startup(mut self, n_startup: usize) -> Self {
        self.n_startup = n_startup.max(1);
        self
    }

    pub fn space(&self) -> &SearchSpace {
        &self.space
    }

    pub fn trials(&self) -> &[Trial] {
        &self.trials
    }

    /// Highest recorded value, the earliest trial on ties.
    pub fn best_trial(&self) -> Option<&Trial> {
        let mut best: Option<&Trial> = None;
        for trial in self.completed() {
            match best {
                Some(b) if trial.value <= b.value => {}
                _ => best = Some(trial),
            }
        }
        best
    }

    fn completed(&self) -> impl Iterator<Item = &Trial> {
        self.trials.iter().filter(|t| t.value.is_some())
    }

    /// Propose the next configuration.
    pub fn suggest(&mut self) -> Trial {
        let number = self.next_number;
        self.next_number += 1;
        let n_completed = self.completed().count();
        let params = if n_completed < self.n_startup.max(2) {
            self.space.sample(&mut self.rng)
        } else {
            self.sample_informed()
        };
        Trial {
            number,
            params,
            value: None,
        }
    }

    pub fn record(&mut self, mut trial: Trial, value: f64) {
        trial.value = Some(value);
        self.trials.push(trial);
    }

    fn sample_informed(&mut self) -> ParamSet {
        let mut sorted: Vec<Trial> = self.completed().cloned().collect();
        sorted.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let n_good = ((sorted.len() as f64 * GAMMA).ceil() as usize)
            .max(1)
            .min(sorted.len() - 1);
        let (good, bad) = sorted.split_at(n_good);

        let mut chosen = ParamSet::new();
        for spec in self.space.params().to_vec() {
            if !spec.is_active(&chosen) {
                continue;
            }
            let good_values: Vec<&ParamValue> =
                good.iter().filter_map(|t| t.params.get(&spec.name)).collect();
            let bad_values: Vec<&ParamValue> =
                bad.iter().filter_map(|t| t.params.get(&spec.name)).collect();
            let value = if good_values.is_empty() {
                spec.domain.sample(&mut self.rng)
            } else {
                self.sample_parameter(&spec.domain, &good_values, &bad_values)
            };
            chosen.insert(spec.name.clone(), value);
        }
        chosen
    }

    fn sample_parameter(
        &mut self,
        domain: &ParamDomain,
        good: &[&ParamValue],
        bad: &[&ParamValue],
    ) -> ParamValue {
        match domain {
            ParamDomain::Categorical(choices) => {
                let count = |values: &[&ParamValue], choice: &ParamValue| {
                    values.iter().filter(|v| **v == choice).count()
                };
                let weights: Vec<f64> = choices
                    .iter()
                    .map(|c| (count(good, c) + 1) as f64 / (count(bad, c) + 1) as f64)
                    .collect();
                let idx = sample_weighted(&weights, &mut self.rng);
                choices[idx].clone()
            }
            ParamDomain::Int { low, high, step } => {
                let grid = domain.int_values();
                let slot = |v: &ParamValue| {
                    v.as_i64()
                        .map(|x| ((x - low) / step) as usize)
                        .filter(|&i| i < grid.len())
                };
                let mut good_counts = vec![1.0; grid.len()];
                let mut bad_counts = vec![1.0; grid.len()];
                for i in good.iter().filter_map(|v| slot(*v)) {
                    good_counts[i] += 1.0;
                }
                for i in bad.iter().filter_map(|v| slot(*v)) {
                    bad_counts[i] += 1.0;
                }
                let good_total: f64 = good_counts.iter().sum();
                let bad_total: f64 = bad_counts.iter().sum();
                let weights: Vec<f64> = good_counts
                    .iter()
                    .zip(&bad_counts)
                    .map(|(l, g)| (l / good_total) / (g / bad_total))
                    .collect();
                let idx = sample_weighted(&weights, &mut self.rng);
                ParamValue::Int(grid.get(idx).copied().unwrap_or(*high))
            }
            ParamDomain::Float { low, high, log } => {
                let to_space = |v: f64| if *log { v.max(f64::MIN_POSITIVE).ln() } else { v };
                let (lo, hi) = (to_space(*low), to_space(*high));
                let good: Vec<f64> = good.iter().filter_map(|v| v.as_f64()).map(to_space).collect();
                let bad: Vec<f64> = bad.iter().filter_map(|v| v.as_f64()).map(to_space).collect();
                let value = self.sample_continuous(&good, &bad, lo, hi);
                let value = if *log { value.exp() } else { value };
                ParamValue::Float(value.clamp(*low, *high))
            }
        }
    }

    /// Draw candidates from a Gaussian KDE around the good values and keep
    /// the one with the highest good/bad density ratio.
    fn sample_continuous(&mut self, good: &[f64], bad: &[f64], low: f64, high: f64) -> f64 {
        if good.is_empty() || high <= low {
            return low;
        }
        let bandwidth = (high - low) / 10.0;
        let mut best_value = low;
        let mut best_ratio = f64::NEG_INFINITY;
        for _ in 0..self.n_candidates {
            let base = good[self.rng.gen_range(0..good.len())];
            // Box-Muller
            let u1: f64 = self.rng.gen::<f64>().max(1e-10);
            let u2: f64 = self.rng.gen();
            let noise = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
            let candidate = (base + noise * bandwidth).clamp(low, high);

            let ratio = kde(candidate, good, bandwidth) / (kde(candidate, bad, bandwidth) + 1e-10);
            if ratio > best_ratio {
                best_ratio = ratio;
                best_value = candidate;
            }
        }
        best_value
    }

    /// Run `n_trials` trials, each scored by mean F1 over `cv` folds of
    /// `dataset`, and return the best one.
    pub fn optimize(
        &mut self,
        dataset: &Dataset,
        n_trials: usize,
        cv: usize,
        policy: FoldPolicy,
    ) -> Result<Trial> {
        if n_trials == 0 {
            return Err(ClassifierError::InvalidParameter(
                "n_trials must be at least 1".to_string(),
            ));
        }
        let family = self.space.family();
        info!(
            "Starting adaptive search for {} ({} trials, {}-fold {})",
            family, n_trials, cv, policy
        );

        for _ in 0..n_trials {
            let trial = self.suggest();
            let config = self.config_for(&trial.params)?;
            debug!("Trial {} parameters: {}", trial.number, format_params(&trial.params));
            let value = cross_val_f1(dataset, &config, cv, policy, self.seed)?;
            let (number, params) = (trial.number, format_params(&trial.params));
            self.record(trial, value);

            if let Some(best) = self.best_trial() {
                info!(
                    "Trial {} finished with value: {:.6} and parameters: {}. Best is trial {} with value: {:.6}.",
                    number,
                    value,
                    params,
                    best.number,
                    best.value.unwrap_or(0.0)
                );
            }
        }

        let best = self
            .best_trial()
            .cloned()
            .ok_or_else(|| ClassifierError::Training("no trial completed".to_string()))?;
        info!("Best hyperparameters found: {}", format_params(&best.params));
        Ok(best)
    }

    /// Model configuration for a sampled parameter set.
    pub fn config_for(&self, params: &ParamSet) -> Result<ModelConfig> {
        Ok(ModelConfig::new(ModelType::from_params(self.space.family(), params)?)
            .with_random_state(self.seed))
    }
}

fn kde(x: f64, values: &[f64], bandwidth: f64) -> f64 {
    if values.is_empty() {
        return 1.0;
    }
    values
        .iter()
        .map(|&v| (-(x - v).powi(2) / (2.0 * bandwidth.powi(2))).exp())
        .sum::<f64>()
        / values.len() as f64
}

fn sample_weighted<R: Rng>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    let mut r = rng.gen::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        if r < *w {
            return i;
        }
        r -= w;
    }
    weights.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_then_informed_samples_stay_in_domain() {
        let mut search =
            AdaptiveSearch::for_family(ClassifierFamily::GradientBoosting, 5).with_startup(3);
        for i in 0..30 {
            let trial = search.suggest();
            search.space().validate(&trial.params).unwrap();
            // Reward small learning rates.
            let lr = trial.params["learning_rate"].as_f64().unwrap();
            search.record(trial, 1.0 - lr + i as f64 * 1e-6);
        }
        assert_eq!(search.trials().len(), 30);
    }

    #[test]
    fn test_informed_sampling_moves_towards_good_region() {
        let mut search = AdaptiveSearch::for_family(ClassifierFamily::Svc, 11).with_startup(10);
        for _ in 0..60 {
            let trial = search.suggest();
            let c = trial.params["C"].as_f64().unwrap();
            // Peak at C = 10.
            search.record(trial, -(c.log10() - 1.0).abs());
        }
        let late: Vec<f64> = search.trials()[40..]
            .iter()
            .map(|t| t.params["C"].as_f64().unwrap())
            .collect();
        let near = late.iter().filter(|c| **c > 1.0 && **c < 100.0).count();
        assert!(near >= 12, "late C values: {:?}", late);
    }

    #[test]
    fn test_best_trial_prefers_earliest_on_ties() {
        let mut search = AdaptiveSearch::for_family(ClassifierFamily::RandomForest, 1);
        for value in [0.5, 0.7, 0.7, 0.2] {
            let trial = search.suggest();
            search.record(trial, value);
        }
        assert_eq!(search.best_trial().unwrap().number, 1);
    }

    #[test]
    fn test_pending_suggestions_get_distinct_numbers() {
        let mut search = AdaptiveSearch::for_family(ClassifierFamily::RandomForest, 4);
        let first = search.suggest();
        let second = search.suggest();
        assert_eq!(first.number, 0);
        assert_eq!(second.number, 1);

        search.record(second, 0.4);
        search.record(first, 0.6);
        assert_eq!(search.suggest().number, 2);
        assert_eq!(search.best_trial().map(|t| t.number), Some(0));
    }

    #[test]
    fn test_zero_trials_is_rejected() {
        let dataset = Dataset::from_rows(&[vec![0.0], vec![1.0]], &[0, 1]).unwrap();
        let mut search = AdaptiveSearch::for_family(ClassifierFamily::Svc, 0);
        assert!(matches!(
            search.optimize(&dataset, 0, 2, FoldPolicy::KFold),
            Err(ClassifierError::InvalidParameter(_))
        ));
    }
}
