//! Seeded k-fold partitioning of a labelled dataset.

use std::fmt;
use std::str::FromStr;

use log::debug;
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ClassifierError, Result};

/// How samples are dealt into folds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FoldPolicy {
    /// Contiguous chunks of one shuffled order, labels ignored.
    KFold,
    /// Each fold keeps the class proportions of the full dataset.
    #[default]
    Stratified,
}

impl fmt::Display for FoldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoldPolicy::KFold => write!(f, "kfold"),
            FoldPolicy::Stratified => write!(f, "stratified"),
        }
    }
}

impl FromStr for FoldPolicy {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "kfold" => Ok(FoldPolicy::KFold),
            "stratified" => Ok(FoldPolicy::Stratified),
            _ => Err(ClassifierError::InvalidChoice {
                name: "kfold_type".to_string(),
                value: s.to_string(),
                expected: "kfold, stratified".to_string(),
            }),
        }
    }
}

/// One train/test split. Both index lists are sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fold {
    pub index: usize,
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
}

/// Reusable splitter: policy, fold count and shuffle seed.
#[derive(Debug, Clone, Copy)]
pub struct CrossValidator {
    policy: FoldPolicy,
    num_folds: usize,
    seed: u64,
}

impl CrossValidator {
    pub fn new(policy: FoldPolicy, num_folds: usize) -> Self {
        Self {
            policy,
            num_folds,
            seed: 42,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn policy(&self) -> FoldPolicy {
        self.policy
    }

    pub fn num_folds(&self) -> usize {
        self.num_folds
    }

    /// Split `labels.len()` samples into `num_folds` folds.
    pub fn split(&self, labels: &Array1<u8>) -> Result<Vec<Fold>> {
        let n_samples = labels.len();
        let k = self.num_folds;
        if k < 2 {
            return Err(ClassifierError::InvalidParameter(format!(
                "num_folds must be at least 2, got {}",
                k
            )));
        }
        if k > n_samples {
            return Err(ClassifierError::InvalidParameter(format!(
                "num_folds ({}) cannot be greater than the number of samples ({})",
                k, n_samples
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l > 1) {
            return Err(ClassifierError::InvalidLabel(bad as f64));
        }

        let mut order: Vec<usize> = (0..n_samples).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        order.shuffle(&mut rng);

        let test_sets = match self.policy {
            FoldPolicy::KFold => chunk_kfold(&order, k),
            FoldPolicy::Stratified => chunk_stratified(&order, labels, k)?,
        };

        let folds = test_sets
            .into_iter()
            .enumerate()
            .map(|(index, mut test_indices)| {
                test_indices.sort_unstable();
                let mut in_test = vec![false; n_samples];
                for &i in &test_indices {
                    in_test[i] = true;
                }
                let train_indices = (0..n_samples).filter(|&i| !in_test[i]).collect::<Vec<_>>();
                debug!(
                    "fold {}: {} train / {} test",
                    index + 1,
                    train_indices.len(),
                    test_indices.len()
                );
                Fold {
                    index,
                    train_indices,
                    test_indices,
                }
            })
            .collect();
        Ok(folds)
    }
}

/// Sizes of `k` contiguous chunks covering `n` items, larger chunks starting at `offset`.
fn chunk_sizes(n: usize, k: usize, offset: usize) -> Vec<usize> {
    let (base, remainder) = (n / k, n % k);
    (0..k)
        .map(|fold| base + usize::from((fold + k - offset) % k < remainder))
        .collect()
}

fn chunk_kfold(order: &[usize], k: usize) -> Vec<Vec<usize>> {
    let mut start = 0;
    chunk_sizes(order.len(), k, 0)
        .into_iter()
        .map(|size| {
            let chunk = order[start..start + size].to_vec();
            start += size;
            chunk
        })
        .collect()
}

fn chunk_stratified(order: &[usize], labels: &Array1<u8>, k: usize) -> Result<Vec<Vec<usize>>> {
    let (negatives, positives): (Vec<usize>, Vec<usize>) =
        order.iter().copied().partition(|&i| labels[i] == 0);

    let minority = [negatives.len(), positives.len()]
        .into_iter()
        .filter(|&c| c > 0)
        .min()
        .unwrap_or(0);
    if k > minority {
        return Err(ClassifierError::InvalidParameter(format!(
            "num_folds ({}) cannot be greater than the number of members in each class ({})",
            k, minority
        )));
    }

    let mut folds = vec![Vec::new(); k];
    let mut offset = 0;
    for class_indices in [negatives, positives] {
        let mut start = 0;
        for (fold, size) in chunk_sizes(class_indices.len(), k, offset)
            .into_iter()
            .enumerate()
        {
            folds[fold].extend_from_slice(&class_indices[start..start + size]);
            start += size;
        }
        offset = (offset + class_indices.len() % k) % k;
    }
    Ok(folds)
}

/// Partition `(x, y)` into `num_folds` folds under `policy`.
pub fn partition(
    x: &Array2<f64>,
    y: &Array1<u8>,
    num_folds: usize,
    policy: FoldPolicy,
    seed: u64,
) -> Result<Vec<Fold>> {
    if x.nrows() != y.len() {
        return Err(ClassifierError::ShapeMismatch {
            expected: format!("{} labels", x.nrows()),
            actual: format!("{} labels", y.len()),
        });
    }
    CrossValidator::new(policy, num_folds).with_seed(seed).split(y)
}
