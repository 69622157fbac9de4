//! CART classification tree on gini impurity, used as the forest base learner.

use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Tree node. Leaves hold the fraction of class-1 samples that reached them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features drawn at every node, all of them when `None`.
    pub max_features: Option<usize>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

fn gini(positives: usize, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let p = positives as f64 / count as f64;
    2.0 * p * (1.0 - p)
}

impl DecisionTree {
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    /// Grow the tree on the rows of `x` listed in `indices`.
    ///
    /// `indices` may repeat rows, as bootstrap samples do.
    pub fn fit_indices<R: Rng>(
        &mut self,
        x: &Array2<f64>,
        y: &Array1<u8>,
        indices: &[usize],
        rng: &mut R,
    ) {
        self.root = Some(self.build_tree(x, y, indices.to_vec(), 0, rng));
    }

    fn build_tree<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &Array1<u8>,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut R,
    ) -> TreeNode {
        let n_samples = indices.len();
        let positives = indices.iter().filter(|&&i| y[i] == 1).count();
        let value = if n_samples == 0 {
            0.0
        } else {
            positives as f64 / n_samples as f64
        };

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || positives == 0
            || positives == n_samples;
        if should_stop {
            return TreeNode::Leaf { value, n_samples };
        }

        match self.find_best_split(x, y, &indices, positives, rng) {
            Some((feature_idx, threshold)) => {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .into_iter()
                    .partition(|&i| x[[i, feature_idx]] <= threshold);
                if left_indices.is_empty() || right_indices.is_empty() {
                    return TreeNode::Leaf { value, n_samples };
                }
                let left = Box::new(self.build_tree(x, y, left_indices, depth + 1, rng));
                let right = Box::new(self.build_tree(x, y, right_indices, depth + 1, rng));
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    n_samples,
                }
            }
            None => TreeNode::Leaf { value, n_samples },
        }
    }

    /// Best `(feature, threshold)` among a random subset of features, found
    /// by sorting each feature once and sweeping the class counts.
    fn find_best_split<R: Rng>(
        &self,
        x: &Array2<f64>,
        y: &Array1<u8>,
        indices: &[usize],
        positives: usize,
        rng: &mut R,
    ) -> Option<(usize, f64)> {
        let n_features = x.ncols();
        let k = self.max_features.unwrap_or(n_features).clamp(1, n_features);
        let n = indices.len();
        let parent_impurity = gini(positives, n);

        let mut best: Option<(usize, f64)> = None;
        let mut best_impurity = parent_impurity - 1e-12;

        let mut pairs: Vec<(f64, u8)> = Vec::with_capacity(n);
        for feature_idx in index::sample(rng, n_features, k).into_iter() {
            pairs.clear();
            pairs.extend(indices.iter().map(|&i| (x[[i, feature_idx]], y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_count = 0usize;
            let mut left_pos = 0usize;
            for i in 0..n - 1 {
                left_count += 1;
                left_pos += pairs[i].1 as usize;
                if pairs[i].0 == pairs[i + 1].0 {
                    continue;
                }
                let right_count = n - left_count;
                if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                    continue;
                }
                let weighted = (left_count as f64 * gini(left_pos, left_count)
                    + right_count as f64 * gini(positives - left_pos, right_count))
                    / n as f64;
                if weighted < best_impurity {
                    best_impurity = weighted;
                    // Adjacent floats can round the midpoint up to the upper value.
                    let mut threshold = (pairs[i].0 + pairs[i + 1].0) / 2.0;
                    if threshold >= pairs[i + 1].0 {
                        threshold = pairs[i].0;
                    }
                    best = Some((feature_idx, threshold));
                }
            }
        }
        best
    }

    /// Class-1 probability of a single row.
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = match &self.root {
            Some(root) => root,
            None => return 0.0,
        };
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Depth of the fitted tree, 0 for a single leaf.
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }
}
