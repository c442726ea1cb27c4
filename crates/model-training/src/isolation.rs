//! Isolation Forest
//!
//! Random axis-aligned partition trees over small sub-samples. Readings that
//! isolate after few splits score close to 1. The outlier cutoff is the
//! training-score quantile at `1 - contamination`.

use crate::TrainingError;
use inference_engine::{InferenceError, OutlierDetector};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Isolation forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsolationConfig {
    /// Number of trees (default: 100)
    pub n_estimators: usize,
    /// Sub-sample size per tree, capped at the dataset size (default: 256)
    pub max_samples: usize,
    /// Expected outlier fraction in (0, 0.5] (default: 0.01)
    pub contamination: f64,
    /// Seed of the random source (default: 42)
    pub seed: u64,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_samples: 256,
            contamination: 0.01,
            seed: 42,
        }
    }
}

impl IsolationConfig {
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.n_estimators == 0 {
            return Err(TrainingError::InvalidConfig(
                "isolation forest needs at least one tree".to_string(),
            ));
        }
        if self.max_samples == 0 {
            return Err(TrainingError::InvalidConfig(
                "max_samples must be positive".to_string(),
            ));
        }
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(TrainingError::InvalidConfig(format!(
                "contamination {} must lie in (0, 0.5]",
                self.contamination
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(x: &Array2<f64>, samples: Vec<usize>, height_limit: usize, rng: &mut StdRng) -> Self {
        let mut nodes = vec![Node::Leaf { size: 0 }];
        let mut stack = vec![(0usize, samples, 0usize)];

        while let Some((slot, samples, depth)) = stack.pop() {
            if depth >= height_limit || samples.len() <= 1 {
                nodes[slot] = Node::Leaf {
                    size: samples.len(),
                };
                continue;
            }

            // Only features that still vary can separate the node
            let ranges: Vec<(usize, f64, f64)> = (0..x.ncols())
                .filter_map(|f| {
                    let (lo, hi) = samples.iter().fold(
                        (f64::INFINITY, f64::NEG_INFINITY),
                        |(lo, hi), &i| (lo.min(x[[i, f]]), hi.max(x[[i, f]])),
                    );
                    (hi > lo).then_some((f, lo, hi))
                })
                .collect();
            if ranges.is_empty() {
                nodes[slot] = Node::Leaf {
                    size: samples.len(),
                };
                continue;
            }

            let (feature, lo, hi) = ranges[rng.gen_range(0..ranges.len())];
            // Interpolated so that spans wider than f64::MAX stay finite
            let u: f64 = rng.gen();
            let threshold = (lo * (1.0 - u) + hi * u).clamp(lo, hi);
            let (left, right): (Vec<usize>, Vec<usize>) = samples
                .into_iter()
                .partition(|&i| x[[i, feature]] <= threshold);

            let left_slot = nodes.len();
            let right_slot = left_slot + 1;
            nodes.push(Node::Leaf { size: 0 });
            nodes.push(Node::Leaf { size: 0 });
            nodes[slot] = Node::Split {
                feature,
                threshold,
                left: left_slot,
                right: right_slot,
            };
            stack.push((right_slot, right, depth + 1));
            stack.push((left_slot, left, depth + 1));
        }

        Self { nodes }
    }

    fn path_length(&self, x: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful search in a binary search tree of
/// `n` nodes
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Trained isolation forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    config: IsolationConfig,
    n_features: usize,
    sample_size: usize,
    trees: Vec<IsolationTree>,
    /// Anomaly scores above this are outliers
    threshold: f64,
}

impl IsolationForest {
    /// Fit on an aligned feature matrix
    pub fn fit(x: &Array2<f64>, config: IsolationConfig) -> Result<Self, TrainingError> {
        config.validate()?;
        let n = x.nrows();
        if n == 0 {
            return Err(TrainingError::EmptyDataset);
        }

        let sample_size = config.max_samples.min(n);
        let height_limit = (sample_size.max(2) as f64).log2().ceil() as usize;

        info!(
            "Fitting isolation forest: {} trees, sample size {}, contamination {}, seed {}",
            config.n_estimators, sample_size, config.contamination, config.seed
        );

        let mut rng = StdRng::seed_from_u64(config.seed);
        let trees: Vec<IsolationTree> = (0..config.n_estimators)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let samples = index::sample(&mut tree_rng, n, sample_size).into_vec();
                IsolationTree::grow(x, samples, height_limit, &mut tree_rng)
            })
            .collect();

        let mut forest = Self {
            config,
            n_features: x.ncols(),
            sample_size,
            trees,
            threshold: f64::INFINITY,
        };

        let mut scores: Vec<f64> = x.rows().into_iter().map(|row| forest.raw_score(row)).collect();
        scores.sort_by(|a, b| a.total_cmp(b));
        forest.threshold = quantile(&scores, 1.0 - config.contamination);
        debug!("Isolation forest outlier cutoff: {:.4}", forest.threshold);

        Ok(forest)
    }

    fn raw_score(&self, x: ArrayView1<'_, f64>) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(x)).sum::<f64>()
            / self.trees.len().max(1) as f64;
        let norm = average_path_length(self.sample_size);
        if norm == 0.0 {
            return 0.5;
        }
        2f64.powf(-mean_path / norm)
    }

    /// Anomaly score in (0, 1]; higher is more anomalous
    pub fn anomaly_score(&self, x: ArrayView1<'_, f64>) -> Result<f64, InferenceError> {
        if x.len() != self.n_features {
            return Err(InferenceError::InvalidInputShape {
                expected: self.n_features,
                actual: x.len(),
            });
        }
        Ok(self.raw_score(x))
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn config(&self) -> &IsolationConfig {
        &self.config
    }
}

impl OutlierDetector for IsolationForest {
    fn is_outlier(&self, features: ArrayView1<'_, f64>) -> Result<bool, InferenceError> {
        Ok(self.anomaly_score(features)? > self.threshold)
    }
}
