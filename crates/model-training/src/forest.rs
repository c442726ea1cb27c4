//! Random Forest Classifier
//!
//! CART trees grown on bootstrap samples with Gini impurity and a random
//! subset of candidate features per split. Class probabilities are the mean
//! of the leaf class frequencies over all trees.

use crate::TrainingError;
use inference_engine::{ClassLabel, ClassProbabilities, InferenceError, ProbabilisticClassifier};
use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Random forest hyperparameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    /// Number of trees (default: 100)
    pub n_estimators: usize,
    /// Maximum tree depth; unlimited when `None`
    pub max_depth: Option<usize>,
    /// Minimum samples required to split a node (default: 2)
    pub min_samples_split: usize,
    /// Candidate features per split; `sqrt(n_features)` when `None`
    pub max_features: Option<usize>,
    /// Draw a bootstrap sample per tree (default: true)
    pub bootstrap: bool,
    /// Seed of the random source (default: 42)
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<(), TrainingError> {
        if self.n_estimators == 0 {
            return Err(TrainingError::InvalidConfig(
                "forest needs at least one tree".to_string(),
            ));
        }
        if self.min_samples_split < 2 {
            return Err(TrainingError::InvalidConfig(
                "min_samples_split must be at least 2".to_string(),
            ));
        }
        if self.max_features == Some(0) {
            return Err(TrainingError::InvalidConfig(
                "max_features must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn leaf_distribution(&self, x: ArrayView1<'_, f64>) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    /// Class index per row
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    config: &'a ForestConfig,
}

impl TreeBuilder<'_> {
    fn build(&self, samples: Vec<usize>, rng: &mut StdRng) -> DecisionTree {
        let mut nodes = vec![placeholder()];
        let mut stack = vec![(0usize, samples, 0usize)];

        while let Some((slot, samples, depth)) = stack.pop() {
            let counts = self.class_counts(&samples);
            let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
            let depth_reached = self.config.max_depth.map_or(false, |d| depth >= d);

            let split = if pure || depth_reached || samples.len() < self.config.min_samples_split {
                None
            } else {
                self.best_split(&samples, &counts, rng)
            };

            match split {
                None => nodes[slot] = leaf(&counts, samples.len()),
                Some((feature, threshold)) => {
                    let (left, right): (Vec<usize>, Vec<usize>) = samples
                        .into_iter()
                        .partition(|&i| self.x[[i, feature]] <= threshold);
                    let left_slot = nodes.len();
                    let right_slot = left_slot + 1;
                    nodes.push(placeholder());
                    nodes.push(placeholder());
                    nodes[slot] = Node::Split {
                        feature,
                        threshold,
                        left: left_slot,
                        right: right_slot,
                    };
                    stack.push((right_slot, right, depth + 1));
                    stack.push((left_slot, left, depth + 1));
                }
            }
        }

        DecisionTree { nodes }
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &i in samples {
            counts[self.y[i]] += 1;
        }
        counts
    }

    /// Best Gini split among a random subset of features. Keeps drawing
    /// features past `max_features` until at least one valid split is found.
    fn best_split(
        &self,
        samples: &[usize],
        parent: &[usize],
        rng: &mut StdRng,
    ) -> Option<(usize, f64)> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(rng);

        let n = samples.len();
        let mut best: Option<(f64, usize, f64)> = None;
        let mut pairs: Vec<(f64, usize)> = Vec::with_capacity(n);
        let mut left = vec![0usize; self.n_classes];

        for (visited, feature) in features.into_iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }

            pairs.clear();
            pairs.extend(samples.iter().map(|&i| (self.x[[i, feature]], self.y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            if pairs[0].0 == pairs[n - 1].0 {
                continue;
            }

            left.iter_mut().for_each(|c| *c = 0);
            for pos in 0..n - 1 {
                left[pairs[pos].1] += 1;
                let (lo, hi) = (pairs[pos].0, pairs[pos + 1].0);
                if lo == hi {
                    continue;
                }

                // Maximising sum(l^2)/n_l + sum(r^2)/n_r minimises weighted Gini
                let n_left = (pos + 1) as f64;
                let n_right = (n - pos - 1) as f64;
                let (mut sq_left, mut sq_right) = (0.0, 0.0);
                for (c, &l) in left.iter().enumerate() {
                    let r = (parent[c] - l) as f64;
                    sq_left += (l * l) as f64;
                    sq_right += r * r;
                }
                let score = sq_left / n_left + sq_right / n_right;

                if best.map_or(true, |(b, _, _)| score > b) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some((score, feature, threshold));
                }
            }
        }

        best.map(|(_, feature, threshold)| (feature, threshold))
    }
}

fn placeholder() -> Node {
    Node::Leaf {
        distribution: Vec::new(),
    }
}

fn leaf(counts: &[usize], total: usize) -> Node {
    let total = total.max(1) as f64;
    Node::Leaf {
        distribution: counts.iter().map(|&c| c as f64 / total).collect(),
    }
}

/// Trained random forest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    config: ForestConfig,
    classes: Vec<ClassLabel>,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForestClassifier {
    /// Fit on an aligned feature matrix and its outcome labels
    pub fn fit(
        x: &Array2<f64>,
        y: &[ClassLabel],
        config: ForestConfig,
    ) -> Result<Self, TrainingError> {
        config.validate()?;
        if x.nrows() == 0 {
            return Err(TrainingError::EmptyDataset);
        }
        if x.nrows() != y.len() {
            return Err(TrainingError::LengthMismatch {
                rows: x.nrows(),
                outcomes: y.len(),
            });
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();
        if classes.len() < 2 {
            return Err(TrainingError::SingleClass(classes[0]));
        }
        let y_idx: Vec<usize> = y
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_else(|i| i))
            .collect();

        let n_features = x.ncols();
        let max_features = config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt() as usize)
            .clamp(1, n_features.max(1));

        info!(
            "Fitting random forest: {} trees, {} rows, {} features ({} per split), seed {}",
            config.n_estimators,
            x.nrows(),
            n_features,
            max_features,
            config.seed
        );

        let builder = TreeBuilder {
            x,
            y: &y_idx,
            n_classes: classes.len(),
            max_features,
            config: &config,
        };

        let n = x.nrows();
        let mut rng = StdRng::seed_from_u64(config.seed);
        let trees: Vec<DecisionTree> = (0..config.n_estimators)
            .map(|_| {
                let mut tree_rng = StdRng::seed_from_u64(rng.gen());
                let samples: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| tree_rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                builder.build(samples, &mut tree_rng)
            })
            .collect();

        let total_nodes: usize = trees.iter().map(|t| t.nodes.len()).sum();
        debug!("Random forest grown with {} nodes in total", total_nodes);

        Ok(Self {
            config,
            classes,
            n_features,
            trees,
        })
    }

    /// Mean class frequencies, ordered like [`Self::classes`]
    pub fn predict_proba(&self, x: ArrayView1<'_, f64>) -> Result<Vec<f64>, InferenceError> {
        if x.len() != self.n_features {
            return Err(InferenceError::InvalidInputShape {
                expected: self.n_features,
                actual: x.len(),
            });
        }
        let mut sum = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.leaf_distribution(x)) {
                *acc += p;
            }
        }
        let n_trees = self.trees.len().max(1) as f64;
        Ok(sum.into_iter().map(|s| s / n_trees).collect())
    }

    /// Most probable class; ties go to the lower label
    pub fn predict(&self, x: ArrayView1<'_, f64>) -> Result<ClassLabel, InferenceError> {
        let proba = self.predict_proba(x)?;
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok(self.classes[best])
    }

    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

impl ProbabilisticClassifier for RandomForestClassifier {
    fn class_probabilities(
        &self,
        features: ArrayView1<'_, f64>,
    ) -> Result<ClassProbabilities, InferenceError> {
        let proba = self.predict_proba(features)?;
        Ok(ClassProbabilities::new(
            self.classes.iter().copied().zip(proba).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array2};
    use proptest::prelude::*;

    /// Failure when x0 > 50, noise in x1
    fn separable(n: usize) -> (Array2<f64>, Vec<ClassLabel>) {
        let mut flat = Vec::with_capacity(n * 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let x0 = (i * 37 % 100) as f64;
            let x1 = (i * 13 % 17) as f64;
            flat.push(x0);
            flat.push(x1);
            y.push(u8::from(x0 > 50.0));
        }
        (Array2::from_shape_vec((n, 2), flat).unwrap(), y)
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_estimators: 15,
            ..Default::default()
        }
    }

    #[test]
    fn test_learns_separable_data() {
        let (x, y) = separable(300);
        let forest = RandomForestClassifier::fit(&x, &y, small_config()).unwrap();

        assert_eq!(forest.classes(), &[0, 1]);
        assert_eq!(forest.n_trees(), 15);
        let p_high = forest.predict_probability(arr1(&[90.0, 3.0]).view()).unwrap();
        let p_low = forest.predict_probability(arr1(&[10.0, 3.0]).view()).unwrap();
        assert!(p_high > 0.9, "p_high = {}", p_high);
        assert!(p_low < 0.1, "p_low = {}", p_low);
        assert_eq!(forest.predict(arr1(&[75.0, 0.0]).view()).unwrap(), 1);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = separable(120);
        let forest = RandomForestClassifier::fit(&x, &y, small_config()).unwrap();
        let proba = forest.predict_proba(arr1(&[51.0, 8.0]).view()).unwrap();
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_reproduces_model() {
        let (x, y) = separable(200);
        let a = RandomForestClassifier::fit(&x, &y, small_config()).unwrap();
        let b = RandomForestClassifier::fit(&x, &y, small_config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = Array2::zeros((4, 2));
        let err = RandomForestClassifier::fit(&x, &[0, 0, 0, 0], small_config()).unwrap_err();
        assert_eq!(err, TrainingError::SingleClass(0));
    }

    #[test]
    fn test_length_mismatch() {
        let x = Array2::zeros((3, 2));
        let err = RandomForestClassifier::fit(&x, &[0, 1], small_config()).unwrap_err();
        assert!(matches!(err, TrainingError::LengthMismatch { .. }));
    }

    #[test]
    fn test_wrong_width_rejected() {
        let (x, y) = separable(50);
        let forest = RandomForestClassifier::fit(&x, &y, small_config()).unwrap();
        let err = forest.predict_proba(arr1(&[1.0]).view()).unwrap_err();
        assert_eq!(
            err,
            InferenceError::InvalidInputShape {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_max_depth_zero_is_prior() {
        let (x, y) = separable(100);
        let config = ForestConfig {
            max_depth: Some(0),
            bootstrap: false,
            n_estimators: 3,
            ..Default::default()
        };
        let forest = RandomForestClassifier::fit(&x, &y, config).unwrap();
        let positives = y.iter().filter(|&&l| l == 1).count() as f64 / y.len() as f64;
        let p = forest.predict_probability(arr1(&[0.0, 0.0]).view()).unwrap();
        assert!((p - positives).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config() {
        let config = ForestConfig {
            n_estimators: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_probabilities_form_distribution(
            n in 20usize..150,
            seed in any::<u64>(),
            x0 in -1e3f64..1e3,
            x1 in -1e3f64..1e3,
        ) {
            let (x, y) = separable(n);
            let config = ForestConfig {
                n_estimators: 5,
                seed,
                ..Default::default()
            };
            let forest = RandomForestClassifier::fit(&x, &y, config).unwrap();
            let proba = forest.predict_proba(arr1(&[x0, x1]).view()).unwrap();
            prop_assert_eq!(proba.len(), 2);
            prop_assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
            prop_assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
    }
}
