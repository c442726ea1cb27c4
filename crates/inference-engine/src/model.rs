//! Model capability interfaces
//!
//! Any backend that can produce class probabilities or outlier verdicts for an
//! aligned feature row can be plugged into the scorer, including test stubs.

use crate::InferenceError;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Outcome class label of the failure model
pub type ClassLabel = u8;

/// Label of the positive (failure) class
pub const FAILURE_CLASS: ClassLabel = 1;

/// Per-class probabilities keyed by class label, not by position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassProbabilities {
    entries: Vec<(ClassLabel, f64)>,
}

impl ClassProbabilities {
    pub fn new(entries: Vec<(ClassLabel, f64)>) -> Self {
        Self { entries }
    }

    /// Binary output with the given failure probability
    pub fn binary(failure_probability: f64) -> Self {
        Self::new(vec![
            (0, 1.0 - failure_probability),
            (FAILURE_CLASS, failure_probability),
        ])
    }

    /// Probability of a class label
    pub fn get(&self, label: ClassLabel) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, p)| *p)
    }

    pub fn entries(&self) -> &[(ClassLabel, f64)] {
        &self.entries
    }
}

/// Supervised model estimating the probability of machine failure
pub trait ProbabilisticClassifier: Send + Sync {
    /// Probabilities for every class the model knows
    fn class_probabilities(
        &self,
        features: ArrayView1<'_, f64>,
    ) -> Result<ClassProbabilities, InferenceError>;

    /// Probability of the failure class, selected by label
    fn predict_probability(&self, features: ArrayView1<'_, f64>) -> Result<f64, InferenceError> {
        let probabilities = self.class_probabilities(features)?;
        let p = probabilities
            .get(FAILURE_CLASS)
            .ok_or(InferenceError::MissingFailureClass(FAILURE_CLASS))?;
        if (0.0..=1.0).contains(&p) {
            Ok(p)
        } else {
            Err(InferenceError::InvalidProbability(p))
        }
    }
}

/// Unsupervised model flagging statistically unusual readings
pub trait OutlierDetector: Send + Sync {
    fn is_outlier(&self, features: ArrayView1<'_, f64>) -> Result<bool, InferenceError>;
}
