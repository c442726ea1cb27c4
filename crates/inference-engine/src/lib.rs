//! Risk Inference Engine
//!
//! Combines a failure-probability model, an outlier detector and scaled tool
//! wear into one weighted risk score, then classifies it into a risk tier.

mod batcher;
mod bundle;
mod engine;
mod model;

pub use batcher::{BatchOutcome, BatchScorer, BatchSummary};
pub use bundle::ModelBundle;
pub use engine::{score, RiskAssessment, RiskScorer, RiskWeights};
pub use model::{ClassLabel, ClassProbabilities, OutlierDetector, ProbabilisticClassifier, FAILURE_CLASS};

use data_validator::ValidationError;
use feature_engine::FeatureError;
use risk_classifier::ClassifyError;
use thiserror::Error;

/// Errors during inference
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Scale(#[from] ValidationError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
    #[error("Artifact mismatch: {0}")]
    ArtifactMismatch(String),
    #[error("Invalid failure probability {0}: expected a value in [0, 1]")]
    InvalidProbability(f64),
    #[error("Model output has no probability for failure class {0}")]
    MissingFailureClass(ClassLabel),
    #[error("Invalid risk weights: {0}")]
    InvalidWeights(String),
    #[error("Invalid input shape: expected {expected} features, got {actual}")]
    InvalidInputShape { expected: usize, actual: usize },
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
}
