//! Model Training
//!
//! Fits the failure classifier (random forest) and the anomaly detector
//! (isolation forest) on a labelled reference dataset and fixes the reference
//! column set both models are paired with.

mod forest;
mod isolation;
mod pipeline;

pub use forest::{ForestConfig, RandomForestClassifier};
pub use isolation::{IsolationConfig, IsolationForest};
pub use pipeline::{train, LabeledDataset, TrainedModels, TrainingConfig, TrainingReport};

use data_validator::ValidationError;
use feature_engine::FeatureError;
use inference_engine::{ClassLabel, InferenceError};
use thiserror::Error;

/// Errors during training. All of them abort the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrainingError {
    #[error("Training dataset is empty")]
    EmptyDataset,
    #[error("Outcome column holds a single class ({0}); need both failure and non-failure rows")]
    SingleClass(ClassLabel),
    #[error("Dataset has {rows} rows but {outcomes} outcomes")]
    LengthMismatch { rows: usize, outcomes: usize },
    #[error("Invalid training config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Scale(#[from] ValidationError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}
