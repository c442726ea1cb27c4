//! Storage Layer
//!
//! Persists trained model pairs as versioned artifacts and moves tabular
//! machine data in and out of CSV files.

mod artifact;
mod dataset;

pub use artifact::{
    ArtifactKind, ArtifactManifest, ArtifactStore, LoadedModels, ModelArtifact,
    ANOMALY_MODEL_FILE, ARTIFACT_FORMAT_VERSION, FAILURE_MODEL_FILE, MANIFEST_FILE,
};
pub use dataset::{write_scored, DataTable, RESULT_COLUMNS};

use inference_engine::InferenceError;
use model_training::TrainingError;
use std::path::PathBuf;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to encode artifact: {0}")]
    Encode(String),
    #[error("Failed to decode artifact {path}: {detail}")]
    Decode { path: PathBuf, detail: String },
    #[error("Manifest error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No trained models in {0}")]
    MissingArtifact(PathBuf),
    #[error("{path} has format version {found}, expected {expected}")]
    VersionMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
    #[error("{path} holds a {found} artifact, expected {expected}")]
    KindMismatch {
        path: PathBuf,
        found: ArtifactKind,
        expected: ArtifactKind,
    },
    #[error("Dataset has no column '{0}'")]
    MissingColumn(String),
    #[error("Row {row}: invalid value '{value}' in column '{column}'")]
    InvalidCell {
        row: usize,
        column: String,
        value: String,
    },
    #[error("Dataset has {rows} rows but {results} results")]
    LengthMismatch { rows: usize, results: usize },
    #[error(transparent)]
    Inference(#[from] InferenceError),
    #[error(transparent)]
    Training(#[from] TrainingError),
}
