//! Training Pipeline
//!
//! One stateless run: derive the reference column set, align the dataset,
//! fit both models against the identical matrix, and fix the wear scale.

use crate::forest::{ForestConfig, RandomForestClassifier};
use crate::isolation::{IsolationConfig, IsolationForest};
use crate::TrainingError;
use data_validator::WearScale;
use feature_engine::{align, fields, FeatureRow, FeatureSchema, ReferenceColumnSet};
use inference_engine::{ClassLabel, OutlierDetector, FAILURE_CLASS};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub forest: ForestConfig,
    pub isolation: IsolationConfig,
    /// Numeric field whose range becomes the wear scale
    pub wear_field: String,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            forest: ForestConfig::default(),
            isolation: IsolationConfig::default(),
            wear_field: fields::TOOL_WEAR.to_string(),
        }
    }
}

impl TrainingConfig {
    /// Use one seed for both models
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.forest.seed = seed;
        self.isolation.seed = seed;
        self
    }
}

/// Raw rows with their known outcome
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledDataset {
    rows: Vec<FeatureRow>,
    outcomes: Vec<ClassLabel>,
}

impl LabeledDataset {
    pub fn new(rows: Vec<FeatureRow>, outcomes: Vec<ClassLabel>) -> Result<Self, TrainingError> {
        if rows.len() != outcomes.len() {
            return Err(TrainingError::LengthMismatch {
                rows: rows.len(),
                outcomes: outcomes.len(),
            });
        }
        Ok(Self { rows, outcomes })
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn outcomes(&self) -> &[ClassLabel] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Summary of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub rows: usize,
    pub failures: usize,
    pub columns: usize,
    /// Failure model accuracy on its own training rows
    pub training_accuracy: f64,
    /// Share of training rows the anomaly model flags
    pub outlier_fraction: f64,
}

/// Output of a training run: both models plus the schema they share
#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub failure_model: RandomForestClassifier,
    pub anomaly_model: IsolationForest,
    pub columns: ReferenceColumnSet,
    pub wear_field: String,
    pub wear_scale: WearScale,
    pub report: TrainingReport,
}

/// Fit the failure and anomaly models on a labelled dataset
pub fn train(
    dataset: &LabeledDataset,
    schema: &FeatureSchema,
    config: &TrainingConfig,
) -> Result<TrainedModels, TrainingError> {
    if dataset.is_empty() {
        return Err(TrainingError::EmptyDataset);
    }
    config.forest.validate()?;
    config.isolation.validate()?;

    let first = dataset.outcomes[0];
    if dataset.outcomes.iter().all(|&o| o == first) {
        return Err(TrainingError::SingleClass(first));
    }

    info!(
        "Training on {} rows with {} raw fields",
        dataset.len(),
        schema.fields().len()
    );

    let columns = ReferenceColumnSet::fit(schema, dataset.rows())?;
    info!("Reference columns: {}", columns);

    let x = align(dataset.rows(), &columns)?;
    let wear = x.column(&config.wear_field).ok_or_else(|| {
        TrainingError::InvalidConfig(format!(
            "wear field '{}' is not a numeric feature column",
            config.wear_field
        ))
    })?;
    let wear_scale = WearScale::fit(wear.iter().copied())?;

    let failure_model = RandomForestClassifier::fit(x.values(), dataset.outcomes(), config.forest)?;
    let anomaly_model = IsolationForest::fit(x.values(), config.isolation)?;

    let mut correct = 0usize;
    let mut outliers = 0usize;
    for (row, &outcome) in x.values().rows().into_iter().zip(dataset.outcomes()) {
        if failure_model.predict(row)? == outcome {
            correct += 1;
        }
        if anomaly_model.is_outlier(row)? {
            outliers += 1;
        }
    }

    let n = dataset.len() as f64;
    let report = TrainingReport {
        rows: dataset.len(),
        failures: dataset
            .outcomes()
            .iter()
            .filter(|&&o| o == FAILURE_CLASS)
            .count(),
        columns: columns.len(),
        training_accuracy: correct as f64 / n,
        outlier_fraction: outliers as f64 / n,
    };

    info!(
        "Training done: {} failures in {} rows, accuracy {:.4}, outliers {:.4}, wear [{}, {}]",
        report.failures,
        report.rows,
        report.training_accuracy,
        report.outlier_fraction,
        wear_scale.min(),
        wear_scale.max()
    );

    Ok(TrainedModels {
        failure_model,
        anomaly_model,
        columns,
        wear_field: config.wear_field.clone(),
        wear_scale,
        report,
    })
}
