//! Train, batch-score and assess commands

use anyhow::{bail, Context, Result};
use data_validator::ReadingValidator;
use feature_engine::{fields, FeatureSchema, RawReading};
use inference_engine::{BatchScorer, BatchSummary, RiskAssessment};
use model_training::train;
use risk_classifier::RiskLabel;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use storage::{write_scored, ArtifactManifest, ArtifactStore, DataTable, LoadedModels};
use tracing::info;

use crate::config::AppConfig;

/// Train both models on a labelled CSV and persist them
pub fn train_command(config: &AppConfig, data: &Path) -> Result<ArtifactManifest> {
    let schema = FeatureSchema::machine();
    let table = DataTable::read_path(data)
        .with_context(|| format!("failed to read training data {}", data.display()))?;
    let dataset = table.labeled(&schema, fields::MACHINE_FAILURE)?;

    let models = train(&dataset, &schema, &config.training).context("training failed")?;
    let manifest = ArtifactStore::new(&config.model_dir).save(&models)?;
    info!(
        "Trained on {} rows ({} failures), models in {}",
        manifest.report.rows,
        manifest.report.failures,
        config.model_dir.display()
    );
    Ok(manifest)
}

/// Load the persisted model pair with the configured weights and thresholds
pub fn load_models(config: &AppConfig) -> Result<LoadedModels> {
    let mut loaded = ArtifactStore::new(&config.model_dir)
        .load()
        .with_context(|| format!("failed to load models from {}", config.model_dir.display()))?;
    loaded.bundle = loaded.bundle.with_scorer(config.scoring.scorer()?);
    Ok(loaded)
}

/// Score every row of a CSV and write it back with the result columns.
///
/// An empty label selection writes every row.
pub fn score_command(
    config: &AppConfig,
    input: &Path,
    output: &Path,
    labels: &[RiskLabel],
) -> Result<BatchSummary> {
    let loaded = load_models(config)?;
    let table = DataTable::read_path(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let rows = table.feature_rows(&FeatureSchema::machine());

    let mut scorer = BatchScorer::new(&loaded.bundle);
    if let Some(workers) = config.scoring.batch_workers {
        scorer = scorer.with_workers(workers);
    }
    let outcome = scorer.score(&rows);

    let file = File::create(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    let filter = (!labels.is_empty()).then_some(labels);
    let written = write_scored(BufWriter::new(file), &table, &outcome.results, filter)?;

    info!("Wrote {} rows to {}", written, output.display());
    Ok(outcome.summary)
}

/// Validate and score one reading
pub fn assess_command(config: &AppConfig, reading: &RawReading) -> Result<RiskAssessment> {
    let validation = ReadingValidator::default().validate(reading);
    if !validation.valid {
        let messages: Vec<String> = validation.errors.iter().map(|e| e.to_string()).collect();
        bail!("invalid reading: {}", messages.join("; "));
    }

    let loaded = load_models(config)?;
    Ok(loaded.bundle.assess(reading)?)
}
