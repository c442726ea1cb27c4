//! Model artifact store
//!
//! A model directory holds two postcard blobs, one per model, each carrying
//! the reference column set it was trained on, plus a JSON manifest with the
//! wear scale and the training report. All three files carry the id of the
//! training run that wrote them and are only loaded as a matching set.

use crate::StorageError;
use chrono::{DateTime, Utc};
use data_validator::WearScale;
use feature_engine::{ReferenceColumnSet, COLUMN_SET_VERSION};
use inference_engine::{InferenceError, ModelBundle};
use model_training::{IsolationForest, RandomForestClassifier, TrainedModels, TrainingReport};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Bump when the artifact layout changes
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

pub const FAILURE_MODEL_FILE: &str = "failure_model.bin";
pub const ANOMALY_MODEL_FILE: &str = "anomaly_model.bin";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Which model an artifact holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    FailureModel,
    AnomalyModel,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::FailureModel => write!(f, "failure model"),
            ArtifactKind::AnomalyModel => write!(f, "anomaly model"),
        }
    }
}

/// One persisted model together with its training column set.
///
/// `format_version` and `kind` lead the encoding so they can be checked
/// before the model body is decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact<M> {
    pub format_version: u32,
    pub kind: ArtifactKind,
    /// Training run that produced the artifact
    pub run_id: Uuid,
    pub columns: ReferenceColumnSet,
    pub model: M,
}

/// Human-readable description of a trained model pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub format_version: u32,
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub seed: u64,
    pub wear_field: String,
    pub wear_min: f64,
    pub wear_max: f64,
    pub columns: Vec<String>,
    pub report: TrainingReport,
}

/// Models loaded from a directory, ready for scoring
pub struct LoadedModels {
    pub bundle: ModelBundle,
    pub manifest: ArtifactManifest,
}

/// Directory-backed store for one trained model pair
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True if all three files are present
    pub fn exists(&self) -> bool {
        [FAILURE_MODEL_FILE, ANOMALY_MODEL_FILE, MANIFEST_FILE]
            .iter()
            .all(|f| self.dir.join(f).is_file())
    }

    /// Persist a trained pair, replacing any previous one.
    ///
    /// Each file is written next to its target and renamed into place; the
    /// manifest goes last.
    pub fn save(&self, models: &TrainedModels) -> Result<ArtifactManifest, StorageError> {
        fs::create_dir_all(&self.dir)?;
        let run_id = Uuid::new_v4();

        write_artifact(
            &self.dir.join(FAILURE_MODEL_FILE),
            &ModelArtifact {
                format_version: ARTIFACT_FORMAT_VERSION,
                kind: ArtifactKind::FailureModel,
                run_id,
                columns: models.columns.clone(),
                model: &models.failure_model,
            },
        )?;
        write_artifact(
            &self.dir.join(ANOMALY_MODEL_FILE),
            &ModelArtifact {
                format_version: ARTIFACT_FORMAT_VERSION,
                kind: ArtifactKind::AnomalyModel,
                run_id,
                columns: models.columns.clone(),
                model: &models.anomaly_model,
            },
        )?;

        let manifest = ArtifactManifest {
            format_version: ARTIFACT_FORMAT_VERSION,
            run_id,
            trained_at: Utc::now(),
            seed: models.failure_model.config().seed,
            wear_field: models.wear_field.clone(),
            wear_min: models.wear_scale.min(),
            wear_max: models.wear_scale.max(),
            columns: models.columns.names(),
            report: models.report.clone(),
        };
        replace_file(
            &self.dir.join(MANIFEST_FILE),
            &serde_json::to_vec_pretty(&manifest)?,
        )?;

        info!("Saved model artifacts of run {} to {}", run_id, self.dir.display());
        Ok(manifest)
    }

    /// Read the manifest only
    pub fn manifest(&self) -> Result<ArtifactManifest, StorageError> {
        let path = self.dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Err(StorageError::MissingArtifact(self.dir.clone()));
        }
        let manifest: ArtifactManifest = serde_json::from_slice(&fs::read(&path)?)?;
        if manifest.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(StorageError::VersionMismatch {
                path,
                found: manifest.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        Ok(manifest)
    }

    /// Load both models and pair them into a bundle
    pub fn load(&self) -> Result<LoadedModels, StorageError> {
        if !self.exists() {
            return Err(StorageError::MissingArtifact(self.dir.clone()));
        }
        let manifest = self.manifest()?;

        let failure: ModelArtifact<RandomForestClassifier> = read_artifact(
            &self.dir.join(FAILURE_MODEL_FILE),
            ArtifactKind::FailureModel,
        )?;
        let anomaly: ModelArtifact<IsolationForest> = read_artifact(
            &self.dir.join(ANOMALY_MODEL_FILE),
            ArtifactKind::AnomalyModel,
        )?;

        for artifact_run in [failure.run_id, anomaly.run_id] {
            if artifact_run != manifest.run_id {
                warn!("Model directory mixes artifacts of different training runs");
                return Err(InferenceError::ArtifactMismatch(format!(
                    "manifest belongs to run {}, found an artifact of run {}",
                    manifest.run_id, artifact_run
                ))
                .into());
            }
        }

        if failure.columns.names() != manifest.columns {
            warn!("Manifest columns disagree with the failure model artifact");
            return Err(InferenceError::ArtifactMismatch(format!(
                "manifest lists columns {:?}, failure model was trained on {:?}",
                manifest.columns,
                failure.columns.names()
            ))
            .into());
        }

        let wear_scale =
            WearScale::new(manifest.wear_min, manifest.wear_max).map_err(InferenceError::from)?;
        let bundle = ModelBundle::new(
            Arc::new(failure.model),
            failure.columns,
            Arc::new(anomaly.model),
            anomaly.columns,
            wear_scale,
        )?
        .with_wear_field(manifest.wear_field.clone());

        info!(
            "Loaded models trained at {} from {}",
            manifest.trained_at,
            self.dir.display()
        );
        Ok(LoadedModels { bundle, manifest })
    }
}

fn write_artifact<M: Serialize>(
    path: &Path,
    artifact: &ModelArtifact<M>,
) -> Result<(), StorageError> {
    let bytes =
        postcard::to_allocvec(artifact).map_err(|e| StorageError::Encode(e.to_string()))?;
    replace_file(path, &bytes)?;
    debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_artifact<M: DeserializeOwned>(
    path: &Path,
    expected: ArtifactKind,
) -> Result<ModelArtifact<M>, StorageError> {
    let bytes = fs::read(path)?;
    let decode_err = |e: postcard::Error| StorageError::Decode {
        path: path.to_path_buf(),
        detail: e.to_string(),
    };

    let ((format_version, kind), _) =
        postcard::take_from_bytes::<(u32, ArtifactKind)>(&bytes).map_err(decode_err)?;
    if format_version != ARTIFACT_FORMAT_VERSION {
        return Err(StorageError::VersionMismatch {
            path: path.to_path_buf(),
            found: format_version,
            expected: ARTIFACT_FORMAT_VERSION,
        });
    }
    if kind != expected {
        return Err(StorageError::KindMismatch {
            path: path.to_path_buf(),
            found: kind,
            expected,
        });
    }

    let artifact: ModelArtifact<M> = postcard::from_bytes(&bytes).map_err(decode_err)?;
    if artifact.columns.version() != COLUMN_SET_VERSION {
        return Err(StorageError::VersionMismatch {
            path: path.to_path_buf(),
            found: artifact.columns.version(),
            expected: COLUMN_SET_VERSION,
        });
    }
    artifact.columns.validate().map_err(InferenceError::from)?;
    Ok(artifact)
}
