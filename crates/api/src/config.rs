//! Application configuration
//!
//! Layered from built-in defaults, an optional TOML file and `PMRISK__`
//! environment variables (`PMRISK__SCORING__WEIGHTS__FAILURE=0.6`).

use anyhow::{Context, Result};
use inference_engine::{RiskScorer, RiskWeights};
use model_training::TrainingConfig;
use risk_classifier::RiskThresholds;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "pm-risk";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory holding the trained model artifacts
    pub model_dir: PathBuf,
    pub training: TrainingConfig,
    pub scoring: ScoringConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            training: TrainingConfig::default(),
            scoring: ScoringConfig::default(),
            server: ServerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Risk scoring parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: RiskWeights,
    pub thresholds: RiskThresholds,
    /// Worker threads for batch scoring (default: all cores)
    pub batch_workers: Option<usize>,
}

impl ScoringConfig {
    /// Validated scorer built from the configured weights and thresholds
    pub fn scorer(&self) -> Result<RiskScorer> {
        RiskScorer::new(self.weights, self.thresholds).context("invalid scoring configuration")
    }
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON log lines
    pub json: bool,
}

impl AppConfig {
    /// Load configuration. An explicit path must exist; the default file is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => config::File::from(p).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: AppConfig = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("PMRISK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("failed to parse configuration")?;

        config.validate()?;
        debug!("Configuration: {:?}", config);
        Ok(config)
    }

    /// Reject weights, thresholds and training settings that cannot work
    pub fn validate(&self) -> Result<()> {
        self.scoring.scorer()?;
        self.training
            .forest
            .validate()
            .context("invalid forest configuration")?;
        self.training
            .isolation
            .validate()
            .context("invalid isolation forest configuration")?;
        Ok(())
    }
}
