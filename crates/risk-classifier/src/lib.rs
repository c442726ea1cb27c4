//! Risk Classification
//!
//! Maps a blended risk score onto one of three ordered risk tiers.

mod classifier;
mod distribution;
mod label;

pub use classifier::{classify, RiskClassifier, RiskThresholds};
pub use distribution::TierDistribution;
pub use label::RiskLabel;

use thiserror::Error;

/// Errors during risk classification
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClassifyError {
    #[error("Invalid risk score: {0} is not a finite number")]
    InvalidScore(f64),
    #[error("Invalid thresholds: suspicious {suspicious} must be below high-risk {high_risk}")]
    InvalidThresholds { suspicious: f64, high_risk: f64 },
    #[error("Unknown risk label: {0}")]
    UnknownLabel(String),
}
