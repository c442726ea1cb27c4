//! Risk Scoring
//!
//! `risk_score = w_failure * p + w_wear * wear_scaled + w_anomaly * anomaly_flag`
//! with default weights 0.5 / 0.3 / 0.2.

use crate::model::{OutlierDetector, ProbabilisticClassifier};
use crate::InferenceError;
use data_validator::{ValidationError, WearScale};
use ndarray::ArrayView1;
use risk_classifier::{RiskClassifier, RiskLabel, RiskThresholds};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Blend weights of the three risk signals
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskWeights {
    /// Weight of the failure probability (default: 0.5)
    pub failure: f64,
    /// Weight of the scaled tool wear (default: 0.3)
    pub wear: f64,
    /// Weight of the anomaly flag (default: 0.2)
    pub anomaly: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            failure: 0.5,
            wear: 0.3,
            anomaly: 0.2,
        }
    }
}

impl RiskWeights {
    /// Reject negative or non-finite weights. Weights not summing to one are
    /// accepted but push scores outside [0, 1].
    pub fn validate(&self) -> Result<(), InferenceError> {
        let all = [self.failure, self.wear, self.anomaly];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(InferenceError::InvalidWeights(format!(
                "weights must be finite and non-negative, got {:?}",
                self
            )));
        }
        let sum: f64 = all.iter().sum();
        if sum == 0.0 {
            return Err(InferenceError::InvalidWeights("all weights are zero".to_string()));
        }
        if (sum - 1.0).abs() > 1e-9 {
            warn!("Risk weights sum to {}, scores may leave [0, 1]", sum);
        }
        Ok(())
    }

    /// Weighted blend of the three signals
    pub fn blend(&self, failure_probability: f64, wear_scaled: f64, anomaly_flag: u8) -> f64 {
        self.failure * failure_probability
            + self.wear * wear_scaled
            + self.anomaly * f64::from(anomaly_flag)
    }
}

/// Scored reading
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Probability of the failure class in [0, 1]
    pub failure_probability: f64,
    /// 1 if the anomaly model flagged the reading, else 0
    pub anomaly_flag: u8,
    /// Min-max scaled tool wear in [0, 1]
    pub wear_scaled: f64,
    /// Weighted blend of the signals above
    pub risk_score: f64,
    /// Tier derived from `risk_score`
    pub risk_label: RiskLabel,
}

impl RiskAssessment {
    pub fn is_anomaly(&self) -> bool {
        self.anomaly_flag == 1
    }
}

/// Scorer holding the blend weights and tier thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskScorer {
    weights: RiskWeights,
    classifier: RiskClassifier,
}

impl RiskScorer {
    /// Create a scorer, validating weights and thresholds
    pub fn new(weights: RiskWeights, thresholds: RiskThresholds) -> Result<Self, InferenceError> {
        weights.validate()?;
        Ok(Self {
            weights,
            classifier: RiskClassifier::new(thresholds)?,
        })
    }

    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        self.classifier.thresholds()
    }

    /// Score one aligned feature row
    pub fn score(
        &self,
        aligned: ArrayView1<'_, f64>,
        raw_wear: f64,
        wear_scale: &WearScale,
        failure_model: &dyn ProbabilisticClassifier,
        anomaly_model: &dyn OutlierDetector,
    ) -> Result<RiskAssessment, InferenceError> {
        if !raw_wear.is_finite() {
            return Err(ValidationError::NonFinite {
                field: "tool_wear".to_string(),
                value: raw_wear,
            }
            .into());
        }

        let failure_probability = failure_model.predict_probability(aligned)?;
        let anomaly_flag = u8::from(anomaly_model.is_outlier(aligned)?);
        let wear_scaled = wear_scale.scale(raw_wear);
        let risk_score = self.weights.blend(failure_probability, wear_scaled, anomaly_flag);
        let risk_label = self.classifier.classify(risk_score)?;

        debug!(
            "Risk {:.3} ({}): p={:.3}, wear={:.3}, anomaly={}",
            risk_score, risk_label, failure_probability, wear_scaled, anomaly_flag
        );

        Ok(RiskAssessment {
            failure_probability,
            anomaly_flag,
            wear_scaled,
            risk_score,
            risk_label,
        })
    }
}

impl Default for RiskScorer {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            classifier: RiskClassifier::default(),
        }
    }
}

/// Score one aligned row with the default weights and thresholds.
///
/// Fails with `DegenerateScale` when `wear_max == wear_min`.
pub fn score(
    aligned: ArrayView1<'_, f64>,
    raw_wear: f64,
    wear_min: f64,
    wear_max: f64,
    failure_model: &dyn ProbabilisticClassifier,
    anomaly_model: &dyn OutlierDetector,
) -> Result<RiskAssessment, InferenceError> {
    let wear_scale = WearScale::new(wear_min, wear_max)?;
    RiskScorer::default().score(aligned, raw_wear, &wear_scale, failure_model, anomaly_model)
}
