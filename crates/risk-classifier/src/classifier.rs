//! Threshold-based tier mapping

use crate::label::RiskLabel;
use crate::ClassifyError;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Tier boundaries. Each boundary belongs to the higher tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    /// Scores at or above this are at least suspicious (default: 0.3)
    pub suspicious: f64,
    /// Scores at or above this are high-risk (default: 0.6)
    pub high_risk: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            suspicious: 0.3,
            high_risk: 0.6,
        }
    }
}

impl RiskThresholds {
    /// Check that both boundaries are finite and ordered
    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.suspicious.is_finite()
            && self.high_risk.is_finite()
            && self.suspicious < self.high_risk
        {
            Ok(())
        } else {
            Err(ClassifyError::InvalidThresholds {
                suspicious: self.suspicious,
                high_risk: self.high_risk,
            })
        }
    }
}

/// Risk classifier over fixed thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskClassifier {
    thresholds: RiskThresholds,
}

impl RiskClassifier {
    /// Create a classifier, rejecting unordered thresholds
    pub fn new(thresholds: RiskThresholds) -> Result<Self, ClassifyError> {
        thresholds.validate()?;
        info!(
            "Risk classifier thresholds: suspicious >= {}, high-risk >= {}",
            thresholds.suspicious, thresholds.high_risk
        );
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Map a score onto its tier. Comparisons are strict `<`, so a score equal
    /// to a boundary lands in the higher tier.
    pub fn classify(&self, score: f64) -> Result<RiskLabel, ClassifyError> {
        if !score.is_finite() {
            return Err(ClassifyError::InvalidScore(score));
        }
        let label = if score < self.thresholds.suspicious {
            RiskLabel::Unkritisch
        } else if score < self.thresholds.high_risk {
            RiskLabel::Verdaechtig
        } else {
            RiskLabel::Hochrisiko
        };
        Ok(label)
    }
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self {
            thresholds: RiskThresholds::default(),
        }
    }
}

/// Classify with the default thresholds (0.3 / 0.6)
pub fn classify(score: f64) -> Result<RiskLabel, ClassifyError> {
    RiskClassifier::default().classify(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundaries_belong_to_higher_tier() {
        assert_eq!(classify(0.2999), Ok(RiskLabel::Unkritisch));
        assert_eq!(classify(0.3), Ok(RiskLabel::Verdaechtig));
        assert_eq!(classify(0.5999), Ok(RiskLabel::Verdaechtig));
        assert_eq!(classify(0.6), Ok(RiskLabel::Hochrisiko));
    }

    #[test]
    fn test_out_of_unit_scores_still_classify() {
        assert_eq!(classify(-0.5), Ok(RiskLabel::Unkritisch));
        assert_eq!(classify(1.7), Ok(RiskLabel::Hochrisiko));
    }

    #[test]
    fn test_non_finite_score() {
        assert!(matches!(classify(f64::NAN), Err(ClassifyError::InvalidScore(_))));
        assert_eq!(
            classify(f64::INFINITY),
            Err(ClassifyError::InvalidScore(f64::INFINITY))
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let classifier = RiskClassifier::new(RiskThresholds {
            suspicious: 0.5,
            high_risk: 0.8,
        })
        .unwrap();
        assert_eq!(classifier.classify(0.49), Ok(RiskLabel::Unkritisch));
        assert_eq!(classifier.classify(0.8), Ok(RiskLabel::Hochrisiko));
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let err = RiskClassifier::new(RiskThresholds {
            suspicious: 0.6,
            high_risk: 0.3,
        })
        .unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidThresholds { .. }));
    }

    proptest! {
        #[test]
        fn prop_classification_is_monotonic(a in 0.0f64..1.0, b in 0.0f64..1.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify(lo).unwrap() <= classify(hi).unwrap());
        }
    }
}
