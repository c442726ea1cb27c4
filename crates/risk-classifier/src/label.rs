//! Risk tier labels

use crate::ClassifyError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Operational risk tier, ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    /// Uncritical
    #[serde(rename = "Unkritisch")]
    Unkritisch,
    /// Suspicious
    #[serde(rename = "Verdächtig")]
    Verdaechtig,
    /// High risk
    #[serde(rename = "Hochrisiko")]
    Hochrisiko,
}

impl RiskLabel {
    /// All tiers in ascending order
    pub const ALL: [RiskLabel; 3] = [
        RiskLabel::Unkritisch,
        RiskLabel::Verdaechtig,
        RiskLabel::Hochrisiko,
    ];

    /// Display label as written to datasets
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Unkritisch => "Unkritisch",
            RiskLabel::Verdaechtig => "Verdächtig",
            RiskLabel::Hochrisiko => "Hochrisiko",
        }
    }

    /// English description
    pub fn description(&self) -> &'static str {
        match self {
            RiskLabel::Unkritisch => "uncritical",
            RiskLabel::Verdaechtig => "suspicious",
            RiskLabel::Hochrisiko => "high-risk",
        }
    }

    /// Traffic-light colour used when rendering the tier
    pub fn color(&self) -> &'static str {
        match self {
            RiskLabel::Unkritisch => "green",
            RiskLabel::Verdaechtig => "orange",
            RiskLabel::Hochrisiko => "red",
        }
    }

    /// Position in tier order (0 = lowest)
    pub fn index(&self) -> usize {
        match self {
            RiskLabel::Unkritisch => 0,
            RiskLabel::Verdaechtig => 1,
            RiskLabel::Hochrisiko => 2,
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLabel {
    type Err = ClassifyError;

    /// Accepts the German labels (with or without umlaut) and the English
    /// descriptions, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "unkritisch" | "uncritical" => Ok(RiskLabel::Unkritisch),
            "verdächtig" | "verdaechtig" | "suspicious" => Ok(RiskLabel::Verdaechtig),
            "hochrisiko" | "high-risk" | "high_risk" => Ok(RiskLabel::Hochrisiko),
            _ => Err(ClassifyError::UnknownLabel(s.to_string())),
        }
    }
}
