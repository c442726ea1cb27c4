//! Validation Error Types

use thiserror::Error;

/// Errors during data validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// NaN or infinite numeric input
    #[error("{field} value {value} is not a finite number")]
    NonFinite { field: String, value: f64 },

    /// Categorical value outside the accepted domain
    #[error("Unknown {field} '{value}', expected one of {allowed:?}")]
    UnknownCategory {
        field: &'static str,
        value: String,
        allowed: Vec<String>,
    },

    /// Missing required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Scaling bounds with zero range
    #[error("Degenerate scale: min {min} equals max {max}")]
    DegenerateScale { min: f64, max: f64 },
}
