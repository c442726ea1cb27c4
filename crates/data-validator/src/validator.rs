//! Reading Validator for Range Checking

use crate::error::ValidationError;
use feature_engine::{fields, RawReading};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Validation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Torque valid range (Nm)
    pub torque_range: (f64, f64),
    /// Tool wear valid range (min)
    pub tool_wear_range: (f64, f64),
    /// Rotational speed valid range (rpm)
    pub speed_range: (f64, f64),
    /// Process temperature valid range (K)
    pub temperature_range: (f64, f64),
    /// Accepted machine types
    pub machine_types: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            torque_range: (0.0, 100.0),
            tool_wear_range: (0.0, 250.0),
            speed_range: (0.0, 3000.0),
            temperature_range: (250.0, 400.0),
            machine_types: vec!["L".to_string(), "M".to_string(), "H".to_string()],
        }
    }
}

/// Result of validation
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Whether all values are valid
    pub valid: bool,
    /// List of validation errors
    pub errors: Vec<ValidationError>,
    /// Number of fields validated
    pub fields_checked: usize,
}

impl ValidationResult {
    /// Create a valid result
    pub fn valid(fields_checked: usize) -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            fields_checked,
        }
    }

    /// Create an invalid result with errors
    pub fn invalid(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        Self {
            valid: false,
            errors,
            fields_checked,
        }
    }

    fn from_errors(errors: Vec<ValidationError>, fields_checked: usize) -> Self {
        if errors.is_empty() {
            Self::valid(fields_checked)
        } else {
            Self::invalid(errors, fields_checked)
        }
    }
}

/// Validator for manually entered machine readings
pub struct ReadingValidator {
    config: ValidationConfig,
}

impl ReadingValidator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NonFinite {
                field: field.to_string(),
                value,
            });
        }
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    /// Validate machine type against the accepted domain
    pub fn validate_machine_type(&self, machine_type: &str) -> Result<(), ValidationError> {
        if self.config.machine_types.iter().any(|t| t == machine_type) {
            Ok(())
        } else {
            Err(ValidationError::UnknownCategory {
                field: fields::MACHINE_TYPE,
                value: machine_type.to_string(),
                allowed: self.config.machine_types.clone(),
            })
        }
    }

    /// Validate every field of a reading, collecting all violations
    pub fn validate(&self, reading: &RawReading) -> ValidationResult {
        let checks = [
            self.validate_range(fields::TORQUE, reading.torque, self.config.torque_range),
            self.validate_range(fields::TOOL_WEAR, reading.tool_wear, self.config.tool_wear_range),
            self.validate_range(
                fields::ROTATIONAL_SPEED,
                reading.rotational_speed,
                self.config.speed_range,
            ),
            self.validate_range(
                fields::PROCESS_TEMPERATURE,
                reading.process_temperature,
                self.config.temperature_range,
            ),
            self.validate_machine_type(&reading.machine_type),
        ];
        let fields_checked = checks.len();
        let errors: Vec<_> = checks.into_iter().filter_map(Result::err).collect();

        if !errors.is_empty() {
            debug!("Reading rejected with {} violations", errors.len());
        }
        ValidationResult::from_errors(errors, fields_checked)
    }
}

impl Default for ReadingValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_reading_is_valid() {
        let validator = ReadingValidator::default();
        let result = validator.validate(&RawReading::default());
        assert!(result.valid);
        assert_eq!(result.fields_checked, 5);
    }

    #[test]
    fn test_range_bounds_inclusive() {
        let validator = ReadingValidator::default();
        assert!(validator.validate_range(fields::TORQUE, 0.0, (0.0, 100.0)).is_ok());
        assert!(validator.validate_range(fields::TORQUE, 100.0, (0.0, 100.0)).is_ok());
        assert!(validator.validate_range(fields::TORQUE, 100.1, (0.0, 100.0)).is_err());
    }

    #[test]
    fn test_collects_all_violations() {
        let validator = ReadingValidator::default();
        let reading = RawReading {
            torque: -1.0,
            process_temperature: 500.0,
            machine_type: "X".to_string(),
            ..Default::default()
        };
        let result = validator.validate(&reading);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 3);
        assert!(matches!(
            result.errors[2],
            ValidationError::UnknownCategory { .. }
        ));
    }

    #[test]
    fn test_nan_is_rejected() {
        let validator = ReadingValidator::default();
        let reading = RawReading {
            tool_wear: f64::NAN,
            ..Default::default()
        };
        let result = validator.validate(&reading);
        assert_eq!(result.errors.len(), 1);
        assert!(matches!(result.errors[0], ValidationError::NonFinite { .. }));
    }
}
