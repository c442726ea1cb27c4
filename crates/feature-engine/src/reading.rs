//! Raw machine readings

use crate::fields;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single raw cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Numeric(f64),
    Categorical(String),
}

impl FieldValue {
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            FieldValue::Numeric(v) => Some(*v),
            FieldValue::Categorical(_) => None,
        }
    }

    pub fn as_categorical(&self) -> Option<&str> {
        match self {
            FieldValue::Categorical(s) => Some(s),
            FieldValue::Numeric(_) => None,
        }
    }
}

/// Loosely-typed raw row keyed by field name.
///
/// Rows come from datasets, forms, or previously aligned output; missing
/// fields are detected at alignment time rather than defaulted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    values: BTreeMap<String, FieldValue>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style numeric insert
    pub fn with_numeric(mut self, field: impl Into<String>, value: f64) -> Self {
        self.set_numeric(field, value);
        self
    }

    /// Builder-style categorical insert
    pub fn with_categorical(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_categorical(field, value);
        self
    }

    pub fn set_numeric(&mut self, field: impl Into<String>, value: f64) {
        self.values.insert(field.into(), FieldValue::Numeric(value));
    }

    pub fn set_categorical(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.values
            .insert(field.into(), FieldValue::Categorical(value.into()));
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn numeric(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_numeric)
    }

    pub fn categorical(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_categorical)
    }

    pub fn remove(&mut self, field: &str) -> Option<FieldValue> {
        self.values.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One machine observation, as entered on the manual form or read from a
/// dataset row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    /// Torque (Nm)
    pub torque: f64,
    /// Tool wear (min)
    pub tool_wear: f64,
    /// Rotational speed (rpm)
    pub rotational_speed: f64,
    /// Process temperature (K)
    pub process_temperature: f64,
    /// Machine quality variant, e.g. "L", "M" or "H"
    pub machine_type: String,
}

impl Default for RawReading {
    /// Defaults of the manual entry form
    fn default() -> Self {
        Self {
            torque: 40.0,
            tool_wear: 150.0,
            rotational_speed: 1500.0,
            process_temperature: 310.0,
            machine_type: "L".to_string(),
        }
    }
}

impl RawReading {
    /// Convert into a row keyed by the dataset field names
    pub fn to_row(&self) -> FeatureRow {
        FeatureRow::new()
            .with_numeric(fields::TORQUE, self.torque)
            .with_numeric(fields::TOOL_WEAR, self.tool_wear)
            .with_numeric(fields::ROTATIONAL_SPEED, self.rotational_speed)
            .with_numeric(fields::PROCESS_TEMPERATURE, self.process_temperature)
            .with_categorical(fields::MACHINE_TYPE, self.machine_type.clone())
    }
}

impl From<&RawReading> for FeatureRow {
    fn from(reading: &RawReading) -> Self {
        reading.to_row()
    }
}
