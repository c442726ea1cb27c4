//! Feature Engineering Engine
//!
//! Turns raw machine readings into the fixed-width numeric feature matrix a
//! trained model expects. The column layout is owned by a
//! [`ReferenceColumnSet`] fixed at training time; every inference path goes
//! through [`align`] against that set.

mod columns;
mod features;
mod reading;
mod schema;

pub use columns::{CategoricalDomain, Column, ReferenceColumnSet, COLUMN_SET_VERSION};
pub use features::{align, align_one, AlignedFeatures};
pub use reading::{FeatureRow, FieldValue, RawReading};
pub use schema::{FeatureSchema, FieldKind, FieldSpec};

use thiserror::Error;

/// Field names of the machine dataset.
pub mod fields {
    /// Torque in Nm
    pub const TORQUE: &str = "Torque [Nm]";
    /// Tool wear in minutes
    pub const TOOL_WEAR: &str = "Tool wear [min]";
    /// Rotational speed in rpm
    pub const ROTATIONAL_SPEED: &str = "Rotational speed [rpm]";
    /// Process temperature in Kelvin
    pub const PROCESS_TEMPERATURE: &str = "Process temperature [K]";
    /// Machine quality variant (L/M/H)
    pub const MACHINE_TYPE: &str = "Type";
    /// Known binary outcome used for training
    pub const MACHINE_FAILURE: &str = "Machine failure";
}

/// Errors during feature encoding and alignment
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// Input does not carry what the reference column set requires
    #[error("Schema mismatch on field '{field}': {detail}")]
    SchemaMismatch { field: String, detail: String },
}

impl FeatureError {
    pub(crate) fn schema(field: impl Into<String>, detail: impl Into<String>) -> Self {
        FeatureError::SchemaMismatch {
            field: field.into(),
            detail: detail.into(),
        }
    }
}
