//! Feature schema: which raw fields a model is trained on, and how

use crate::fields;
use serde::{Deserialize, Serialize};

/// How a raw field is encoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// Passed through as a raw numeric value
    Numeric,
    /// One-hot encoded with the first sorted level dropped
    Categorical,
}

/// A single raw feature field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Numeric,
        }
    }

    pub fn categorical(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Categorical,
        }
    }
}

/// Ordered list of raw fields fed to training
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    fields: Vec<FieldSpec>,
}

impl FeatureSchema {
    /// Create a schema from an ordered field list
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Schema of the machine failure dataset
    pub fn machine() -> Self {
        Self::new(vec![
            FieldSpec::numeric(fields::TORQUE),
            FieldSpec::numeric(fields::TOOL_WEAR),
            FieldSpec::numeric(fields::ROTATIONAL_SPEED),
            FieldSpec::numeric(fields::PROCESS_TEMPERATURE),
            FieldSpec::categorical(fields::MACHINE_TYPE),
        ])
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Numeric fields in schema order
    pub fn numeric_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Numeric)
    }

    /// Categorical fields in schema order
    pub fn categorical_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.kind == FieldKind::Categorical)
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::machine()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_schema_order() {
        let schema = FeatureSchema::machine();
        let numeric: Vec<_> = schema.numeric_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(
            numeric,
            vec![
                fields::TORQUE,
                fields::TOOL_WEAR,
                fields::ROTATIONAL_SPEED,
                fields::PROCESS_TEMPERATURE
            ]
        );
        assert_eq!(schema.categorical_fields().count(), 1);
        assert_eq!(
            schema.field(fields::MACHINE_TYPE).map(|f| f.kind),
            Some(FieldKind::Categorical)
        );
    }
}
