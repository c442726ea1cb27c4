//! Reference Column Set
//!
//! The ordered encoded column layout established at training time. It is the
//! only authority for what a valid feature vector looks like downstream and is
//! persisted next to every trained model.

use crate::reading::FeatureRow;
use crate::schema::FeatureSchema;
use crate::FeatureError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Layout version of [`ReferenceColumnSet`]; bump when the encoding rule changes
pub const COLUMN_SET_VERSION: u32 = 1;

/// One encoded feature column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column {
    /// Raw numeric field passed through
    Numeric { field: String },
    /// 0/1 indicator for one level of a categorical field
    Indicator { field: String, level: String },
}

impl Column {
    /// Encoded column name (`<field>` or `<field>_<level>`)
    pub fn name(&self) -> String {
        match self {
            Column::Numeric { field } => field.clone(),
            Column::Indicator { field, level } => format!("{}_{}", field, level),
        }
    }

    /// Raw field this column is derived from
    pub fn field(&self) -> &str {
        match self {
            Column::Numeric { field } | Column::Indicator { field, .. } => field,
        }
    }
}

/// Full level domain of a categorical field seen at training time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoricalDomain {
    pub field: String,
    /// Sorted levels; the first one is the dropped baseline
    pub levels: Vec<String>,
}

impl CategoricalDomain {
    /// Level encoded as all-zero indicators
    pub fn baseline(&self) -> Option<&str> {
        self.levels.first().map(String::as_str)
    }

    pub fn contains(&self, level: &str) -> bool {
        self.levels.iter().any(|l| l == level)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceColumnSet {
    version: u32,
    columns: Vec<Column>,
    domains: Vec<CategoricalDomain>,
}

impl ReferenceColumnSet {
    /// Derive the column set from a schema and the training rows.
    ///
    /// Numeric fields come first in schema order, followed by each categorical
    /// field's sorted levels with the first level dropped.
    pub fn fit(schema: &FeatureSchema, rows: &[FeatureRow]) -> Result<Self, FeatureError> {
        if rows.is_empty() {
            return Err(FeatureError::schema(
                "<dataset>",
                "no rows to derive reference columns from",
            ));
        }

        let mut columns: Vec<Column> = schema
            .numeric_fields()
            .map(|f| Column::Numeric {
                field: f.name.clone(),
            })
            .collect();

        let mut domains = Vec::new();
        for spec in schema.categorical_fields() {
            let mut levels = BTreeSet::new();
            for (idx, row) in rows.iter().enumerate() {
                match row.categorical(&spec.name) {
                    Some(level) => {
                        levels.insert(level.to_string());
                    }
                    None => {
                        return Err(FeatureError::schema(
                            &spec.name,
                            format!("row {} has no categorical value", idx),
                        ))
                    }
                }
            }

            let levels: Vec<String> = levels.into_iter().collect();
            if levels.is_empty() {
                return Err(FeatureError::schema(&spec.name, "categorical domain is empty"));
            }

            columns.extend(levels.iter().skip(1).map(|level| Column::Indicator {
                field: spec.name.clone(),
                level: level.clone(),
            }));
            domains.push(CategoricalDomain {
                field: spec.name.clone(),
                levels,
            });
        }

        debug!("Fitted reference column set with {} columns", columns.len());

        Ok(Self {
            version: COLUMN_SET_VERSION,
            columns,
            domains,
        })
    }

    /// Rebuild a column set from its parts, e.g. when loading a foreign
    /// artifact. Indicator columns must belong to one of the domains.
    pub fn from_parts(
        columns: Vec<Column>,
        domains: Vec<CategoricalDomain>,
    ) -> Result<Self, FeatureError> {
        let set = Self {
            version: COLUMN_SET_VERSION,
            columns,
            domains,
        };
        set.validate()?;
        Ok(set)
    }

    /// Check a deserialized set: current layout version and every indicator
    /// column backed by a domain level
    pub fn validate(&self) -> Result<(), FeatureError> {
        if self.version != COLUMN_SET_VERSION {
            return Err(FeatureError::schema(
                "<columns>",
                format!(
                    "column set version {} is not supported (expected {})",
                    self.version, COLUMN_SET_VERSION
                ),
            ));
        }
        for column in &self.columns {
            if let Column::Indicator { field, level } = column {
                let known = self
                    .domains
                    .iter()
                    .any(|d| &d.field == field && d.contains(level));
                if !known {
                    return Err(FeatureError::schema(
                        field,
                        format!("indicator level '{}' has no categorical domain", level),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn domains(&self) -> &[CategoricalDomain] {
        &self.domains
    }

    /// Domain of a categorical field
    pub fn domain(&self, field: &str) -> Option<&CategoricalDomain> {
        self.domains.iter().find(|d| d.field == field)
    }

    /// Encoded column names in order
    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(Column::name).collect()
    }

    /// Position of an encoded column
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl fmt::Display for ReferenceColumnSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names().join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::reading::RawReading;

    fn reading(machine_type: &str) -> FeatureRow {
        RawReading {
            machine_type: machine_type.to_string(),
            ..Default::default()
        }
        .to_row()
    }

    #[test]
    fn test_fit_drops_first_sorted_level() {
        let rows = vec![reading("M"), reading("L"), reading("H"), reading("L")];
        let columns = ReferenceColumnSet::fit(&FeatureSchema::machine(), &rows).unwrap();

        assert_eq!(
            columns.names(),
            vec![
                fields::TORQUE.to_string(),
                fields::TOOL_WEAR.to_string(),
                fields::ROTATIONAL_SPEED.to_string(),
                fields::PROCESS_TEMPERATURE.to_string(),
                "Type_L".to_string(),
                "Type_M".to_string(),
            ]
        );
        let domain = columns.domain(fields::MACHINE_TYPE).unwrap();
        assert_eq!(domain.baseline(), Some("H"));
        assert_eq!(columns.version(), COLUMN_SET_VERSION);
    }

    #[test]
    fn test_fit_single_level_has_no_indicator() {
        let rows = vec![reading("L"), reading("L")];
        let columns = ReferenceColumnSet::fit(&FeatureSchema::machine(), &rows).unwrap();
        assert_eq!(columns.len(), 4);
        assert_eq!(columns.position("Type_L"), None);
    }

    #[test]
    fn test_fit_empty_dataset() {
        let err = ReferenceColumnSet::fit(&FeatureSchema::machine(), &[]).unwrap_err();
        assert!(matches!(err, FeatureError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_fit_missing_categorical_value() {
        let mut row = reading("L");
        row.remove(fields::MACHINE_TYPE);
        let err = ReferenceColumnSet::fit(&FeatureSchema::machine(), &[row]).unwrap_err();
        assert_eq!(
            err,
            FeatureError::SchemaMismatch {
                field: fields::MACHINE_TYPE.to_string(),
                detail: "row 0 has no categorical value".to_string(),
            }
        );
    }

    #[test]
    fn test_from_parts_rejects_unknown_level() {
        let columns = vec![Column::Indicator {
            field: "Type".to_string(),
            level: "X".to_string(),
        }];
        let domains = vec![CategoricalDomain {
            field: "Type".to_string(),
            levels: vec!["H".to_string(), "L".to_string()],
        }];
        assert!(ReferenceColumnSet::from_parts(columns, domains).is_err());
    }

    #[test]
    fn test_serde_roundtrip_preserves_equality() {
        let rows = vec![reading("M"), reading("H")];
        let columns = ReferenceColumnSet::fit(&FeatureSchema::machine(), &rows).unwrap();
        let json = serde_json::to_string(&columns).unwrap();
        let back: ReferenceColumnSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, columns);
    }

    #[test]
    fn test_validate_rejects_foreign_version() {
        let rows = vec![reading("M"), reading("H")];
        let columns = ReferenceColumnSet::fit(&FeatureSchema::machine(), &rows).unwrap();
        assert!(columns.validate().is_ok());

        let mut json = serde_json::to_value(&columns).unwrap();
        json["version"] = serde_json::json!(COLUMN_SET_VERSION + 1);
        let foreign: ReferenceColumnSet = serde_json::from_value(json).unwrap();
        let err = foreign.validate().unwrap_err();
        assert!(err.to_string().contains("not supported"));
    }
}
