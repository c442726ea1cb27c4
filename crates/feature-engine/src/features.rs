//! Feature Alignment
//!
//! Encodes raw rows against a [`ReferenceColumnSet`]: indicator columns for
//! levels a row does not exhibit are zero-filled, unknown columns are dropped,
//! and the output always has exactly the reference columns in reference order.
//! Missing numeric fields are never defaulted.

use crate::columns::{Column, ReferenceColumnSet};
use crate::reading::{FeatureRow, FieldValue};
use crate::FeatureError;
use ndarray::{Array2, ArrayView1};
use tracing::{debug, warn};

/// Numeric feature matrix whose columns equal a reference column set
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedFeatures {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl AlignedFeatures {
    /// Column names, identical to the reference set they were aligned to
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Features of a single row
    pub fn row(&self, idx: usize) -> ArrayView1<'_, f64> {
        self.values.row(idx)
    }

    /// Values of one named column
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.columns
            .iter()
            .position(|c| c == name)
            .map(|idx| self.values.column(idx))
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Re-express the matrix as raw rows of already-encoded numeric columns
    pub fn to_rows(&self) -> Vec<FeatureRow> {
        self.values
            .rows()
            .into_iter()
            .map(|values| {
                let mut row = FeatureRow::new();
                for (name, v) in self.columns.iter().zip(values.iter()) {
                    row.set_numeric(name.clone(), *v);
                }
                row
            })
            .collect()
    }
}

/// Align a batch of rows. Fails on the first row that cannot be encoded.
pub fn align(
    rows: &[FeatureRow],
    reference: &ReferenceColumnSet,
) -> Result<AlignedFeatures, FeatureError> {
    let ncols = reference.len();
    let mut flat = Vec::with_capacity(rows.len() * ncols);

    for (idx, row) in rows.iter().enumerate() {
        let encoded = encode_row(row, reference).map_err(|e| match e {
            FeatureError::SchemaMismatch { field, detail } => FeatureError::SchemaMismatch {
                field,
                detail: format!("row {}: {}", idx, detail),
            },
        })?;
        flat.extend(encoded);
    }

    debug!("Aligned {} rows to {} reference columns", rows.len(), ncols);
    build(reference, rows.len(), flat)
}

/// Align a single row, e.g. a manually entered reading
pub fn align_one(
    row: &FeatureRow,
    reference: &ReferenceColumnSet,
) -> Result<AlignedFeatures, FeatureError> {
    let encoded = encode_row(row, reference)?;
    build(reference, 1, encoded)
}

fn build(
    reference: &ReferenceColumnSet,
    nrows: usize,
    flat: Vec<f64>,
) -> Result<AlignedFeatures, FeatureError> {
    let values = Array2::from_shape_vec((nrows, reference.len()), flat)
        .map_err(|e| FeatureError::schema("<matrix>", e.to_string()))?;
    Ok(AlignedFeatures {
        columns: reference.names(),
        values,
    })
}

fn encode_row(row: &FeatureRow, reference: &ReferenceColumnSet) -> Result<Vec<f64>, FeatureError> {
    for domain in reference.domains() {
        if let Some(level) = row.categorical(&domain.field) {
            if !domain.contains(level) {
                warn!(
                    "Unseen level '{}' for '{}', encoding as all-zero indicators",
                    level, domain.field
                );
            }
        }
    }

    reference
        .columns()
        .iter()
        .map(|column| encode_cell(row, column, reference))
        .collect()
}

fn encode_cell(
    row: &FeatureRow,
    column: &Column,
    reference: &ReferenceColumnSet,
) -> Result<f64, FeatureError> {
    match column {
        Column::Numeric { field } => match row.get(field) {
            Some(FieldValue::Numeric(v)) if v.is_finite() => Ok(*v),
            Some(FieldValue::Numeric(v)) => {
                Err(FeatureError::schema(field, format!("non-finite value {}", v)))
            }
            Some(FieldValue::Categorical(s)) => Err(FeatureError::schema(
                field,
                format!("expected numeric value, found category '{}'", s),
            )),
            None => Err(FeatureError::schema(field, "required numeric field is missing")),
        },
        Column::Indicator { field, level } => match row.get(field) {
            Some(FieldValue::Categorical(value)) => Ok(if value == level { 1.0 } else { 0.0 }),
            Some(FieldValue::Numeric(v)) => Err(FeatureError::schema(
                field,
                format!("expected category, found numeric value {}", v),
            )),
            None => encoded_indicator(row, column, field, reference),
        },
    }
}

/// Indicator taken from a row that is already one-hot encoded
fn encoded_indicator(
    row: &FeatureRow,
    column: &Column,
    field: &str,
    reference: &ReferenceColumnSet,
) -> Result<f64, FeatureError> {
    let name = column.name();
    match row.get(&name) {
        Some(FieldValue::Numeric(v)) if v.is_finite() => Ok(*v),
        Some(other) => Err(FeatureError::schema(
            &name,
            format!("invalid encoded indicator {:?}", other),
        )),
        None => {
            let any_encoded = reference
                .columns()
                .iter()
                .filter(|c| c.field() == field && matches!(c, Column::Indicator { .. }))
                .any(|c| row.contains(&c.name()));
            if any_encoded {
                Ok(0.0)
            } else {
                Err(FeatureError::schema(field, "categorical field is missing"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields;
    use crate::reading::RawReading;
    use crate::schema::FeatureSchema;
    use proptest::prelude::*;

    fn reading(machine_type: &str) -> FeatureRow {
        RawReading {
            torque: 40.0,
            tool_wear: 150.0,
            rotational_speed: 1500.0,
            process_temperature: 310.0,
            machine_type: machine_type.to_string(),
        }
        .to_row()
    }

    fn reference() -> ReferenceColumnSet {
        let rows = vec![reading("L"), reading("M"), reading("H")];
        ReferenceColumnSet::fit(&FeatureSchema::machine(), &rows).unwrap()
    }

    #[test]
    fn test_single_entry_zero_fills_other_levels() {
        let reference = reference();
        let aligned = align_one(&reading("M"), &reference).unwrap();

        assert_eq!(aligned.columns(), reference.names().as_slice());
        assert_eq!(
            aligned.row(0).to_vec(),
            vec![40.0, 150.0, 1500.0, 310.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_baseline_level_is_all_zero() {
        let aligned = align_one(&reading("H"), &reference()).unwrap();
        assert_eq!(aligned.column("Type_L").unwrap()[0], 0.0);
        assert_eq!(aligned.column("Type_M").unwrap()[0], 0.0);
    }

    #[test]
    fn test_unseen_level_keeps_shape() {
        let aligned = align_one(&reading("X"), &reference()).unwrap();
        assert_eq!(aligned.ncols(), 6);
        assert_eq!(aligned.row(0).to_vec()[4..], [0.0, 0.0]);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let row = reading("L")
            .with_numeric("UDI", 17.0)
            .with_categorical("Product ID", "L47196")
            .with_numeric(fields::MACHINE_FAILURE, 1.0);
        let aligned = align_one(&row, &reference()).unwrap();
        assert_eq!(aligned.ncols(), 6);
        assert_eq!(aligned.column("Type_L").unwrap()[0], 1.0);
    }

    #[test]
    fn test_missing_numeric_field_fails() {
        let mut row = reading("L");
        row.remove(fields::TORQUE);
        let err = align_one(&row, &reference()).unwrap_err();
        assert_eq!(
            err,
            FeatureError::SchemaMismatch {
                field: fields::TORQUE.to_string(),
                detail: "required numeric field is missing".to_string(),
            }
        );
    }

    #[test]
    fn test_numeric_field_with_category_fails() {
        let row = reading("L").with_categorical(fields::TOOL_WEAR, "high");
        assert!(align_one(&row, &reference()).is_err());
    }

    #[test]
    fn test_non_finite_numeric_fails() {
        let row = reading("L").with_numeric(fields::TORQUE, f64::NAN);
        assert!(align_one(&row, &reference()).is_err());
    }

    #[test]
    fn test_missing_categorical_field_fails() {
        let mut row = reading("L");
        row.remove(fields::MACHINE_TYPE);
        let err = align_one(&row, &reference()).unwrap_err();
        assert!(matches!(err, FeatureError::SchemaMismatch { ref field, .. } if field == fields::MACHINE_TYPE));
    }

    #[test]
    fn test_batch_error_names_row() {
        let mut bad = reading("L");
        bad.remove(fields::ROTATIONAL_SPEED);
        let err = align(&[reading("L"), bad], &reference()).unwrap_err();
        let FeatureError::SchemaMismatch { detail, .. } = err;
        assert!(detail.starts_with("row 1:"));
    }

    #[test]
    fn test_batch_preserves_row_order() {
        let rows = vec![reading("L"), reading("M"), reading("H")];
        let aligned = align(&rows, &reference()).unwrap();
        assert_eq!(aligned.nrows(), 3);
        assert_eq!(aligned.column("Type_L").unwrap().to_vec(), vec![1.0, 0.0, 0.0]);
        assert_eq!(aligned.column("Type_M").unwrap().to_vec(), vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_realignment_is_idempotent() {
        let reference = reference();
        let rows = vec![reading("L"), reading("M"), reading("H")];
        let first = align(&rows, &reference).unwrap();
        let second = align(&first.to_rows(), &reference).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_partially_encoded_row_zero_fills() {
        let row = FeatureRow::new()
            .with_numeric(fields::TORQUE, 1.0)
            .with_numeric(fields::TOOL_WEAR, 2.0)
            .with_numeric(fields::ROTATIONAL_SPEED, 3.0)
            .with_numeric(fields::PROCESS_TEMPERATURE, 4.0)
            .with_numeric("Type_M", 1.0);
        let aligned = align_one(&row, &reference()).unwrap();
        assert_eq!(aligned.row(0).to_vec(), vec![1.0, 2.0, 3.0, 4.0, 0.0, 1.0]);
    }

    proptest! {
        #[test]
        fn prop_shape_independent_of_levels(
            levels in proptest::collection::vec(prop::sample::select(vec!["L", "M", "H", "Z"]), 1..20),
            torque in 0.0f64..100.0,
        ) {
            let reference = reference();
            let rows: Vec<_> = levels
                .iter()
                .map(|l| reading(l).with_numeric(fields::TORQUE, torque))
                .collect();
            let aligned = align(&rows, &reference).unwrap();
            let names = reference.names();
            prop_assert_eq!(aligned.columns(), names.as_slice());
            prop_assert_eq!(aligned.nrows(), rows.len());
            for i in 0..aligned.nrows() {
                let indicators: f64 = aligned.row(i).iter().skip(4).sum();
                prop_assert!(indicators <= 1.0);
            }
        }
    }
}
