//! CSV datasets
//!
//! Tables are kept as text so that scored output can reproduce every input
//! column unchanged before appending the result columns.

use crate::StorageError;
use feature_engine::{FeatureRow, FeatureSchema, FieldKind};
use inference_engine::{ClassLabel, InferenceError, RiskAssessment};
use model_training::LabeledDataset;
use risk_classifier::RiskLabel;
use std::fs::File;
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Columns appended to every scored dataset, in order
pub const RESULT_COLUMNS: [&str; 5] = [
    "failure_probability",
    "anomaly_flag",
    "wear_scaled",
    "risk_score",
    "risk_label",
];

/// A CSV table with a header row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataTable {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Self {
        Self { headers, records }
    }

    /// Read a CSV file
    pub fn read_path(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        let table = Self::from_reader(File::open(path)?)?;
        info!(
            "Read {} rows x {} columns from {}",
            table.len(),
            table.headers.len(),
            path.display()
        );
        Ok(table)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self, StorageError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let records = rdr
            .records()
            .map(|r| r.map(|record| record.iter().map(str::to_string).collect()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()?;
        Ok(Self { headers, records })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Every row as a feature row.
    ///
    /// Fields the schema declares categorical stay text; other cells become
    /// numeric when they parse. Empty cells are left out, so a missing value
    /// surfaces as a schema mismatch for that row alone.
    pub fn feature_rows(&self, schema: &FeatureSchema) -> Vec<FeatureRow> {
        self.records
            .iter()
            .map(|record| {
                let mut row = FeatureRow::new();
                for (header, cell) in self.headers.iter().zip(record) {
                    let cell = cell.trim();
                    if cell.is_empty() {
                        continue;
                    }
                    let categorical = schema
                        .field(header)
                        .is_some_and(|spec| spec.kind == FieldKind::Categorical);
                    match cell.parse::<f64>() {
                        Ok(value) if !categorical => row.set_numeric(header.clone(), value),
                        _ => row.set_categorical(header.clone(), cell),
                    }
                }
                row
            })
            .collect()
    }

    /// Feature rows plus the binary outcome column, for training
    pub fn labeled(
        &self,
        schema: &FeatureSchema,
        outcome_column: &str,
    ) -> Result<LabeledDataset, StorageError> {
        for spec in schema.fields() {
            if self.column_index(&spec.name).is_none() {
                return Err(StorageError::MissingColumn(spec.name.clone()));
            }
        }
        let outcome_idx = self
            .column_index(outcome_column)
            .ok_or_else(|| StorageError::MissingColumn(outcome_column.to_string()))?;

        let outcomes = self
            .records
            .iter()
            .enumerate()
            .map(|(row, record)| {
                let cell = record.get(outcome_idx).map(|c| c.trim()).unwrap_or("");
                parse_outcome(cell).ok_or_else(|| StorageError::InvalidCell {
                    row,
                    column: outcome_column.to_string(),
                    value: cell.to_string(),
                })
            })
            .collect::<Result<Vec<ClassLabel>, StorageError>>()?;

        let mut rows = self.feature_rows(schema);
        for row in &mut rows {
            row.remove(outcome_column);
        }
        debug!("Labelled dataset: {} rows", rows.len());
        Ok(LabeledDataset::new(rows, outcomes)?)
    }
}

fn parse_outcome(cell: &str) -> Option<ClassLabel> {
    match cell {
        "0" | "0.0" | "False" | "false" => Some(0),
        "1" | "1.0" | "True" | "true" => Some(1),
        _ => None,
    }
}

/// Write the input table with the result columns appended.
///
/// With a label filter only rows whose label is selected are written, and
/// rows that failed to score are dropped. Without one every row is written;
/// failed rows carry empty result cells. Returns the number of rows written.
pub fn write_scored<W: io::Write>(
    writer: W,
    table: &DataTable,
    results: &[Result<RiskAssessment, InferenceError>],
    labels: Option<&[RiskLabel]>,
) -> Result<usize, StorageError> {
    if results.len() != table.len() {
        return Err(StorageError::LengthMismatch {
            rows: table.len(),
            results: results.len(),
        });
    }

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(
        table
            .headers
            .iter()
            .map(String::as_str)
            .chain(RESULT_COLUMNS),
    )?;

    let mut written = 0;
    for (record, result) in table.records.iter().zip(results) {
        let cells = match (result, labels) {
            (Ok(a), Some(selected)) if !selected.contains(&a.risk_label) => continue,
            (Err(_), Some(_)) => continue,
            (Ok(a), _) => [
                a.failure_probability.to_string(),
                a.anomaly_flag.to_string(),
                a.wear_scaled.to_string(),
                a.risk_score.to_string(),
                a.risk_label.to_string(),
            ],
            (Err(_), None) => Default::default(),
        };
        wtr.write_record(record.iter().map(String::as_str).chain(cells.iter().map(String::as_str)))?;
        written += 1;
    }
    wtr.flush()?;

    debug!("Wrote {} of {} scored rows", written, table.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::fields;
    use std::io::Write;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
UDI,Product ID,Type,Process temperature [K],Rotational speed [rpm],Torque [Nm],Tool wear [min],Machine failure
1,M14860,M,308.6,1551,42.8,0,0
2,L47181,L,308.7,1408,46.3,3,0
3,L47182,L,308.5,1498,,5,1
4,H29424,H,309.0,1433,39.5,7,1
";

    fn assessment(label: RiskLabel, score: f64) -> RiskAssessment {
        RiskAssessment {
            failure_probability: 0.5,
            anomaly_flag: 0,
            wear_scaled: 0.25,
            risk_score: score,
            risk_label: label,
        }
    }

    #[test]
    fn test_feature_rows_types_cells() {
        let table = DataTable::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.len(), 4);
        let rows = table.feature_rows(&FeatureSchema::machine());

        assert_eq!(rows[0].numeric(fields::TORQUE), Some(42.8));
        assert_eq!(rows[0].categorical(fields::MACHINE_TYPE), Some("M"));
        assert_eq!(rows[0].categorical("Product ID"), Some("M14860"));
        assert!(!rows[2].contains(fields::TORQUE));
    }

    #[test]
    fn test_labeled_reads_outcome() {
        let table = DataTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let dataset = table
            .labeled(&FeatureSchema::machine(), fields::MACHINE_FAILURE)
            .unwrap();
        assert_eq!(dataset.outcomes(), &[0, 0, 1, 1]);
        assert!(!dataset.rows()[0].contains(fields::MACHINE_FAILURE));
    }

    #[test]
    fn test_labeled_requires_columns() {
        let csv = "Type,Torque [Nm]\nL,40\n";
        let table = DataTable::from_reader(csv.as_bytes()).unwrap();
        let err = table
            .labeled(&FeatureSchema::machine(), fields::MACHINE_FAILURE)
            .unwrap_err();
        assert!(matches!(err, StorageError::MissingColumn(_)));
    }

    #[test]
    fn test_labeled_rejects_bad_outcome() {
        let csv = SAMPLE.replace("7,1\n", "7,maybe\n");
        let table = DataTable::from_reader(csv.as_bytes()).unwrap();
        match table
            .labeled(&FeatureSchema::machine(), fields::MACHINE_FAILURE)
            .unwrap_err()
        {
            StorageError::InvalidCell { row, value, .. } => {
                assert_eq!(row, 3);
                assert_eq!(value, "maybe");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_write_scored_appends_columns() {
        let table = DataTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let results = vec![
            Ok(assessment(RiskLabel::Unkritisch, 0.1)),
            Ok(assessment(RiskLabel::Hochrisiko, 0.7)),
            Err(InferenceError::InferenceFailed("missing torque".to_string())),
            Ok(assessment(RiskLabel::Verdaechtig, 0.4)),
        ];

        let mut out = Vec::new();
        let written = write_scored(&mut out, &table, &results, None).unwrap();
        assert_eq!(written, 4);

        let scored = DataTable::from_reader(out.as_slice()).unwrap();
        assert_eq!(scored.headers().len(), table.headers().len() + 5);
        assert_eq!(scored.headers().last().unwrap(), "risk_label");
        assert_eq!(scored.records()[1][8..], ["0.5", "0", "0.25", "0.7", "Hochrisiko"]);
        assert_eq!(scored.records()[2][12], "");
        assert_eq!(scored.records()[3][12], "Verdächtig");
        assert_eq!(scored.records()[0][..8], table.records()[0][..]);
    }

    #[test]
    fn test_write_scored_filters_labels() {
        let table = DataTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let results = vec![
            Ok(assessment(RiskLabel::Unkritisch, 0.1)),
            Ok(assessment(RiskLabel::Hochrisiko, 0.7)),
            Err(InferenceError::InferenceFailed("missing torque".to_string())),
            Ok(assessment(RiskLabel::Verdaechtig, 0.4)),
        ];

        let mut out = Vec::new();
        let selected = [RiskLabel::Verdaechtig, RiskLabel::Hochrisiko];
        let written = write_scored(&mut out, &table, &results, Some(&selected)).unwrap();
        assert_eq!(written, 2);

        let scored = DataTable::from_reader(out.as_slice()).unwrap();
        let ids: Vec<_> = scored.records().iter().map(|r| r[0].as_str()).collect();
        assert_eq!(ids, vec!["2", "4"]);
    }

    #[test]
    fn test_write_scored_length_mismatch() {
        let table = DataTable::from_reader(SAMPLE.as_bytes()).unwrap();
        let err = write_scored(Vec::new(), &table, &[], None).unwrap_err();
        assert!(matches!(err, StorageError::LengthMismatch { rows: 4, results: 0 }));
    }

    #[test]
    fn test_read_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ai4i.csv");
        File::create(&path)
            .unwrap()
            .write_all(SAMPLE.as_bytes())
            .unwrap();
        let table = DataTable::read_path(&path).unwrap();
        assert_eq!(table.column_index(fields::TOOL_WEAR), Some(6));
    }
}
