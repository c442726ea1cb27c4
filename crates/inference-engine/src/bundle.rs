//! Paired failure and anomaly models sharing one reference column set

use crate::engine::{RiskAssessment, RiskScorer};
use crate::model::{OutlierDetector, ProbabilisticClassifier};
use crate::InferenceError;
use data_validator::WearScale;
use feature_engine::{align_one, fields, FeatureError, FeatureRow, RawReading, ReferenceColumnSet};
use std::sync::Arc;
use tracing::{info, warn};

/// Loaded models ready for scoring.
///
/// Both models must have been trained against the identical column set; the
/// bundle owns that set and aligns every input against it.
#[derive(Clone)]
pub struct ModelBundle {
    columns: ReferenceColumnSet,
    failure_model: Arc<dyn ProbabilisticClassifier>,
    anomaly_model: Arc<dyn OutlierDetector>,
    wear_scale: WearScale,
    wear_field: String,
    scorer: RiskScorer,
}

impl ModelBundle {
    /// Pair two models with their training column sets.
    ///
    /// Fails with `ArtifactMismatch` if the column sets differ in any way.
    pub fn new(
        failure_model: Arc<dyn ProbabilisticClassifier>,
        failure_columns: ReferenceColumnSet,
        anomaly_model: Arc<dyn OutlierDetector>,
        anomaly_columns: ReferenceColumnSet,
        wear_scale: WearScale,
    ) -> Result<Self, InferenceError> {
        if let Some(reason) = column_mismatch(&failure_columns, &anomaly_columns) {
            warn!("Refusing to pair models: {}", reason);
            return Err(InferenceError::ArtifactMismatch(reason));
        }

        info!(
            "Model bundle ready: {} columns, wear scale [{}, {}]",
            failure_columns.len(),
            wear_scale.min(),
            wear_scale.max()
        );

        Ok(Self {
            columns: failure_columns,
            failure_model,
            anomaly_model,
            wear_scale,
            wear_field: fields::TOOL_WEAR.to_string(),
            scorer: RiskScorer::default(),
        })
    }

    /// Replace the default weights and thresholds
    pub fn with_scorer(mut self, scorer: RiskScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Use a different raw field as the wear signal
    pub fn with_wear_field(mut self, field: impl Into<String>) -> Self {
        self.wear_field = field.into();
        self
    }

    pub fn columns(&self) -> &ReferenceColumnSet {
        &self.columns
    }

    pub fn wear_scale(&self) -> &WearScale {
        &self.wear_scale
    }

    pub fn scorer(&self) -> &RiskScorer {
        &self.scorer
    }

    /// Align and score one raw row
    pub fn assess_row(&self, row: &FeatureRow) -> Result<RiskAssessment, InferenceError> {
        let result = self.assess_inner(row);
        match &result {
            Ok(assessment) => {
                metrics::counter!(
                    "pm_risk_assessments_total",
                    "label" => assessment.risk_label.as_str()
                )
                .increment(1);
            }
            Err(_) => metrics::counter!("pm_risk_assessment_failures_total").increment(1),
        }
        result
    }

    /// Score a manually entered reading
    pub fn assess(&self, reading: &RawReading) -> Result<RiskAssessment, InferenceError> {
        self.assess_row(&reading.to_row())
    }

    fn assess_inner(&self, row: &FeatureRow) -> Result<RiskAssessment, InferenceError> {
        let aligned = align_one(row, &self.columns)?;
        let raw_wear = row.numeric(&self.wear_field).ok_or_else(|| FeatureError::SchemaMismatch {
            field: self.wear_field.clone(),
            detail: "wear field is missing or not numeric".to_string(),
        })?;

        self.scorer.score(
            aligned.row(0),
            raw_wear,
            &self.wear_scale,
            self.failure_model.as_ref(),
            self.anomaly_model.as_ref(),
        )
    }
}

fn column_mismatch(a: &ReferenceColumnSet, b: &ReferenceColumnSet) -> Option<String> {
    if a == b {
        return None;
    }
    if a.version() != b.version() {
        return Some(format!(
            "column set versions differ ({} vs {})",
            a.version(),
            b.version()
        ));
    }
    let (names_a, names_b) = (a.names(), b.names());
    if let Some((idx, (x, y))) = names_a
        .iter()
        .zip(names_b.iter())
        .enumerate()
        .find(|(_, (x, y))| x != y)
    {
        return Some(format!("column {} differs: '{}' vs '{}'", idx, x, y));
    }
    if names_a.len() != names_b.len() {
        return Some(format!(
            "failure model has {} columns, anomaly model has {}",
            names_a.len(),
            names_b.len()
        ));
    }
    Some("categorical domains differ".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ClassProbabilities;
    use feature_engine::{Column, FeatureSchema};
    use ndarray::ArrayView1;
    use risk_classifier::RiskLabel;

    struct WidthCheckedFailure {
        width: usize,
        p: f64,
    }

    impl ProbabilisticClassifier for WidthCheckedFailure {
        fn class_probabilities(
            &self,
            features: ArrayView1<'_, f64>,
        ) -> Result<ClassProbabilities, InferenceError> {
            if features.len() != self.width {
                return Err(InferenceError::InvalidInputShape {
                    expected: self.width,
                    actual: features.len(),
                });
            }
            Ok(ClassProbabilities::binary(self.p))
        }
    }

    struct NeverOutlier;

    impl OutlierDetector for NeverOutlier {
        fn is_outlier(&self, _features: ArrayView1<'_, f64>) -> Result<bool, InferenceError> {
            Ok(false)
        }
    }

    fn columns(levels: &[&str]) -> ReferenceColumnSet {
        let rows: Vec<_> = levels
            .iter()
            .map(|l| {
                RawReading {
                    machine_type: l.to_string(),
                    ..Default::default()
                }
                .to_row()
            })
            .collect();
        ReferenceColumnSet::fit(&FeatureSchema::machine(), &rows).unwrap()
    }

    fn bundle() -> ModelBundle {
        let cols = columns(&["L", "M", "H"]);
        ModelBundle::new(
            Arc::new(WidthCheckedFailure { width: 6, p: 0.2 }),
            cols.clone(),
            Arc::new(NeverOutlier),
            cols,
            WearScale::new(0.0, 250.0).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_assess_manual_entry() {
        let reading = RawReading {
            torque: 40.0,
            tool_wear: 150.0,
            rotational_speed: 1500.0,
            process_temperature: 310.0,
            machine_type: "M".to_string(),
        };
        let assessment = bundle().assess(&reading).unwrap();
        assert!((assessment.risk_score - 0.28).abs() < 1e-9);
        assert_eq!(assessment.risk_label, RiskLabel::Unkritisch);
    }

    #[test]
    fn test_mismatched_columns_rejected() {
        let err = ModelBundle::new(
            Arc::new(WidthCheckedFailure { width: 6, p: 0.2 }),
            columns(&["L", "M", "H"]),
            Arc::new(NeverOutlier),
            columns(&["L", "M"]),
            WearScale::new(0.0, 250.0).unwrap(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, InferenceError::ArtifactMismatch(_)));
    }

    #[test]
    fn test_reordered_columns_rejected() {
        let a = columns(&["L", "M", "H"]);
        let mut reordered = a.columns().to_vec();
        reordered.swap(0, 1);
        let b = ReferenceColumnSet::from_parts(reordered, a.domains().to_vec()).unwrap();
        let reason = column_mismatch(&a, &b).unwrap();
        assert!(reason.starts_with("column 0 differs"));
    }

    #[test]
    fn test_missing_numeric_field() {
        let mut row = RawReading::default().to_row();
        row.remove(fields::TOOL_WEAR);
        let err = bundle().assess_row(&row).unwrap_err();
        assert!(matches!(err, InferenceError::Feature(FeatureError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_custom_wear_field() {
        let cols = ReferenceColumnSet::from_parts(
            vec![Column::Numeric {
                field: "wear".to_string(),
            }],
            vec![],
        )
        .unwrap();
        let bundle = ModelBundle::new(
            Arc::new(WidthCheckedFailure { width: 1, p: 0.0 }),
            cols.clone(),
            Arc::new(NeverOutlier),
            cols,
            WearScale::new(0.0, 10.0).unwrap(),
        )
        .unwrap()
        .with_wear_field("wear");
        let row = FeatureRow::new().with_numeric("wear", 10.0);
        let assessment = bundle.assess_row(&row).unwrap();
        assert!((assessment.risk_score - 0.3).abs() < 1e-12);
        assert_eq!(assessment.risk_label, RiskLabel::Verdaechtig);
    }
}
