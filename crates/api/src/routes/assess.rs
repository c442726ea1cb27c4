//! Interactive Assessment Route

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use feature_engine::RawReading;
use inference_engine::RiskAssessment;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::AppState;

/// Assessment plus how the tier is presented
#[derive(Debug, Serialize)]
pub struct AssessResponse {
    #[serde(flatten)]
    pub assessment: RiskAssessment,
    pub description: &'static str,
    pub color: &'static str,
}

impl From<RiskAssessment> for AssessResponse {
    fn from(assessment: RiskAssessment) -> Self {
        Self {
            description: assessment.risk_label.description(),
            color: assessment.risk_label.color(),
            assessment,
        }
    }
}

/// Score one manually entered reading
pub async fn assess(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RawReading>, JsonRejection>,
) -> Result<Json<AssessResponse>, ApiError> {
    let Json(reading) = payload?;
    let validation = state.validator.validate(&reading);
    if !validation.valid {
        warn!("Rejected reading: {} invalid fields", validation.errors.len());
        return Err(ApiError::Validation(validation.errors));
    }

    let loaded = state.models.as_ref().ok_or(ApiError::ModelsUnavailable)?;
    let assessment = loaded.bundle.assess(&reading)?;
    debug!(
        "Assessed reading: score {:.3} -> {}",
        assessment.risk_score, assessment.risk_label
    );
    Ok(Json(assessment.into()))
}
