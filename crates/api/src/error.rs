//! HTTP error mapping

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_validator::ValidationError;
use feature_engine::FeatureError;
use inference_engine::InferenceError;
use serde::Serialize;
use thiserror::Error;

/// Errors returned by HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Reading failed the form range checks
    #[error("Invalid reading")]
    Validation(Vec<ValidationError>),
    /// Body is not a JSON reading
    #[error("Malformed request body")]
    Body { status: StatusCode, detail: String },
    #[error("No trained models loaded")]
    ModelsUnavailable,
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<String>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Body { status, .. } => *status,
            ApiError::ModelsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Inference(InferenceError::Feature(FeatureError::SchemaMismatch { .. })) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Inference(InferenceError::Scale(_)) => StatusCode::BAD_REQUEST,
            ApiError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Body {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let details = match &self {
            ApiError::Validation(errors) => errors.iter().map(|e| e.to_string()).collect(),
            ApiError::Body { detail, .. } => vec![detail.clone()],
            _ => Vec::new(),
        };
        let body = ErrorBody {
            error: self.to_string(),
            details,
        };
        (self.status(), Json(body)).into_response()
    }
}
