//! Health Route

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::AppState;

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: String,
    pub uptime_seconds: u64,
    pub models: Option<ModelStatus>,
}

/// Loaded model pair
#[derive(Debug, Serialize)]
pub struct ModelStatus {
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub columns: Vec<String>,
    pub wear_min: f64,
    pub wear_max: f64,
}

/// Service is "healthy" with models loaded, "degraded" without
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let models = state.models.as_ref().map(|loaded| ModelStatus {
        run_id: loaded.manifest.run_id,
        trained_at: loaded.manifest.trained_at,
        columns: loaded.manifest.columns.clone(),
        wear_min: loaded.manifest.wear_min,
        wear_max: loaded.manifest.wear_max,
    });

    Json(HealthResponse {
        status: if models.is_some() { "healthy" } else { "degraded" },
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        models,
    })
}
