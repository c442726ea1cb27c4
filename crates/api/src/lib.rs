//! Machine Failure-Risk Service
//!
//! Command implementations behind the `pm-risk` binary and the HTTP API for
//! interactive scoring.

pub mod commands;
pub mod config;
pub mod error;
mod routes;

pub use routes::assess::AssessResponse;
pub use routes::health::{HealthResponse, ModelStatus};

use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use data_validator::ReadingValidator;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use storage::LoadedModels;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, util::TryInitError, EnvFilter};

use crate::config::AppConfig;

/// Application state shared across handlers
pub struct AppState {
    /// Loaded model pair; `None` until models have been trained
    pub models: Option<LoadedModels>,
    /// Range checks for manually entered readings
    pub validator: ReadingValidator,
    /// Prometheus recorder handle
    pub metrics: Option<PrometheusHandle>,
    pub version: String,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(models: Option<LoadedModels>) -> Self {
        Self {
            models,
            validator: ReadingValidator::default(),
            metrics: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/v1/assess", post(routes::assess::assess))
        .route("/metrics", get(routes::metrics::render))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Initialize logging. `RUST_LOG` overrides the default `info` level.
pub fn init_logging(json: bool) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    }
}

/// Run the server until it fails
pub async fn run_server(config: &AppConfig) -> Result<()> {
    let models = match commands::load_models(config) {
        Ok(loaded) => Some(loaded),
        Err(e) => {
            warn!("Serving without models: {:#}", e);
            None
        }
    };

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install metrics recorder")?;
    let state = Arc::new(AppState::new(models).with_metrics(handle));
    let app = create_router(state);

    info!("Starting API server on {}", config.server.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
