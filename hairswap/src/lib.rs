//! hairswap library - hair-swap orchestration service
//!
//! Composites three source images (a face, a hair-shape reference, and a
//! hair-color reference) into one output by delegating the image
//! transformation to an external inference backend and artifact hosting to
//! an external blob-storage backend. This crate is the orchestration layer:
//! stage sequencing, the three-way resize fan-out, result normalization,
//! temp-artifact lifecycle, and the memory-pressure guard.

use axum::Router;
use std::sync::Arc;
use std::time::Duration;

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod services;

pub use config::Config;
pub use error::{PipelineError, PipelineResult};

/// Application state shared across HTTP handlers.
///
/// Holds only the config and the connection-pooling HTTP client; per-request
/// client handles are built from these in the handler, so no request state
/// outlives its job.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub http: reqwest::Client,
}

impl AppState {
    /// Create application state from resolved configuration
    pub fn new(config: Config) -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()
            .map_err(|e| PipelineError::Config(format!("HTTP client build failed: {}", e)))?;

        Ok(Self {
            config: Arc::new(config),
            http,
        })
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::post;

    Router::new()
        .route("/process-hair-swap", post(api::process_hair_swap))
        .merge(api::health_routes())
        .with_state(state)
}
