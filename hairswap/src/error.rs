//! Error types for hairswap
//!
//! One taxonomy covers the whole pipeline; every variant maps to a fixed
//! HTTP status in `IntoResponse`. Memory-pressure termination is deliberately
//! absent here: the watchdog kills the process instead of returning an error.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Pipeline error type
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or malformed request input (400). No external call was made.
    #[error("{0}")]
    Validation(String),

    /// Inference backend transport failure, non-success status, or
    /// backend-reported error payload (500)
    #[error("inference backend error: {0}")]
    ExternalService(String),

    /// Inference response shape unrecognized (500)
    #[error("unrecognized inference result: {0}")]
    ResultParse(String),

    /// Storage backend rejected the upload or returned an unparseable body (502)
    #[error("artifact upload failed: {0}")]
    Upload(String),

    /// Configuration loading or validation error
    #[error("configuration error: {0}")]
    Config(String),

    /// Local filesystem failure while materializing an artifact
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal failure (e.g. a stage task panicked)
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = match &self {
            PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
            PipelineError::Upload(_) => StatusCode::BAD_GATEWAY,
            PipelineError::ExternalService(_)
            | PipelineError::ResultParse(_)
            | PipelineError::Config(_)
            | PipelineError::Io(_)
            | PipelineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));

        (status, body).into_response()
    }
}

/// Result type for pipeline stages and API handlers
pub type PipelineResult<T> = Result<T, PipelineError>;
