//! POST /process-hair-swap
//!
//! Validates the request, builds request-scoped client handles, and hands
//! the job to the orchestrator. The caller receives either a single final
//! URL or a single error message; no partial progress is exposed.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::PipelineResult;
use crate::pipeline::{MemoryWatchdog, Orchestrator, SwapJob, SwapParams};
use crate::services::{InferenceClient, StorageClient};
use crate::AppState;

/// Successful swap response
#[derive(Debug, Serialize)]
pub struct SwapResponse {
    /// Directly fetchable URL of the composited output
    pub result_url: String,
}

/// Handle a hair-swap request end to end
pub async fn process_hair_swap(
    State(state): State<AppState>,
    Json(params): Json<SwapParams>,
) -> PipelineResult<Json<SwapResponse>> {
    // Validation happens before any client handle is exercised; a missing
    // URL never reaches the network.
    let job = SwapJob::validate(params, &state.config)?;

    let orchestrator = Orchestrator::new(
        InferenceClient::new(state.http.clone(), state.config.inference_base_url.clone()),
        StorageClient::new(state.http.clone(), state.config.storage_upload_url.clone()),
        MemoryWatchdog::new(state.config.memory_limit_bytes),
        state.config.align_all_targets,
        state.config.work_dir.clone(),
    );

    let result_url = orchestrator.run(job).await?;

    Ok(Json(SwapResponse { result_url }))
}
