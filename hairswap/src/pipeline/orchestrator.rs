//! Pipeline orchestrator
//!
//! Drives a validated job through its stages:
//! resize-in-parallel → composite → normalize → upload. The three resize
//! tasks run as exactly three spawned workers joined with a barrier: the
//! orchestrator waits for all of them regardless of which fails, and does
//! not cancel in-flight siblings. Nothing is retried; the first stage
//! failure is terminal for the job. Cleanup of registered temp artifacts
//! runs on every exit path.

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::normalize::normalize;
use crate::pipeline::temp::TempArtifactSet;
use crate::pipeline::watchdog::MemoryWatchdog;
use crate::pipeline::{Role, StageResult, SwapJob};
use crate::services::inference::InferenceClient;
use crate::services::storage::StorageClient;
use std::path::{Path, PathBuf};
use tokio::task::JoinError;
use tracing::{error, info};
use uuid::Uuid;

/// Request-scoped pipeline driver; owns its client handles for the duration
/// of one job
pub struct Orchestrator {
    inference: InferenceClient,
    storage: StorageClient,
    watchdog: MemoryWatchdog,
    align_all_targets: bool,
    work_dir: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        inference: InferenceClient,
        storage: StorageClient,
        watchdog: MemoryWatchdog,
        align_all_targets: bool,
        work_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            inference,
            storage,
            watchdog,
            align_all_targets,
            work_dir,
        }
    }

    /// Run a job to completion, returning the final public URL.
    ///
    /// The job owns a fresh temp directory; every artifact materialized
    /// during the run is registered with the tracker and released here,
    /// success or failure. The directory itself is removed when the
    /// `TempDir` drops, catching anything a stage created but never
    /// registered.
    pub async fn run(&self, job: SwapJob) -> PipelineResult<String> {
        let job_id = Uuid::new_v4();
        info!(job_id = %job_id, blending = job.blending.as_str(), "Starting hair-swap job");

        self.watchdog.check("job-start");

        let work_dir = match &self.work_dir {
            Some(parent) => tempfile::tempdir_in(parent)?,
            None => tempfile::tempdir()?,
        };
        let tracker = TempArtifactSet::new();

        let result = self.run_stages(&job, job_id, work_dir.path(), &tracker).await;

        // Exactly once per job, on every exit path
        tracker.release_all();

        match &result {
            Ok(url) => info!(job_id = %job_id, result_url = %url, "Job complete"),
            Err(e) => error!(job_id = %job_id, error = %e, "Job failed"),
        }
        result
    }

    async fn run_stages(
        &self,
        job: &SwapJob,
        job_id: Uuid,
        dir: &Path,
        tracker: &TempArtifactSet,
    ) -> PipelineResult<String> {
        // Stage: resize fan-out (exactly three workers)
        self.watchdog.check("resize");
        info!(job_id = %job_id, "Resizing the three sources in parallel");

        let spawn = |role: Role| {
            tokio::spawn(resize_stage(
                self.inference.clone(),
                self.storage.clone(),
                role,
                job.source_url(role).to_string(),
                self.align_targets(role),
                dir.to_path_buf(),
                tracker.clone(),
            ))
        };
        let face_h = spawn(Role::Face);
        let shape_h = spawn(Role::Shape);
        let color_h = spawn(Role::Color);

        // Barrier join: wait for all three, then surface the first failure.
        // Siblings of a failed task are not cancelled; their artifacts stay
        // registered and are released with everything else at job end.
        let (face, shape, color) = tokio::join!(face_h, shape_h, color_h);
        let face = joined(face, Role::Face)?;
        let shape = joined(shape, Role::Shape)?;
        let color = joined(color, Role::Color)?;

        info!(
            job_id = %job_id,
            face_url = %face.public_url,
            shape_url = %shape.public_url,
            color_url = %color.public_url,
            "Resize stages complete"
        );

        // Stage: composite
        self.watchdog.check("composite");
        let raw = self
            .inference
            .composite_swap(
                &face.public_url,
                &shape.public_url,
                &color.public_url,
                job.blending.as_str(),
                job.poisson_iters,
                job.poisson_erosion,
            )
            .await?;
        let artifact = normalize(&raw)?;
        let composited = self.inference.fetch_artifact(&artifact, dir, tracker).await?;

        // Stage: final upload
        self.watchdog.check("upload");
        let result_url = self.storage.upload(&composited).await?;

        Ok(result_url)
    }

    /// Alignment set passed to a resize call. Deployment-configurable:
    /// either the stage's own role or all three targets.
    fn align_targets(&self, role: Role) -> Vec<&'static str> {
        if self.align_all_targets {
            Role::ALL.iter().map(|r| r.as_str()).collect()
        } else {
            vec![role.as_str()]
        }
    }
}

/// One resize worker: invoke → materialize+register → upload
async fn resize_stage(
    inference: InferenceClient,
    storage: StorageClient,
    role: Role,
    source_url: String,
    align: Vec<&'static str>,
    dir: PathBuf,
    tracker: TempArtifactSet,
) -> PipelineResult<StageResult> {
    let raw = inference.resize(&source_url, &align).await?;
    let artifact = normalize(&raw)?;
    let local_path = inference.fetch_artifact(&artifact, &dir, &tracker).await?;
    let public_url = storage.upload(&local_path).await?;

    info!(role = %role, public_url = %public_url, "Resize stage complete");

    Ok(StageResult {
        role,
        local_path,
        public_url,
    })
}

fn joined(
    result: Result<PipelineResult<StageResult>, JoinError>,
    role: Role,
) -> PipelineResult<StageResult> {
    result.map_err(|e| PipelineError::Internal(format!("{} resize task panicked: {}", role, e)))?
}
