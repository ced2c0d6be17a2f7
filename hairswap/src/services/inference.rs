//! Inference backend client
//!
//! Invokes named operations on a gradio-style inference backend
//! (`POST {base}/run/{op}` with a `data` array) and decodes the
//! heterogeneous output encodings ONCE, at this boundary, into the
//! `OutputValue` union. The two declared operations differ in shape:
//! `resize` returns a single artifact reference, `swap_hair` returns either
//! a single reference or an ordered list of tagged descriptors of which
//! exactly one is marked visible.
//!
//! Artifact references returned by the backend are remote; `fetch_artifact`
//! materializes them into the job's temp directory, registering each local
//! file with the tracker before any bytes land on disk.

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::normalize::ArtifactRef;
use crate::pipeline::temp::TempArtifactSet;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Resize-with-alignment operation name
pub const RESIZE_OP: &str = "resize";

/// Composite-swap operation name
pub const COMPOSITE_OP: &str = "swap_hair";

/// One entry of an inference `data` array.
///
/// Variant order matters for the untagged decode: a tagged descriptor is
/// recognized by its required `visible` field before the file-descriptor
/// variant (whose fields are all optional) gets a chance to swallow it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    /// `{"visible": bool, "value": ...}` descriptor
    Tagged(TaggedOutput),
    /// `{"name"|"path": ..., "url"?: ...}` file descriptor
    File(FileOutput),
    /// Bare string: a URL or a backend-side file path
    Text(String),
    /// One level of list nesting (the composite op wraps its descriptors)
    Many(Vec<OutputValue>),
    /// Anything else; never yields an artifact
    Other(Value),
}

/// Tagged descriptor: disambiguates which list entry is the actual output
#[derive(Debug, Clone, Deserialize)]
pub struct TaggedOutput {
    pub visible: bool,
    pub value: Option<Box<OutputValue>>,
}

/// File descriptor as emitted by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct FileOutput {
    pub name: Option<String>,
    pub path: Option<String>,
    pub url: Option<String>,
}

impl FileOutput {
    /// Prefer the absolute URL; fall back to the backend-side path
    pub fn artifact_ref(&self) -> Option<ArtifactRef> {
        if let Some(url) = &self.url {
            return Some(ArtifactRef::Url(url.clone()));
        }
        self.name
            .as_ref()
            .or(self.path.as_ref())
            .map(|p| ArtifactRef::BackendPath(p.clone()))
    }
}

/// Raw, shape-varying result of one inference operation
pub type RawResult = Vec<OutputValue>;

#[derive(Debug, Deserialize)]
struct RunResponse {
    #[serde(default)]
    data: Vec<OutputValue>,
    error: Option<Value>,
}

/// Client for the external inference backend.
///
/// Cheap to clone (the inner reqwest client is reference-counted); one
/// handle is created per request and passed into the orchestrator.
#[derive(Clone)]
pub struct InferenceClient {
    http: Client,
    base_url: String,
}

impl InferenceClient {
    pub fn new(http: Client, base_url: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Invoke a named operation with positional inputs
    pub async fn invoke(&self, op: &str, inputs: Vec<Value>) -> PipelineResult<RawResult> {
        let url = format!("{}/run/{}", self.base_url, op);
        debug!(op = op, url = %url, "Invoking inference operation");

        let response = self
            .http
            .post(&url)
            .json(&json!({ "data": inputs }))
            .send()
            .await
            .map_err(|e| PipelineError::ExternalService(format!("{} request failed: {}", op, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::ExternalService(format!(
                "{} returned {}: {}",
                op, status, body
            )));
        }

        let run: RunResponse = response.json().await.map_err(|e| {
            PipelineError::ExternalService(format!("{} response not decodable: {}", op, e))
        })?;

        if let Some(error) = run.error {
            return Err(PipelineError::ExternalService(format!(
                "{} reported error: {}",
                op, error
            )));
        }

        Ok(run.data)
    }

    /// Resize a source image, normalizing for the given alignment targets
    pub async fn resize(&self, image_url: &str, align: &[&str]) -> PipelineResult<RawResult> {
        self.invoke(RESIZE_OP, vec![json!(image_url), json!(align)])
            .await
    }

    /// Composite the three uploaded sources into one swapped output
    pub async fn composite_swap(
        &self,
        face_url: &str,
        shape_url: &str,
        color_url: &str,
        blending: &str,
        poisson_iters: u32,
        poisson_erosion: u32,
    ) -> PipelineResult<RawResult> {
        self.invoke(
            COMPOSITE_OP,
            vec![
                json!(face_url),
                json!(shape_url),
                json!(color_url),
                json!(blending),
                json!(poisson_iters),
                json!(poisson_erosion),
            ],
        )
        .await
    }

    /// Download a remote artifact reference into `dir`, registering the local
    /// path with the tracker before writing.
    pub async fn fetch_artifact(
        &self,
        artifact: &ArtifactRef,
        dir: &Path,
        tracker: &TempArtifactSet,
    ) -> PipelineResult<PathBuf> {
        let url = match artifact {
            ArtifactRef::Url(url) => url.clone(),
            // gradio serves backend-side files via the file= route
            ArtifactRef::BackendPath(path) => format!("{}/file={}", self.base_url, path),
        };

        let extension = artifact.extension().unwrap_or("png");
        let local = dir.join(format!("{}.{}", Uuid::new_v4(), extension));
        tracker.register(&local);

        let response = self.http.get(&url).send().await.map_err(|e| {
            PipelineError::ExternalService(format!("artifact fetch failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::ExternalService(format!(
                "artifact fetch returned {} for {}",
                status, url
            )));
        }

        let bytes = response.bytes().await.map_err(|e| {
            PipelineError::ExternalService(format!("artifact body read failed: {}", e))
        })?;
        tokio::fs::write(&local, &bytes).await?;

        debug!(path = %local.display(), bytes = bytes.len(), "Materialized artifact");
        Ok(local)
    }
}
