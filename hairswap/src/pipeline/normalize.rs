//! Result normalization
//!
//! Extracts exactly one artifact reference from a raw inference result.
//! The composite operation is the awkward one: depending on backend version
//! it returns a bare reference, a tuple serialized as a list, or a list of
//! tagged descriptors where the visible entry carries the output. Selection
//! is first-matching with no ordering assumption; multiple matches are not
//! an error.

use crate::error::{PipelineError, PipelineResult};
use crate::services::inference::OutputValue;

/// A single artifact reference; never a list after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRef {
    /// Directly fetchable URL
    Url(String),
    /// File path on the inference backend's filesystem
    BackendPath(String),
}

impl ArtifactRef {
    pub fn from_text(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            ArtifactRef::Url(raw.to_string())
        } else {
            ArtifactRef::BackendPath(raw.to_string())
        }
    }

    /// File extension of the referenced artifact, if it has one
    pub fn extension(&self) -> Option<&str> {
        let raw = match self {
            ArtifactRef::Url(url) => url,
            ArtifactRef::BackendPath(path) => path,
        };
        let name = raw.rsplit('/').next()?;
        let (_, ext) = name.rsplit_once('.')?;
        if ext.is_empty() || ext.len() > 8 {
            None
        } else {
            Some(ext)
        }
    }
}

/// Extract a single artifact reference from a raw inference result
pub fn normalize(raw: &[OutputValue]) -> PipelineResult<ArtifactRef> {
    raw.iter().find_map(extract).ok_or_else(|| {
        PipelineError::ResultParse("no artifact reference in inference result".to_string())
    })
}

fn extract(value: &OutputValue) -> Option<ArtifactRef> {
    match value {
        OutputValue::Text(text) => Some(ArtifactRef::from_text(text)),
        OutputValue::File(file) => file.artifact_ref(),
        OutputValue::Tagged(tagged) => {
            if !tagged.visible {
                return None;
            }
            tagged.value.as_deref().and_then(extract)
        }
        OutputValue::Many(entries) => entries.iter().find_map(extract),
        OutputValue::Other(_) => None,
    }
}
