//! Hair-swap pipeline
//!
//! Validates the inbound job, fans the three resize stages out over the
//! inference backend, joins them, composites, normalizes the composite
//! result, and uploads the final artifact. Temp-artifact cleanup and
//! memory-pressure checks are delegated to `temp` and `watchdog`.

pub mod normalize;
pub mod orchestrator;
pub mod temp;
pub mod watchdog;

pub use normalize::{normalize, ArtifactRef};
pub use orchestrator::Orchestrator;
pub use temp::TempArtifactSet;
pub use watchdog::MemoryWatchdog;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Fixed 400 message when any of the three source URLs is missing or empty
pub const REQUIRED_FIELDS_ERROR: &str = "face_url, shape_url, and color_url are required";

/// Raw request parameters, pre-validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwapParams {
    pub face_url: Option<String>,
    pub shape_url: Option<String>,
    pub color_url: Option<String>,
    pub blending: Option<String>,
    pub poisson_iters: Option<u32>,
    pub poisson_erosion: Option<u32>,
}

/// A validated job. Immutable once constructed; destroyed when the request
/// handler returns.
#[derive(Debug, Clone)]
pub struct SwapJob {
    pub face_url: String,
    pub shape_url: String,
    pub color_url: String,
    pub blending: Blending,
    pub poisson_iters: u32,
    pub poisson_erosion: u32,
}

impl SwapJob {
    /// Validate raw parameters into a job, filling defaults from config.
    ///
    /// No upper bound is enforced on the poisson integers; out-of-range
    /// values are forwarded to the backend, whose rejection surfaces as an
    /// `ExternalService` error.
    pub fn validate(params: SwapParams, config: &Config) -> PipelineResult<Self> {
        let face_url = non_empty(params.face_url);
        let shape_url = non_empty(params.shape_url);
        let color_url = non_empty(params.color_url);

        let (Some(face_url), Some(shape_url), Some(color_url)) = (face_url, shape_url, color_url)
        else {
            return Err(PipelineError::Validation(REQUIRED_FIELDS_ERROR.to_string()));
        };

        let blending = match params.blending {
            Some(raw) => Blending::parse(&raw).ok_or_else(|| {
                PipelineError::Validation(format!("unknown blending mode: {}", raw))
            })?,
            None => Blending::parse(&config.default_blending).unwrap_or(Blending::Article),
        };

        Ok(Self {
            face_url,
            shape_url,
            color_url,
            blending,
            poisson_iters: params.poisson_iters.unwrap_or(config.default_poisson_iters),
            poisson_erosion: params
                .poisson_erosion
                .unwrap_or(config.default_poisson_erosion),
        })
    }

    /// Source URL for a given role
    pub fn source_url(&self, role: Role) -> &str {
        match role {
            Role::Face => &self.face_url,
            Role::Shape => &self.shape_url,
            Role::Color => &self.color_url,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Which source image a resize stage handles; doubles as the alignment target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Face,
    Shape,
    Color,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Face, Role::Shape, Role::Color];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Face => "face",
            Role::Shape => "shape",
            Role::Color => "color",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite blending mode, forwarded verbatim to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blending {
    Article,
    Alternative,
}

impl Blending {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Article" => Some(Blending::Article),
            "Alternative" => Some(Blending::Alternative),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Blending::Article => "Article",
            Blending::Alternative => "Alternative",
        }
    }
}

/// Output of one resize stage, consumed by the composite stage
#[derive(Debug)]
pub struct StageResult {
    pub role: Role,
    pub local_path: PathBuf,
    pub public_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_params() -> SwapParams {
        SwapParams {
            face_url: Some("https://x/f.png".to_string()),
            shape_url: Some("https://x/s.png".to_string()),
            color_url: Some("https://x/c.png".to_string()),
            blending: None,
            poisson_iters: None,
            poisson_erosion: None,
        }
    }

    #[test]
    fn test_validate_fills_defaults() {
        let job = SwapJob::validate(full_params(), &Config::default()).unwrap();
        assert_eq!(job.blending, Blending::Article);
        assert_eq!(job.poisson_iters, 2500);
        assert_eq!(job.poisson_erosion, 100);
    }

    #[test]
    fn test_validate_missing_url() {
        for missing in ["face", "shape", "color"] {
            let mut params = full_params();
            match missing {
                "face" => params.face_url = None,
                "shape" => params.shape_url = None,
                _ => params.color_url = None,
            }
            let err = SwapJob::validate(params, &Config::default()).unwrap_err();
            assert_eq!(err.to_string(), REQUIRED_FIELDS_ERROR);
        }
    }

    #[test]
    fn test_validate_empty_url_rejected() {
        let mut params = full_params();
        params.shape_url = Some("   ".to_string());
        let err = SwapJob::validate(params, &Config::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn test_validate_unknown_blending() {
        let mut params = full_params();
        params.blending = Some("Chaotic".to_string());
        let err = SwapJob::validate(params, &Config::default()).unwrap_err();
        assert!(err.to_string().contains("unknown blending mode"));
    }

    #[test]
    fn test_validate_explicit_params_win() {
        let mut params = full_params();
        params.blending = Some("Alternative".to_string());
        params.poisson_iters = Some(0);
        params.poisson_erosion = Some(15);
        let job = SwapJob::validate(params, &Config::default()).unwrap();
        assert_eq!(job.blending, Blending::Alternative);
        assert_eq!(job.poisson_iters, 0);
        assert_eq!(job.poisson_erosion, 15);
    }

    #[test]
    fn test_role_names() {
        let names: Vec<&str> = Role::ALL.iter().map(|r| r.as_str()).collect();
        assert_eq!(names, vec!["face", "shape", "color"]);
    }
}
