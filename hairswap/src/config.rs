//! Configuration resolution for hairswap
//!
//! Two-tier resolution with ENV → TOML priority: every value can come from a
//! `HAIRSWAP_*` environment variable, falling back to an optional TOML file
//! (`HAIRSWAP_CONFIG` path, else `./hairswap.toml`), falling back to the
//! built-in default.

use crate::error::{PipelineError, PipelineResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Base URL of the inference backend (gradio-style named operations)
    #[serde(default = "default_inference_base_url")]
    pub inference_base_url: String,

    /// Upload endpoint of the blob-storage backend
    #[serde(default = "default_storage_upload_url")]
    pub storage_upload_url: String,

    /// Resident-memory threshold in bytes; 0 disables the watchdog
    #[serde(default)]
    pub memory_limit_bytes: u64,

    /// Blending mode used when the request omits one
    #[serde(default = "default_blending")]
    pub default_blending: String,

    /// Poisson iteration count used when the request omits one.
    /// Deployments of sibling model variants run this as low as 0.
    #[serde(default = "default_poisson_iters")]
    pub default_poisson_iters: u32,

    /// Poisson erosion used when the request omits one
    #[serde(default = "default_poisson_erosion")]
    pub default_poisson_erosion: u32,

    /// Pass all three alignment targets to every resize call instead of
    /// only the call's own role
    #[serde(default)]
    pub align_all_targets: bool,

    /// Per-request timeout applied to the shared HTTP client
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// Parent directory for per-job temp directories (system temp when unset)
    #[serde(default)]
    pub work_dir: Option<PathBuf>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:5730".to_string()
}

fn default_inference_base_url() -> String {
    "http://127.0.0.1:7860".to_string()
}

fn default_storage_upload_url() -> String {
    "https://tmpfiles.org/api/v1/upload".to_string()
}

fn default_blending() -> String {
    "Article".to_string()
}

fn default_poisson_iters() -> u32 {
    2500
}

fn default_poisson_erosion() -> u32 {
    100
}

fn default_http_timeout_secs() -> u64 {
    300
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            inference_base_url: default_inference_base_url(),
            storage_upload_url: default_storage_upload_url(),
            memory_limit_bytes: 0,
            default_blending: default_blending(),
            default_poisson_iters: default_poisson_iters(),
            default_poisson_erosion: default_poisson_erosion(),
            align_all_targets: false,
            http_timeout_secs: default_http_timeout_secs(),
            work_dir: None,
        }
    }
}

impl Config {
    /// Resolve configuration from environment and TOML file
    pub fn load() -> PipelineResult<Self> {
        let toml_path = std::env::var("HAIRSWAP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("hairswap.toml"));

        let mut config = if toml_path.exists() {
            info!("Loading config from {}", toml_path.display());
            Self::from_toml_file(&toml_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_toml_file(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Config(format!("read {} failed: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| PipelineError::Config(format!("parse {} failed: {}", path.display(), e)))
    }

    /// Environment variables take priority over TOML values
    fn apply_env_overrides(&mut self) -> PipelineResult<()> {
        if let Ok(addr) = std::env::var("HAIRSWAP_BIND") {
            self.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("HAIRSWAP_INFERENCE_URL") {
            self.inference_base_url = url;
        }
        if let Ok(url) = std::env::var("HAIRSWAP_STORAGE_URL") {
            self.storage_upload_url = url;
        }
        if let Ok(raw) = std::env::var("HAIRSWAP_MEMORY_LIMIT_BYTES") {
            self.memory_limit_bytes = raw.parse().map_err(|_| {
                PipelineError::Config(format!(
                    "HAIRSWAP_MEMORY_LIMIT_BYTES must be an integer, got {:?}",
                    raw
                ))
            })?;
        }
        if self.memory_limit_bytes == 0 {
            warn!("Memory watchdog disabled (memory_limit_bytes = 0)");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "127.0.0.1:5730");
        assert_eq!(config.storage_upload_url, "https://tmpfiles.org/api/v1/upload");
        assert_eq!(config.memory_limit_bytes, 0, "watchdog disabled by default");
        assert_eq!(config.default_blending, "Article");
        assert_eq!(config.default_poisson_iters, 2500);
        assert_eq!(config.default_poisson_erosion, 100);
        assert!(!config.align_all_targets);
        assert!(config.work_dir.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config =
            toml::from_str("inference_base_url = \"http://10.0.0.5:7860\"").unwrap();
        assert_eq!(config.inference_base_url, "http://10.0.0.5:7860");
        assert_eq!(config.default_poisson_iters, 2500);
        assert_eq!(config.bind_addr, "127.0.0.1:5730");
    }

    #[test]
    fn test_toml_overrides() {
        let config: Config = toml::from_str(
            r#"
            memory_limit_bytes = 1073741824
            default_poisson_iters = 0
            default_poisson_erosion = 15
            align_all_targets = true
            "#,
        )
        .unwrap();
        assert_eq!(config.memory_limit_bytes, 1_073_741_824);
        assert_eq!(config.default_poisson_iters, 0);
        assert_eq!(config.default_poisson_erosion, 15);
        assert!(config.align_all_targets);
    }
}
