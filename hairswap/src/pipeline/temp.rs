//! Temp artifact tracking
//!
//! Every locally materialized artifact is registered here the moment its
//! path is decided; `release_all` runs exactly once per job, on every exit
//! path, and deletes whatever accumulated. Per-path deletion errors are
//! swallowed so one stubborn file cannot strand its siblings. The job's
//! temp directory itself (owned by the orchestrator as a `tempfile::TempDir`)
//! is a second line of defense for anything created inside it.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Job-scoped, append-only set of local artifact paths awaiting deletion.
///
/// Clones share the same underlying set; the three resize tasks append
/// concurrently under the mutex. Deletion happens only in `release_all`.
#[derive(Clone, Default)]
pub struct TempArtifactSet {
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl TempArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a path for deletion at job end. Idempotent.
    pub fn register(&self, path: &Path) {
        let mut paths = self.paths.lock().expect("temp artifact set poisoned");
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_path_buf());
        }
    }

    /// Number of currently registered paths
    pub fn len(&self) -> usize {
        self.paths.lock().expect("temp artifact set poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete every registered path. Missing files and per-path errors are
    /// logged and skipped; remaining paths are still released.
    pub fn release_all(&self) {
        let paths: Vec<PathBuf> = {
            let mut guard = self.paths.lock().expect("temp artifact set poisoned");
            guard.drain(..).collect()
        };

        for path in paths {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Deleted temp artifact"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // Registered but never materialized (or already gone)
                    debug!(path = %path.display(), "Temp artifact already absent");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to delete temp artifact");
                }
            }
        }
    }
}
