//! Blob-storage client
//!
//! Uploads a local artifact to the external blob host via multipart POST and
//! returns a normalized public URL. Hosts in the tmpfiles.org family answer
//! with a landing-page URL that redirects; the returned URL is rewritten to
//! the direct-download variant so callers can fetch it without following
//! redirects.

use crate::error::{PipelineError, PipelineResult};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use std::path::Path;
use tracing::debug;

/// Client for the external blob-storage backend
#[derive(Clone)]
pub struct StorageClient {
    http: Client,
    upload_url: String,
}

impl StorageClient {
    pub fn new(http: Client, upload_url: String) -> Self {
        Self { http, upload_url }
    }

    /// Upload a local artifact; returns its directly fetchable public URL
    pub async fn upload(&self, artifact: &Path) -> PipelineResult<String> {
        let bytes = tokio::fs::read(artifact).await?;
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "artifact.png".to_string());

        debug!(path = %artifact.display(), bytes = bytes.len(), "Uploading artifact");

        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .http
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::Upload(format!("upload request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PipelineError::Upload(format!("upload body unreadable: {}", e)))?;

        if !status.is_success() {
            return Err(PipelineError::Upload(format!(
                "storage backend returned {}: {}",
                status, body
            )));
        }

        let url = extract_url(&body)
            .ok_or_else(|| PipelineError::Upload(format!("no URL in upload response: {}", body)))?;

        Ok(normalize_download_url(&url))
    }
}

/// Pull the artifact URL out of an upload response body.
///
/// Accepted shapes, in order: nested `{"data":{"url":...}}`, flat
/// `{"url":...}`, flat `{"link":...}`; as a last resort the raw body text is
/// taken as the URL.
pub fn extract_url(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let nested = value
            .get("data")
            .and_then(|d| d.get("url"))
            .and_then(|u| u.as_str());
        let flat = value.get("url").and_then(|u| u.as_str());
        let link = value.get("link").and_then(|u| u.as_str());
        if let Some(url) = nested.or(flat).or(link) {
            return Some(url.to_string());
        }
        // JSON without a recognizable field: the body itself may be the URL
        if let Some(text) = value.as_str() {
            return Some(text.to_string());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Rewrite a landing-page URL (`https://host/<id>/<name>`) to the host's
/// direct-download path (`https://host/dl/<id>/<name>`). Idempotent:
/// already-direct URLs and URLs without a path pass through unchanged.
pub fn normalize_download_url(url: &str) -> String {
    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let host_start = scheme_end + 3;
    let Some(slash) = url[host_start..].find('/') else {
        return url.to_string();
    };
    let path_start = host_start + slash;
    let path = &url[path_start + 1..];

    if path.is_empty() || path == "dl" || path.starts_with("dl/") {
        return url.to_string();
    }

    format!("{}/dl/{}", &url[..path_start], path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_nested_data_url() {
        let body = r#"{"status":"success","data":{"url":"https://tmpfiles.org/123/out.png"}}"#;
        assert_eq!(
            extract_url(body).unwrap(),
            "https://tmpfiles.org/123/out.png"
        );
    }

    #[test]
    fn test_extract_flat_url() {
        assert_eq!(
            extract_url(r#"{"url":"https://h/a.png"}"#).unwrap(),
            "https://h/a.png"
        );
    }

    #[test]
    fn test_extract_flat_link() {
        assert_eq!(
            extract_url(r#"{"link":"https://h/b.png"}"#).unwrap(),
            "https://h/b.png"
        );
    }

    #[test]
    fn test_extract_raw_body_fallback() {
        assert_eq!(
            extract_url("  https://h/raw.png\n").unwrap(),
            "https://h/raw.png"
        );
    }

    #[test]
    fn test_extract_empty_body_fails() {
        assert_eq!(extract_url("   "), None);
    }

    #[test]
    fn test_normalize_inserts_dl_segment() {
        assert_eq!(
            normalize_download_url("https://tmpfiles.org/1234567/out.png"),
            "https://tmpfiles.org/dl/1234567/out.png"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let direct = "https://tmpfiles.org/dl/1234567/out.png";
        let once = normalize_download_url("https://tmpfiles.org/1234567/out.png");
        assert_eq!(once, direct);
        // Re-normalizing must not double-rewrite
        assert_eq!(normalize_download_url(&once), direct);
    }

    #[test]
    fn test_normalize_leaves_bare_host_alone() {
        assert_eq!(
            normalize_download_url("https://tmpfiles.org"),
            "https://tmpfiles.org"
        );
        assert_eq!(
            normalize_download_url("https://tmpfiles.org/"),
            "https://tmpfiles.org/"
        );
    }

    #[test]
    fn test_normalize_non_url_passthrough() {
        assert_eq!(normalize_download_url("not a url"), "not a url");
    }
}
