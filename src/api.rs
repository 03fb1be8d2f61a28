// API client module: talks to the watermark-removal service. The
// `WatermarkService` trait is the seam the job controller and the artifact
// retriever depend on; `ApiClient` is the reqwest implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Client};
use serde::Deserialize;

use crate::error::{JobError, RetrievalError};
use crate::file_gate::SelectedFile;
use crate::job::JobResult;

/// Address used when `WATERMARK_API_URL` is unset.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Multipart field name the service reads the upload from.
pub const UPLOAD_FIELD: &str = "pdf_file";

const REMOVE_PATH: &str = "/api/remove-watermark";
const HEALTH_PATH: &str = "/api/health";

/// Where the service lives and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            // Processing a large deck takes a while.
            request_timeout: Duration::from_secs(120),
        }
    }
}

impl ServiceConfig {
    /// Build a config from `WATERMARK_API_URL`,
    /// `WATERMARK_CONNECT_TIMEOUT_SECS` and `WATERMARK_REQUEST_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ServiceConfig::from_env`] with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let base_url = lookup("WATERMARK_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.base_url);
        let connect_timeout = secs_var(&lookup, "WATERMARK_CONNECT_TIMEOUT_SECS")
            .unwrap_or(defaults.connect_timeout);
        let request_timeout = secs_var(&lookup, "WATERMARK_REQUEST_TIMEOUT_SECS")
            .unwrap_or(defaults.request_timeout);
        Self {
            base_url,
            connect_timeout,
            request_timeout,
        }
    }

    /// Resolve a path or absolute URL against the base address.
    pub fn resolve(&self, locator: &str) -> String {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            locator.to_string()
        } else if locator.starts_with('/') {
            format!("{}{}", self.base_url, locator)
        } else {
            format!("{}/{}", self.base_url, locator)
        }
    }
}

fn secs_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            log::warn!("Ignoring {}={:?}: not a number of seconds", key, raw);
            None
        }
    }
}

/// Remote operations the workflow needs.
#[async_trait]
pub trait WatermarkService: Send + Sync {
    /// Upload `file` and wait for the processed result.
    async fn remove_watermark(&self, file: &SelectedFile) -> Result<JobResult, JobError>;

    /// Fetch the binary artifact behind `locator`.
    async fn fetch_artifact(&self, locator: &str) -> Result<Bytes, RetrievalError>;
}

/// Response of the health endpoint.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

/// Error body of a non-2xx response. `detail` is usually a string but the
/// service framework emits a list for request validation errors.
#[derive(Deserialize, Debug)]
struct ErrorBody {
    detail: Option<serde_json::Value>,
}

/// HTTP client bound to one service address.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    config: ServiceConfig,
}

impl ApiClient {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient { client, config })
    }

    /// Create an ApiClient configured from the environment. See
    /// [`ServiceConfig::from_env`].
    pub fn from_env() -> Result<Self> {
        Self::new(ServiceConfig::from_env())
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Ask the service whether it is up.
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = self.config.resolve(HEALTH_PATH);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach the service")?;
        if !res.status().is_success() {
            let status = res.status();
            let txt = res.text().await.unwrap_or_default();
            anyhow::bail!("Health check failed: {} - {}", status, txt);
        }
        res.json().await.context("Parsing health response json")
    }
}

#[async_trait]
impl WatermarkService for ApiClient {
    async fn remove_watermark(&self, file: &SelectedFile) -> Result<JobResult, JobError> {
        let url = self.config.resolve(REMOVE_PATH);
        let part = multipart::Part::bytes(file.bytes().to_vec())
            .file_name(file.name().to_string())
            .mime_str(file.media_type())
            .map_err(|err| JobError::Transport(err.to_string()))?;
        let form = multipart::Form::new().part(UPLOAD_FIELD, part);

        log::debug!("POST {} ({} bytes)", url, file.size());
        let res = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| JobError::Transport(err.to_string()))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.bytes().await.unwrap_or_default();
            return Err(JobError::ServiceRejected {
                status: status.as_u16(),
                detail: parse_detail(&body),
            });
        }

        let body = res
            .bytes()
            .await
            .map_err(|err| JobError::Transport(err.to_string()))?;
        serde_json::from_slice(&body).map_err(|err| JobError::InvalidResponse(err.to_string()))
    }

    async fn fetch_artifact(&self, locator: &str) -> Result<Bytes, RetrievalError> {
        let url = self.config.resolve(locator);
        log::debug!("GET {}", url);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| RetrievalError::Transport(err.to_string()))?;
        if !res.status().is_success() {
            return Err(RetrievalError::Status(res.status().as_u16()));
        }
        res.bytes()
            .await
            .map_err(|err| RetrievalError::Transport(err.to_string()))
    }
}

fn parse_detail(body: &[u8]) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(detail) if !detail.is_empty() => Some(detail),
        serde_json::Value::Null | serde_json::Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn config_defaults_to_local_service() {
        let config = ServiceConfig::from_lookup(|_| None);
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.base_url, "http://localhost:8000");
    }

    #[test]
    fn config_reads_environment_and_strips_trailing_slash() {
        let config = ServiceConfig::from_lookup(lookup_from(&[
            ("WATERMARK_API_URL", "https://unmark.example.com/"),
            ("WATERMARK_REQUEST_TIMEOUT_SECS", "5"),
            ("WATERMARK_CONNECT_TIMEOUT_SECS", "soon"),
        ]));
        assert_eq!(config.base_url, "https://unmark.example.com");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn resolve_joins_paths_and_keeps_absolute_urls() {
        let config = ServiceConfig::default();
        assert_eq!(
            config.resolve("/api/download/out.pdf"),
            "http://localhost:8000/api/download/out.pdf"
        );
        assert_eq!(config.resolve("files/x.pdf"), "http://localhost:8000/files/x.pdf");
        assert_eq!(
            config.resolve("https://cdn.example.com/x.pdf"),
            "https://cdn.example.com/x.pdf"
        );
    }

    #[test]
    fn detail_is_extracted_from_error_bodies() {
        assert_eq!(
            parse_detail(br#"{"detail": "file too large"}"#),
            Some("file too large".to_string())
        );
        assert_eq!(parse_detail(br#"{"detail": null}"#), None);
        assert_eq!(parse_detail(b"<html>bad gateway</html>"), None);
        assert!(parse_detail(br#"{"detail": [{"msg": "field required"}]}"#)
            .unwrap()
            .contains("field required"));
    }
}
