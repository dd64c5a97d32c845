//! Client for the dbt Cloud v2 API.

use std::fmt;
use std::time::Duration;

use reqwest::{header, Client, Url};
use serde_json::Value;

use crate::config::DbtConfig;

/// Longest upstream error body echoed back in an error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum DbtError {
    #[error("Invalid upstream URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("dbt Cloud returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid path segment: {0:?}")]
    InvalidPathSegment(String),
}

/// Append `.json` unless the name already ends with it.
pub fn normalize_artifact_name(name: &str) -> String {
    if name.ends_with(".json") {
        name.to_string()
    } else {
        format!("{}.json", name)
    }
}

/// Client that injects the service token into every dbt Cloud call.
pub struct DbtClient {
    http_client: Client,
    base_url: Url,
    account_id: String,
    api_key: String,
    latest_run_timeout: Duration,
    artifact_timeout: Duration,
}

impl fmt::Debug for DbtClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbtClient")
            .field("base_url", &self.base_url.as_str())
            .field("account_id", &self.account_id)
            .finish_non_exhaustive()
    }
}

impl DbtClient {
    pub fn new(config: &DbtConfig) -> Result<Self, DbtError> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .map_err(|e| DbtError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DbtError::InvalidUrl(config.base_url.clone()));
        }

        Ok(Self {
            http_client: Client::new(),
            base_url,
            account_id: config.account_id.clone(),
            api_key: config.api_key.clone(),
            latest_run_timeout: Duration::from_secs(config.latest_run_timeout_secs),
            artifact_timeout: Duration::from_secs(config.artifact_timeout_secs),
        })
    }

    /// Build `{base}/accounts/{account}/{segments...}`, encoding each segment.
    ///
    /// `.` and `..` are refused: the url crate drops them instead of encoding,
    /// which would shift the request onto a different upstream path.
    fn account_url(&self, segments: &[&str]) -> Result<Url, DbtError> {
        let dot_segment = std::iter::once(self.account_id.as_str())
            .chain(segments.iter().copied())
            .find(|s| matches!(*s, "." | ".."));
        if let Some(dot) = dot_segment {
            return Err(DbtError::InvalidPathSegment(dot.to_string()));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DbtError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("accounts")
            .push(&self.account_id)
            .extend(segments);
        Ok(url)
    }

    /// `{base}/accounts/{account}/runs/` (trailing slash included).
    pub fn runs_url(&self) -> Result<Url, DbtError> {
        self.account_url(&["runs", ""])
    }

    /// `{base}/accounts/{account}/runs/{run_id}/artifacts/{name}.json`
    pub fn artifact_url(&self, run_id: &str, artifact_name: &str) -> Result<Url, DbtError> {
        let name = normalize_artifact_name(artifact_name);
        self.account_url(&["runs", run_id, "artifacts", &name])
    }

    /// Most recent run for a project/job pair, newest id first, one result.
    pub async fn latest_run(&self, project_id: &str, job_id: &str) -> Result<Value, DbtError> {
        let url = self.runs_url()?;
        let query = [
            ("project_id", project_id),
            ("job_definition_id", job_id),
            ("order_by", "-id"),
            ("limit", "1"),
        ];

        tracing::debug!("Fetching latest run from dbt Cloud: {}", url);

        let request = self.http_client.get(url).query(&query);
        self.send(request, self.latest_run_timeout).await
    }

    /// Fetch a run artifact such as `manifest.json` or `run_results.json`.
    pub async fn artifact(&self, run_id: &str, artifact_name: &str) -> Result<Value, DbtError> {
        let url = self.artifact_url(run_id, artifact_name)?;

        tracing::debug!("Fetching artifact from dbt Cloud: {}", url);

        let request = self.http_client.get(url);
        self.send(request, self.artifact_timeout).await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<Value, DbtError> {
        let response = request
            .header(header::AUTHORIZATION, format!("Token {}", self.api_key))
            .header(header::ACCEPT, "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| DbtError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(DbtError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| DbtError::InvalidResponse(e.to_string()))
    }
}
