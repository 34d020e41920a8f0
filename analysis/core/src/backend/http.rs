//! HTTP Backend Implementation
//!
//! [`AnalysisBackend`] over JSON/HTTP using reqwest.
//!
//! # Service API
//!
//! - `POST {base}/analyse` - synchronous analysis, or job submission in async mode
//! - `GET {base}/progress/{id}` - job progress
//! - `GET {base}/result/{id}` - job result
//! - `POST {base}/goterms` - term metadata
//!
//! Paths come from [`Endpoints`](super::Endpoints); only the base URL is
//! deployment specific.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Serialize;

use super::traits::{AnalysisBackend, BackendConfig, JobId, Progress, TermRecord};
use super::wire::{self, AnalysisRequest, TermsRequest};
use crate::config::ConfigError;
use crate::error::{RemoteAnalysisError, RemoteOperation, RemoteResult};
use crate::similarity::AnalysisOutcome;

/// HTTP analysis service client
#[derive(Clone, Debug)]
pub struct HttpAnalysisBackend {
    /// Connection settings
    config: BackendConfig,
    /// Parsed service root, always ending in `/`
    base_url: Url,
    /// HTTP client
    http_client: reqwest::Client,
}

impl HttpAnalysisBackend {
    /// Create a new HTTP backend
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if the base URL does not parse
    /// or the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, ConfigError> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| ConfigError::ValidationError(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            config,
            base_url,
            http_client,
        })
    }

    /// Connection settings this backend was built with
    #[must_use]
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Resolve an endpoint path against the base URL
    fn endpoint_url(&self, operation: RemoteOperation, path: &str) -> RemoteResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| RemoteAnalysisError::transport(operation, format!("invalid URL: {e}")))
    }

    /// Endpoint URL with the job id appended as one path segment
    fn job_url(&self, operation: RemoteOperation, path: &str, job: &JobId) -> RemoteResult<Url> {
        let mut url = self.endpoint_url(operation, path)?;
        url.path_segments_mut()
            .map_err(|()| RemoteAnalysisError::transport(operation, "base URL cannot hold a path"))?
            .pop_if_empty()
            .push(job.as_str());
        Ok(url)
    }

    async fn post_json<T: Serialize + ?Sized>(
        &self,
        operation: RemoteOperation,
        url: Url,
        body: &T,
    ) -> RemoteResult<String> {
        let request = self.http_client.post(url).json(body);
        Self::execute(operation, request).await
    }

    async fn get(&self, operation: RemoteOperation, url: Url) -> RemoteResult<String> {
        let request = self.http_client.get(url);
        Self::execute(operation, request).await
    }

    /// Send a request and return the body of a successful response
    async fn execute(
        operation: RemoteOperation,
        request: reqwest::RequestBuilder,
    ) -> RemoteResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| RemoteAnalysisError::transport(operation, e.to_string()))?;

        // Check for HTTP errors
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteAnalysisError::Status {
                operation,
                status,
                body,
            });
        }

        response
            .text()
            .await
            .map_err(|e| RemoteAnalysisError::transport(operation, e.to_string()))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::ValidationError(format!("invalid base URL {raw:?}: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::ValidationError(format!(
            "base URL {raw:?} cannot carry request paths"
        )));
    }
    // Url::join replaces the last segment unless the path ends with '/'
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl AnalysisBackend for HttpAnalysisBackend {
    fn name(&self) -> &'static str {
        "HTTP"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.base_url.clone())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok_and(|r| r.status().is_success())
    }

    async fn submit_sync(
        &self,
        sample1: &[String],
        sample2: &[String],
    ) -> RemoteResult<AnalysisOutcome> {
        let operation = RemoteOperation::Analyse;
        let url = self.endpoint_url(operation, &self.config.endpoints.analyse)?;
        tracing::debug!(%url, terms1 = sample1.len(), terms2 = sample2.len(), "Submitting analysis");

        let body = self
            .post_json(operation, url, &AnalysisRequest { sample1, sample2 })
            .await?;
        wire::parse_outcome(operation, &body)
    }

    async fn submit_async(&self, sample1: &[String], sample2: &[String]) -> RemoteResult<JobId> {
        let operation = RemoteOperation::Submit;
        let url = self.endpoint_url(operation, &self.config.endpoints.submit)?;
        tracing::debug!(%url, terms1 = sample1.len(), terms2 = sample2.len(), "Submitting analysis job");

        let body = self
            .post_json(operation, url, &AnalysisRequest { sample1, sample2 })
            .await?;
        wire::parse_job_id(&body)
    }

    async fn poll_progress(&self, job: &JobId) -> RemoteResult<Progress> {
        let operation = RemoteOperation::Progress;
        let url = self.job_url(operation, &self.config.endpoints.progress, job)?;
        let body = self.get(operation, url).await?;
        wire::parse_progress(&body)
    }

    async fn fetch_result(&self, job: &JobId) -> RemoteResult<AnalysisOutcome> {
        let operation = RemoteOperation::Result;
        let url = self.job_url(operation, &self.config.endpoints.result, job)?;
        let body = self.get(operation, url).await?;
        wire::parse_outcome(operation, &body)
    }

    async fn resolve_terms(&self, ids: &[String]) -> RemoteResult<Vec<TermRecord>> {
        let operation = RemoteOperation::ResolveTerms;
        let url = self.endpoint_url(operation, &self.config.endpoints.goterms)?;
        let body = self
            .post_json(operation, url, &TermsRequest { goterms: ids })
            .await?;
        wire::parse_terms(&body)
    }
}
