//! Analysis Backend Traits
//!
//! Trait definition for the remote analysis service. The session only ever
//! talks to an [`AnalysisBackend`], so tests and alternative transports can
//! stand in for the HTTP implementation.
//!
//! # Call Shapes
//!
//! - `submit_sync`: one request, full result, no job concept
//! - `submit_async` + `poll_progress` + `fetch_result`: job-based flow
//! - `resolve_terms`: metadata lookup, independent of any analysis
//!
//! Implementations never retry. Retry policy belongs to the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RemoteResult;
use crate::similarity::AnalysisOutcome;

/// Opaque identifier of a server-side analysis job
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Wrap a job identifier issued by the service
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fraction of a job that is done, always within `[0, 1]`
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Progress(f64);

impl Progress {
    /// Nothing done yet
    pub const ZERO: Self = Self(0.0);
    /// Terminal value; the result may be fetched
    pub const COMPLETE: Self = Self(1.0);

    /// Validate a raw progress value
    ///
    /// Returns `None` for NaN or values outside `[0, 1]`.
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        (0.0..=1.0).contains(&value).then_some(Self(value))
    }

    /// The raw fraction
    #[must_use]
    pub fn value(self) -> f64 {
        self.0
    }

    /// Whether the job has reached the terminal value
    #[must_use]
    pub fn is_complete(self) -> bool {
        self.0 >= 1.0
    }
}

/// A resolved GO term as returned by the metadata lookup
///
/// Only `id` is guaranteed; the remaining fields belong to the service and
/// are passed through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TermRecord {
    /// Term identifier
    pub id: String,
    /// Human-readable term name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// GO namespace / category
    #[serde(default, alias = "namespace", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Any further fields the service sends
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Analysis backend trait
///
/// Implement this trait to talk to the analysis service over a different
/// transport.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Get the backend name (e.g., "HTTP")
    fn name(&self) -> &str;

    /// Check if the service is reachable
    async fn health_check(&self) -> bool;

    /// Run a complete analysis in one round trip
    async fn submit_sync(
        &self,
        sample1: &[String],
        sample2: &[String],
    ) -> RemoteResult<AnalysisOutcome>;

    /// Start a remote analysis job and return its identifier immediately
    async fn submit_async(&self, sample1: &[String], sample2: &[String]) -> RemoteResult<JobId>;

    /// Ask how far a job has progressed
    async fn poll_progress(&self, job: &JobId) -> RemoteResult<Progress>;

    /// Fetch the result of a job whose progress has reached 1
    async fn fetch_result(&self, job: &JobId) -> RemoteResult<AnalysisOutcome>;

    /// Resolve term identifiers to descriptive records
    async fn resolve_terms(&self, ids: &[String]) -> RemoteResult<Vec<TermRecord>>;
}

/// Request paths relative to the service base URL
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Synchronous analysis (POST)
    pub analyse: String,
    /// Asynchronous job submission (POST)
    pub submit: String,
    /// Job progress, job id appended as a path segment (GET)
    pub progress: String,
    /// Job result, job id appended as a path segment (GET)
    pub result: String,
    /// Term metadata lookup (POST)
    pub goterms: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            analyse: "/analyse".to_string(),
            submit: "/analyse".to_string(),
            progress: "/progress".to_string(),
            result: "/result".to_string(),
            goterms: "/goterms".to_string(),
        }
    }
}

/// Backend connection configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendConfig {
    /// Service root, e.g. `http://localhost:5000` or `https://host/api`
    pub base_url: String,
    /// Request paths
    pub endpoints: Endpoints,
    /// Per-request timeout (None = wait indefinitely)
    pub request_timeout: Option<Duration>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            endpoints: Endpoints::default(),
            request_timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl BackendConfig {
    /// Configuration for a service at `base_url` with default paths
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }
}
