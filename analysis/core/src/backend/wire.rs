//! Wire Format
//!
//! JSON request and response bodies exchanged with the analysis service.
//! Field names are fixed by the service and must not change.
//!
//! ```text
//! POST analyse/submit   {"sample1": [...], "sample2": [...]}
//!   sync response       {"invalid": [...], "similarity": {"biological_process": n, ...}}
//!   async response      {"analysis_id": "..."}
//! GET progress/{id}     {"progress": "0.4"}
//! GET result/{id}       same shape as the sync response
//! POST goterms          {"goterms": [...]}  ->  {"goterms": [TermRecord...]}
//! ```
//!
//! Parsing never substitutes defaults for missing fields: an absent score is
//! a malformed response. An explicit `null` score means "undefined" (NaN).

use serde::{Deserialize, Deserializer, Serialize};

use super::traits::{JobId, Progress, TermRecord};
use crate::error::{RemoteAnalysisError, RemoteOperation, RemoteResult};
use crate::similarity::{AnalysisOutcome, SimilarityScores};

/// Body of an analysis submission (sync or async)
#[derive(Debug, Serialize)]
pub struct AnalysisRequest<'a> {
    /// Term set 1
    pub sample1: &'a [String],
    /// Term set 2
    pub sample2: &'a [String],
}

/// Body of a term metadata lookup
#[derive(Debug, Serialize)]
pub struct TermsRequest<'a> {
    /// Identifiers to resolve
    pub goterms: &'a [String],
}

#[derive(Debug, Deserialize)]
struct SimilarityResponse {
    invalid: Vec<String>,
    similarity: SimilarityBody,
}

#[derive(Debug, Deserialize)]
struct SimilarityBody {
    #[serde(deserialize_with = "score")]
    biological_process: f64,
    #[serde(deserialize_with = "score")]
    cellular_component: f64,
    #[serde(deserialize_with = "score")]
    molecular_function: f64,
}

/// Required score field; `null` maps to NaN. Using `deserialize_with` keeps
/// serde from treating a missing field as `None`.
fn score<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    analysis_id: String,
}

#[derive(Debug, Deserialize)]
struct ProgressResponse {
    progress: ProgressValue,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ProgressValue {
    Text(String),
    Number(f64),
}

#[derive(Debug, Deserialize)]
struct TermsResponse {
    goterms: Vec<TermRecord>,
}

fn decode<'a, T: Deserialize<'a>>(operation: RemoteOperation, body: &'a str) -> RemoteResult<T> {
    serde_json::from_str(body).map_err(|e| RemoteAnalysisError::malformed(operation, e.to_string()))
}

/// Parse a sync analysis or job result body
///
/// # Errors
///
/// `MalformedResponse` if the body is not the documented shape.
pub fn parse_outcome(operation: RemoteOperation, body: &str) -> RemoteResult<AnalysisOutcome> {
    let response: SimilarityResponse = decode(operation, body)?;
    let s = response.similarity;
    Ok(AnalysisOutcome::new(
        SimilarityScores::new(s.biological_process, s.cellular_component, s.molecular_function),
        response.invalid,
    ))
}

/// Parse an async submission body
///
/// # Errors
///
/// `MalformedResponse` if `analysis_id` is missing, not a string, or empty.
pub fn parse_job_id(body: &str) -> RemoteResult<JobId> {
    let response: SubmissionResponse = decode(RemoteOperation::Submit, body)?;
    if response.analysis_id.trim().is_empty() {
        return Err(RemoteAnalysisError::malformed(
            RemoteOperation::Submit,
            "empty analysis_id",
        ));
    }
    Ok(JobId::new(response.analysis_id))
}

/// Parse a progress body
///
/// The service sends the value as a string; a bare number is accepted too.
///
/// # Errors
///
/// `MalformedResponse` if the value is missing, not a float, or outside `[0, 1]`.
pub fn parse_progress(body: &str) -> RemoteResult<Progress> {
    let response: ProgressResponse = decode(RemoteOperation::Progress, body)?;
    let value = match response.progress {
        ProgressValue::Number(n) => n,
        ProgressValue::Text(text) => text.trim().parse::<f64>().map_err(|_| {
            RemoteAnalysisError::malformed(
                RemoteOperation::Progress,
                format!("progress {text:?} is not a number"),
            )
        })?,
    };
    Progress::new(value).ok_or_else(|| {
        RemoteAnalysisError::malformed(
            RemoteOperation::Progress,
            format!("progress {value} outside [0, 1]"),
        )
    })
}

/// Parse a term metadata body
///
/// # Errors
///
/// `MalformedResponse` if `goterms` is missing or a record lacks `id`.
pub fn parse_terms(body: &str) -> RemoteResult<Vec<TermRecord>> {
    let response: TermsResponse = decode(RemoteOperation::ResolveTerms, body)?;
    Ok(response.goterms)
}
