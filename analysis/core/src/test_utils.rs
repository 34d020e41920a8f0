//! Scripted Backend for Tests
//!
//! An [`AnalysisBackend`] whose every response is scripted up front and whose
//! every call is recorded, so tests can assert both state and call order
//! without a live service.
//!
//! # Usage
//!
//! ```ignore
//! let backend = ScriptedBackend::new()
//!     .with_submission("job-1")
//!     .with_job("job-1", &[0.0, 0.4, 1.0], outcome);
//!
//! // After the test, verify what was called
//! assert_eq!(backend.result_calls("job-1"), 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::backend::{AnalysisBackend, JobId, Progress, TermRecord};
use crate::error::{RemoteAnalysisError, RemoteOperation, RemoteResult};
use crate::similarity::AnalysisOutcome;

/// A recorded backend call
#[derive(Clone, Debug, PartialEq)]
pub enum BackendCall {
    /// `submit_sync`
    SubmitSync {
        /// Term set 1 as sent
        sample1: Vec<String>,
        /// Term set 2 as sent
        sample2: Vec<String>,
    },
    /// `submit_async`
    SubmitAsync {
        /// Term set 1 as sent
        sample1: Vec<String>,
        /// Term set 2 as sent
        sample2: Vec<String>,
    },
    /// `poll_progress`
    Progress(JobId),
    /// `fetch_result`
    Result(JobId),
    /// `resolve_terms`
    ResolveTerms(Vec<String>),
}

/// A scripted response, optionally delayed
struct Scripted<T> {
    delay: Duration,
    response: RemoteResult<T>,
}

#[derive(Default)]
struct JobScript {
    progress: VecDeque<RemoteResult<Progress>>,
    poll_delay: Duration,
    result: Option<RemoteResult<AnalysisOutcome>>,
    result_delay: Duration,
}

/// Backend that replays scripted responses
#[derive(Default)]
pub struct ScriptedBackend {
    calls: Mutex<Vec<BackendCall>>,
    sync_results: Mutex<VecDeque<Scripted<AnalysisOutcome>>>,
    submissions: Mutex<VecDeque<Scripted<JobId>>>,
    jobs: Mutex<HashMap<JobId, JobScript>>,
    terms: Mutex<Vec<TermRecord>>,
}

fn exhausted(operation: RemoteOperation) -> RemoteAnalysisError {
    RemoteAnalysisError::transport(operation, "script exhausted")
}

impl ScriptedBackend {
    /// Create a backend with nothing scripted
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a synchronous analysis response
    #[must_use]
    pub fn with_sync_result(self, response: RemoteResult<AnalysisOutcome>) -> Self {
        self.with_delayed_sync_result(Duration::ZERO, response)
    }

    /// Queue a synchronous analysis response that arrives after `delay`
    #[must_use]
    pub fn with_delayed_sync_result(
        self,
        delay: Duration,
        response: RemoteResult<AnalysisOutcome>,
    ) -> Self {
        self.sync_results
            .lock()
            .push_back(Scripted { delay, response });
        self
    }

    /// Queue a successful job submission
    #[must_use]
    pub fn with_submission(self, job: &str) -> Self {
        self.with_delayed_submission(Duration::ZERO, Ok(JobId::new(job)))
    }

    /// Queue a submission response that arrives after `delay`
    #[must_use]
    pub fn with_delayed_submission(self, delay: Duration, response: RemoteResult<JobId>) -> Self {
        self.submissions
            .lock()
            .push_back(Scripted { delay, response });
        self
    }

    /// Script a job's progress sequence and final result
    #[must_use]
    pub fn with_job(self, job: &str, progress: &[f64], outcome: AnalysisOutcome) -> Self {
        {
            let mut jobs = self.jobs.lock();
            let script = jobs.entry(JobId::new(job)).or_default();
            for value in progress {
                script
                    .progress
                    .push_back(Ok(Progress::new(*value).expect("scripted progress in range")));
            }
            script.result = Some(Ok(outcome));
        }
        self
    }

    /// Append one more progress value to a job's script
    #[must_use]
    pub fn then_progress(self, job: &str, value: f64) -> Self {
        self.jobs
            .lock()
            .entry(JobId::new(job))
            .or_default()
            .progress
            .push_back(Ok(Progress::new(value).expect("scripted progress in range")));
        self
    }

    /// Append a failing progress response to a job's script
    #[must_use]
    pub fn then_progress_error(self, job: &str, error: RemoteAnalysisError) -> Self {
        self.jobs
            .lock()
            .entry(JobId::new(job))
            .or_default()
            .progress
            .push_back(Err(error));
        self
    }

    /// Delay every progress response for `job`
    #[must_use]
    pub fn with_poll_delay(self, job: &str, delay: Duration) -> Self {
        self.jobs.lock().entry(JobId::new(job)).or_default().poll_delay = delay;
        self
    }

    /// Delay the result response for `job`
    #[must_use]
    pub fn with_result_delay(self, job: &str, delay: Duration) -> Self {
        self.jobs.lock().entry(JobId::new(job)).or_default().result_delay = delay;
        self
    }

    /// Make the result fetch for `job` fail
    #[must_use]
    pub fn with_result_error(self, job: &str, error: RemoteAnalysisError) -> Self {
        self.jobs.lock().entry(JobId::new(job)).or_default().result = Some(Err(error));
        self
    }

    /// Records returned by `resolve_terms`
    #[must_use]
    pub fn with_terms(self, records: Vec<TermRecord>) -> Self {
        *self.terms.lock() = records;
        self
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    /// Number of progress requests for `job`
    pub fn progress_calls(&self, job: &str) -> usize {
        let job = JobId::new(job);
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, BackendCall::Progress(j) if *j == job))
            .count()
    }

    /// Number of result requests for `job`
    pub fn result_calls(&self, job: &str) -> usize {
        let job = JobId::new(job);
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, BackendCall::Result(j) if *j == job))
            .count()
    }

    fn record(&self, call: BackendCall) {
        self.calls.lock().push(call);
    }
}

async fn delayed<T>(scripted: Option<Scripted<T>>, operation: RemoteOperation) -> RemoteResult<T> {
    match scripted {
        Some(Scripted { delay, response }) => {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response
        }
        None => Err(exhausted(operation)),
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn submit_sync(
        &self,
        sample1: &[String],
        sample2: &[String],
    ) -> RemoteResult<AnalysisOutcome> {
        self.record(BackendCall::SubmitSync {
            sample1: sample1.to_vec(),
            sample2: sample2.to_vec(),
        });
        let next = self.sync_results.lock().pop_front();
        delayed(next, RemoteOperation::Analyse).await
    }

    async fn submit_async(&self, sample1: &[String], sample2: &[String]) -> RemoteResult<JobId> {
        self.record(BackendCall::SubmitAsync {
            sample1: sample1.to_vec(),
            sample2: sample2.to_vec(),
        });
        let next = self.submissions.lock().pop_front();
        delayed(next, RemoteOperation::Submit).await
    }

    async fn poll_progress(&self, job: &JobId) -> RemoteResult<Progress> {
        self.record(BackendCall::Progress(job.clone()));
        let next = self.jobs.lock().get_mut(job).map(|script| Scripted {
            delay: script.poll_delay,
            response: script
                .progress
                .pop_front()
                .unwrap_or_else(|| Err(exhausted(RemoteOperation::Progress))),
        });
        delayed(next, RemoteOperation::Progress).await
    }

    async fn fetch_result(&self, job: &JobId) -> RemoteResult<AnalysisOutcome> {
        self.record(BackendCall::Result(job.clone()));
        let next = self.jobs.lock().get(job).map(|script| Scripted {
            delay: script.result_delay,
            response: script
                .result
                .clone()
                .unwrap_or_else(|| Err(exhausted(RemoteOperation::Result))),
        });
        delayed(next, RemoteOperation::Result).await
    }

    async fn resolve_terms(&self, ids: &[String]) -> RemoteResult<Vec<TermRecord>> {
        self.record(BackendCall::ResolveTerms(ids.to_vec()));
        let records = self.terms.lock();
        Ok(records
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect())
    }
}
