//! Job Polling
//!
//! Drives the progress loop for one asynchronous analysis job. The loop runs
//! as its own tokio task and reports through an mpsc channel; it never
//! touches session state directly.
//!
//! # Protocol
//!
//! ```text
//! poll_progress ──> Progress ──> < 1 ──> sleep(interval) ──> poll_progress ...
//!                            └─> = 1 ──> fetch_result ──> Finished / Failed
//! ```
//!
//! The delay is measured between the end of one request and the start of the
//! next, so a slow service never sees overlapping requests.
//!
//! # Stopping
//!
//! Dropping (or calling [`PollHandle::stop`] on) the handle stops the loop.
//! A request already in flight is allowed to finish, but its response is
//! discarded instead of reported.
//!
//! # Failures
//!
//! A failed progress request is retried on the next tick. After
//! `max_consecutive_failures` failures in a row the last error is reported
//! as [`PollUpdate::Failed`]. A failed result fetch is reported immediately.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::backend::{AnalysisBackend, JobId, Progress};
use crate::error::RemoteAnalysisError;
use crate::similarity::AnalysisOutcome;

/// Polling behaviour
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between the end of one progress request and the next
    pub interval: Duration,
    /// Consecutive failed progress requests tolerated before giving up
    /// (0 = retry forever)
    pub max_consecutive_failures: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_consecutive_failures: 5,
        }
    }
}

impl PollConfig {
    /// Whether another attempt is allowed after `failures` consecutive failures
    #[must_use]
    pub fn allows_retry(&self, failures: u32) -> bool {
        self.max_consecutive_failures == 0 || failures < self.max_consecutive_failures
    }
}

/// Report from a polling loop to its owner
#[derive(Debug)]
pub enum PollUpdate {
    /// The service reported progress for the job
    Progress {
        /// Job the response belongs to
        job: JobId,
        /// Reported progress
        progress: Progress,
    },
    /// Progress reached 1 and the result was fetched
    Finished {
        /// Job the result belongs to
        job: JobId,
        /// The job's result
        outcome: AnalysisOutcome,
    },
    /// The loop gave up
    Failed {
        /// Job that failed
        job: JobId,
        /// Last error seen
        error: RemoteAnalysisError,
    },
}

impl PollUpdate {
    /// Job this update belongs to
    #[must_use]
    pub fn job(&self) -> &JobId {
        match self {
            Self::Progress { job, .. } | Self::Finished { job, .. } | Self::Failed { job, .. } => {
                job
            }
        }
    }
}

/// Owner's handle on a running polling loop
///
/// The loop stops when the handle is dropped.
#[derive(Debug)]
pub struct PollHandle {
    job: JobId,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Job this loop polls
    #[must_use]
    pub fn job(&self) -> &JobId {
        &self.job
    }

    /// Ask the loop to stop; in-flight responses are discarded
    pub fn stop(&self) {
        self.stop.send_replace(true);
    }

    /// Whether a stop has been requested
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Whether the loop task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

fn is_stopped(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow()
}

/// Runs the progress loop for a single job
pub struct PollingCoordinator<B: AnalysisBackend> {
    backend: Arc<B>,
    config: PollConfig,
}

impl<B: AnalysisBackend + 'static> PollingCoordinator<B> {
    /// Create a coordinator for `backend`
    pub fn new(backend: Arc<B>, config: PollConfig) -> Self {
        Self { backend, config }
    }

    /// Start polling `job` on a new task, reporting to `updates`
    pub fn spawn(self, job: JobId, updates: mpsc::Sender<PollUpdate>) -> PollHandle {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(job.clone(), updates, stop_rx));
        PollHandle {
            job,
            stop: stop_tx,
            task,
        }
    }

    /// The polling loop
    ///
    /// Returns after reporting `Finished` or `Failed`, when stopped, or when
    /// the receiver goes away.
    pub async fn run(
        self,
        job: JobId,
        updates: mpsc::Sender<PollUpdate>,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut attempt: u64 = 0;
        let mut failures: u32 = 0;

        loop {
            if is_stopped(&stop) {
                tracing::debug!(job = %job, "Polling stopped");
                return;
            }

            attempt += 1;
            let polled = self.backend.poll_progress(&job).await;

            if is_stopped(&stop) {
                tracing::debug!(job = %job, attempt, "Discarding progress response for stopped job");
                return;
            }

            match polled {
                Ok(progress) => {
                    failures = 0;
                    tracing::debug!(job = %job, attempt, progress = progress.value(), "Polled job progress");

                    let update = PollUpdate::Progress {
                        job: job.clone(),
                        progress,
                    };
                    if updates.send(update).await.is_err() {
                        return;
                    }

                    if progress.is_complete() {
                        self.finish(&job, &updates, &stop).await;
                        return;
                    }
                }
                Err(error) => {
                    failures += 1;
                    if !self.config.allows_retry(failures) {
                        tracing::error!(
                            job = %job,
                            attempt,
                            failures,
                            error = %error,
                            "Progress polling failed, giving up"
                        );
                        let _ = updates
                            .send(PollUpdate::Failed {
                                job: job.clone(),
                                error,
                            })
                            .await;
                        return;
                    }
                    tracing::warn!(
                        job = %job,
                        attempt,
                        failures,
                        error = %error,
                        "Progress request failed, retrying on next tick"
                    );
                }
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.interval) => {}
                _ = stop.changed() => {
                    tracing::debug!(job = %job, "Polling stopped while waiting");
                    return;
                }
            }
        }
    }

    /// Fetch the result once progress has reached 1
    async fn finish(
        &self,
        job: &JobId,
        updates: &mpsc::Sender<PollUpdate>,
        stop: &watch::Receiver<bool>,
    ) {
        let update = match self.backend.fetch_result(job).await {
            Ok(outcome) => PollUpdate::Finished {
                job: job.clone(),
                outcome,
            },
            Err(error) => {
                tracing::error!(job = %job, error = %error, "Fetching job result failed");
                PollUpdate::Failed {
                    job: job.clone(),
                    error,
                }
            }
        };

        if is_stopped(stop) {
            tracing::debug!(job = %job, "Discarding result for stopped job");
            return;
        }
        let _ = updates.send(update).await;
    }
}
