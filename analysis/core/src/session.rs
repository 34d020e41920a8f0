//! Analysis Session
//!
//! The single state container for one running client: the two term sets,
//! the last applied similarity result, the invalid terms reported with it,
//! and (in async mode) the current job and its progress.
//!
//! # Design Philosophy
//!
//! The session is constructed explicitly and shared by reference (usually in
//! an `Arc`); there is no global instance. All mutation goes through its
//! commands, all reads through point-in-time projections. State lives behind
//! a lock that is never held across an `.await`, so projections are safe to
//! read at any time, including mid-analysis.
//!
//! # Superseding
//!
//! Every `analyse()` call takes a new generation number. Starting a call
//! synchronously stops the previous polling loop and clears the current job
//! before anything is awaited. A response is applied only if its generation
//! (and, in async mode, its job id) is still current, so a late response from
//! an older call is discarded rather than applied.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

use crate::backend::{AnalysisBackend, JobId, Progress};
use crate::error::RemoteAnalysisError;
use crate::events::SessionEvent;
use crate::polling::{PollConfig, PollHandle, PollUpdate, PollingCoordinator};
use crate::similarity::{AnalysisOutcome, SimilarityScores};
use crate::terms::{DuplicatePolicy, TermSet, TermSlot};

/// Capacity of the channel between a polling loop and `analyse()`
const POLL_CHANNEL_CAPACITY: usize = 16;

/// How `analyse()` talks to the service
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// One request, full result in the response
    Sync,
    /// Submit a job, poll its progress, then fetch the result
    #[default]
    Async,
}

impl AnalysisMode {
    /// Parse a mode name
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sync" | "synchronous" => Some(Self::Sync),
            "async" | "asynchronous" => Some(Self::Async),
            _ => None,
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::Async => write!(f, "async"),
        }
    }
}

/// Where the session is in its analysis lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisPhase {
    /// No analysis has been started
    Idle,
    /// Waiting for the service to accept (or, in sync mode, answer) a request
    Submitting,
    /// Polling an accepted job
    Polling,
    /// The last analysis completed and its result is applied
    Completed,
    /// The last analysis failed; the previous result is still in place
    Failed,
}

/// How a successful `analyse()` call ended
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// This call's result is now the session result
    Applied,
    /// A newer call took over; nothing from this call was applied
    Superseded,
}

/// Session behaviour
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Sync or async dispatch
    pub mode: AnalysisMode,
    /// Polling behaviour (async mode)
    pub poll: PollConfig,
    /// Handling of repeated identifiers in a term set
    pub duplicate_policy: DuplicatePolicy,
    /// Buffered events per subscriber before slow subscribers lag
    pub event_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::default(),
            poll: PollConfig::default(),
            duplicate_policy: DuplicatePolicy::default(),
            event_capacity: 64,
        }
    }
}

/// Consistent copy of every projection, taken under one lock
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Term set 1
    pub list1: Vec<String>,
    /// Term set 2
    pub list2: Vec<String>,
    /// Last applied similarity result
    pub similarity: SimilarityScores,
    /// Invalid terms reported with the last result
    pub invalid_terms: BTreeSet<String>,
    /// Progress of the current (or last) job
    pub progress: f64,
    /// Job currently being tracked
    pub job: Option<JobId>,
    /// Lifecycle phase
    pub phase: AnalysisPhase,
    /// Generation of the latest `analyse()` call (0 = none yet)
    pub generation: u64,
}

struct SessionState {
    list1: TermSet,
    list2: TermSet,
    similarity: SimilarityScores,
    invalid_terms: BTreeSet<String>,
    progress: f64,
    job: Option<JobId>,
    generation: u64,
    phase: AnalysisPhase,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            list1: TermSet::new(),
            list2: TermSet::new(),
            similarity: SimilarityScores::undefined(),
            invalid_terms: BTreeSet::new(),
            progress: 0.0,
            job: None,
            generation: 0,
            phase: AnalysisPhase::Idle,
        }
    }
}

impl SessionState {
    fn slot_mut(&mut self, slot: TermSlot) -> &mut TermSet {
        match slot {
            TermSlot::First => &mut self.list1,
            TermSlot::Second => &mut self.list2,
        }
    }

    fn slot(&self, slot: TermSlot) -> &TermSet {
        match slot {
            TermSlot::First => &self.list1,
            TermSlot::Second => &self.list2,
        }
    }
}

/// Result of offering a progress value to the session
enum ProgressDecision {
    Applied,
    StaleJob,
    Regression { previous: f64 },
}

/// The analysis session
pub struct AnalysisSession<B: AnalysisBackend> {
    /// Configuration
    config: SessionConfig,
    /// Analysis service
    backend: Arc<B>,
    /// All observable state
    state: RwLock<SessionState>,
    /// The polling loop for the current job, if any
    poller: Mutex<Option<PollHandle>>,
    /// Observer notifications
    events: broadcast::Sender<SessionEvent>,
}

impl<B: AnalysisBackend + 'static> AnalysisSession<B> {
    /// Create a session with empty term sets and an undefined result
    pub fn new(backend: B, config: SessionConfig) -> Self {
        Self::with_shared_backend(Arc::new(backend), config)
    }

    /// Create a session over a backend that is also used elsewhere
    pub fn with_shared_backend(backend: Arc<B>, config: SessionConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            config,
            backend,
            state: RwLock::new(SessionState::default()),
            poller: Mutex::new(None),
            events,
        }
    }

    /// Get configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the analysis backend
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    // ========================================================================
    // Commands
    // ========================================================================

    /// Replace a term set wholesale
    ///
    /// Order is preserved; duplicates are handled per the configured policy.
    /// Never triggers an analysis and never affects one already dispatched.
    pub fn set_term_set<I, S>(&self, slot: TermSlot, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let len = {
            let mut state = self.state.write();
            let set = state.slot_mut(slot);
            set.replace(terms, self.config.duplicate_policy);
            set.len()
        };
        tracing::debug!(%slot, len, "Term set replaced");
        self.emit(SessionEvent::TermSetReplaced { slot, len });
    }

    /// Replace the invalid term set wholesale
    pub fn update_invalid_terms<I, S>(&self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let count = {
            let mut state = self.state.write();
            state.invalid_terms = terms.into_iter().map(Into::into).collect();
            state.invalid_terms.len()
        };
        tracing::debug!(count, "Invalid terms replaced");
        self.emit(SessionEvent::InvalidTermsReplaced { count });
    }

    /// Compare the current term sets using the remote service
    ///
    /// The term sets are read once, when the call starts. Any polling loop
    /// from an earlier call is stopped before this call dispatches anything.
    ///
    /// # Errors
    ///
    /// Returns the [`RemoteAnalysisError`] of a failed submission, result
    /// fetch, or exhausted polling loop. The similarity result and invalid
    /// terms are left untouched; progress keeps its last observed value.
    /// A call overtaken by a newer one returns `Ok(Completion::Superseded)`
    /// whether its own request succeeded or failed.
    pub async fn analyse(&self) -> Result<Completion, RemoteAnalysisError> {
        let (generation, sample1, sample2) = self.begin_analysis();
        tracing::info!(
            generation,
            mode = %self.config.mode,
            terms1 = sample1.len(),
            terms2 = sample2.len(),
            "Starting analysis"
        );
        self.emit(SessionEvent::AnalysisStarted {
            generation,
            mode: self.config.mode,
        });

        match self.config.mode {
            AnalysisMode::Sync => self.run_sync(generation, &sample1, &sample2).await,
            AnalysisMode::Async => self.run_async(generation, &sample1, &sample2).await,
        }
    }

    // ========================================================================
    // Projections
    // ========================================================================

    /// Current contents of a term set
    pub fn term_set(&self, slot: TermSlot) -> Vec<String> {
        self.state.read().slot(slot).as_slice().to_vec()
    }

    /// Last applied similarity result
    pub fn similarity(&self) -> SimilarityScores {
        self.state.read().similarity
    }

    /// Invalid terms reported with the last result
    pub fn invalid_terms(&self) -> BTreeSet<String> {
        self.state.read().invalid_terms.clone()
    }

    /// Progress of the current (or last) job
    pub fn progress(&self) -> f64 {
        self.state.read().progress
    }

    /// Job currently being tracked
    pub fn current_job(&self) -> Option<JobId> {
        self.state.read().job.clone()
    }

    /// Lifecycle phase
    pub fn phase(&self) -> AnalysisPhase {
        self.state.read().phase
    }

    /// Every projection at once
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        SessionSnapshot {
            list1: state.list1.as_slice().to_vec(),
            list2: state.list2.as_slice().to_vec(),
            similarity: state.similarity,
            invalid_terms: state.invalid_terms.clone(),
            progress: state.progress,
            job: state.job.clone(),
            phase: state.phase,
            generation: state.generation,
        }
    }

    // ========================================================================
    // Analysis flow
    // ========================================================================

    /// Supersede any earlier call and snapshot the inputs
    fn begin_analysis(&self) -> (u64, Vec<String>, Vec<String>) {
        let mut poller = self.poller.lock();
        if let Some(previous) = poller.take() {
            tracing::debug!(job = %previous.job(), "Stopping polling loop of superseded job");
        }

        let mut state = self.state.write();
        state.generation += 1;
        state.job = None;
        state.phase = AnalysisPhase::Submitting;
        (
            state.generation,
            state.list1.as_slice().to_vec(),
            state.list2.as_slice().to_vec(),
        )
    }

    async fn run_sync(
        &self,
        generation: u64,
        sample1: &[String],
        sample2: &[String],
    ) -> Result<Completion, RemoteAnalysisError> {
        match self.backend.submit_sync(sample1, sample2).await {
            Ok(outcome) => Ok(self.apply_outcome(generation, None, outcome)),
            Err(error) => self.fail(generation, error),
        }
    }

    async fn run_async(
        &self,
        generation: u64,
        sample1: &[String],
        sample2: &[String],
    ) -> Result<Completion, RemoteAnalysisError> {
        let job = match self.backend.submit_async(sample1, sample2).await {
            Ok(job) => job,
            Err(error) => return self.fail(generation, error),
        };

        let (tx, mut rx) = mpsc::channel(POLL_CHANNEL_CAPACITY);
        let installed = {
            let mut poller = self.poller.lock();
            let mut state = self.state.write();
            if state.generation == generation {
                state.job = Some(job.clone());
                state.progress = 0.0;
                state.phase = AnalysisPhase::Polling;
                let coordinator =
                    PollingCoordinator::new(Arc::clone(&self.backend), self.config.poll.clone());
                *poller = Some(coordinator.spawn(job.clone(), tx));
                true
            } else {
                false
            }
        };

        if !installed {
            tracing::debug!(generation, job = %job, "Job accepted for superseded analysis, not polling");
            return Ok(self.superseded(generation));
        }

        tracing::info!(generation, job = %job, "Analysis job submitted");
        self.emit(SessionEvent::JobSubmitted {
            generation,
            job: job.clone(),
        });

        while let Some(update) = rx.recv().await {
            match update {
                PollUpdate::Progress { job, progress } => {
                    self.apply_progress(&job, progress);
                }
                PollUpdate::Finished { job, outcome } => {
                    return Ok(self.apply_outcome(generation, Some(&job), outcome));
                }
                PollUpdate::Failed { job, error } => {
                    if self.is_current_job(&job) {
                        return self.fail(generation, error);
                    }
                    return Ok(self.superseded(generation));
                }
            }
        }

        // The loop exited without a verdict: it was stopped by a newer call
        Ok(self.superseded(generation))
    }

    fn is_current_job(&self, job: &JobId) -> bool {
        self.state.read().job.as_ref() == Some(job)
    }

    /// Record progress for `job` if it is still current and not a regression
    fn apply_progress(&self, job: &JobId, progress: Progress) -> bool {
        let value = progress.value();
        let decision = {
            let mut state = self.state.write();
            if state.job.as_ref() != Some(job) {
                ProgressDecision::StaleJob
            } else if value < state.progress {
                ProgressDecision::Regression {
                    previous: state.progress,
                }
            } else {
                state.progress = value;
                ProgressDecision::Applied
            }
        };

        match decision {
            ProgressDecision::Applied => {
                tracing::debug!(job = %job, progress = value, "Progress updated");
                self.emit(SessionEvent::ProgressUpdated {
                    job: job.clone(),
                    progress: value,
                });
                true
            }
            ProgressDecision::StaleJob => {
                tracing::debug!(job = %job, progress = value, "Discarding progress of superseded job");
                false
            }
            ProgressDecision::Regression { previous } => {
                tracing::warn!(
                    job = %job,
                    previous,
                    reported = value,
                    "Service reported lower progress than before, ignoring"
                );
                false
            }
        }
    }

    /// Replace result and invalid terms together if `generation` (and `job`)
    /// are still current
    fn apply_outcome(
        &self,
        generation: u64,
        job: Option<&JobId>,
        outcome: AnalysisOutcome,
    ) -> Completion {
        let similarity = outcome.similarity;
        let invalid_count = outcome.invalid_terms.len();

        let applied = {
            let mut state = self.state.write();
            let job_matches = job.map_or(true, |j| state.job.as_ref() == Some(j));
            if state.generation == generation && job_matches {
                state.similarity = outcome.similarity;
                state.invalid_terms = outcome.invalid_terms;
                state.phase = AnalysisPhase::Completed;
                true
            } else {
                false
            }
        };

        if !applied {
            tracing::debug!(generation, "Discarding result of superseded analysis");
            return self.superseded(generation);
        }

        tracing::info!(
            generation,
            biological_process = similarity.biological_process,
            cellular_component = similarity.cellular_component,
            molecular_function = similarity.molecular_function,
            invalid_terms = invalid_count,
            "Analysis result applied"
        );
        self.emit(SessionEvent::ResultApplied {
            generation,
            similarity,
            invalid_terms: invalid_count,
        });
        Completion::Applied
    }

    /// Mark `generation` failed and hand the error back, or report it
    /// superseded when a newer call has started
    fn fail(
        &self,
        generation: u64,
        error: RemoteAnalysisError,
    ) -> Result<Completion, RemoteAnalysisError> {
        let current = {
            let mut state = self.state.write();
            if state.generation == generation {
                state.phase = AnalysisPhase::Failed;
                true
            } else {
                false
            }
        };

        if !current {
            tracing::debug!(generation, error = %error, "Superseded analysis failed");
            return Ok(self.superseded(generation));
        }

        tracing::error!(generation, error = %error, "Analysis failed");
        self.emit(SessionEvent::AnalysisFailed {
            generation,
            error: error.to_string(),
        });
        Err(error)
    }

    fn superseded(&self, generation: u64) -> Completion {
        tracing::debug!(generation, "Analysis superseded");
        self.emit(SessionEvent::AnalysisSuperseded { generation });
        Completion::Superseded
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
