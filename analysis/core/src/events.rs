//! Session Events
//!
//! Notifications broadcast by an [`AnalysisSession`](crate::session::AnalysisSession)
//! after each state change. Observers (UI, logging, tests) subscribe and
//! re-read the projections they care about; events carry just enough to
//! render without a second read.
//!
//! Every event is sent after the state lock is released, so a projection
//! read in reaction to an event reflects at least that event.

use serde::{Deserialize, Serialize};

use crate::backend::JobId;
use crate::session::AnalysisMode;
use crate::similarity::SimilarityScores;
use crate::terms::TermSlot;

/// A change in session state
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A term set was replaced
    TermSetReplaced {
        /// Which list
        slot: TermSlot,
        /// Number of identifiers now stored
        len: usize,
    },

    /// `analyse()` was called
    AnalysisStarted {
        /// Generation number of this analysis
        generation: u64,
        /// How the analysis is dispatched
        mode: AnalysisMode,
    },

    /// The service accepted an asynchronous job; progress is reset to 0
    JobSubmitted {
        /// Generation this job belongs to
        generation: u64,
        /// Job identifier issued by the service
        job: JobId,
    },

    /// Polling observed new progress for the current job
    ProgressUpdated {
        /// Job the progress belongs to
        job: JobId,
        /// Fraction complete
        progress: f64,
    },

    /// A completed analysis replaced the result and invalid terms
    ResultApplied {
        /// Generation that produced the result
        generation: u64,
        /// New scores
        similarity: SimilarityScores,
        /// Number of invalid terms reported
        invalid_terms: usize,
    },

    /// The invalid term set was overridden directly
    InvalidTermsReplaced {
        /// Number of invalid terms now stored
        count: usize,
    },

    /// The current analysis failed; result and invalid terms are unchanged
    AnalysisFailed {
        /// Generation that failed
        generation: u64,
        /// Error description
        error: String,
    },

    /// A newer analysis took over before this one finished
    AnalysisSuperseded {
        /// Generation that was superseded
        generation: u64,
    },
}

impl SessionEvent {
    /// Short label for logs
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::TermSetReplaced { .. } => "term_set_replaced",
            Self::AnalysisStarted { .. } => "analysis_started",
            Self::JobSubmitted { .. } => "job_submitted",
            Self::ProgressUpdated { .. } => "progress_updated",
            Self::ResultApplied { .. } => "result_applied",
            Self::InvalidTermsReplaced { .. } => "invalid_terms_replaced",
            Self::AnalysisFailed { .. } => "analysis_failed",
            Self::AnalysisSuperseded { .. } => "analysis_superseded",
        }
    }
}
