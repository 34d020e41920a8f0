//! Remote Analysis Errors
//!
//! Every failure talking to the analysis service is reported as a
//! [`RemoteAnalysisError`] tagged with the operation that failed. Nothing in
//! this crate retries on its own except the polling loop, which applies its
//! configured failure budget.

use thiserror::Error;

/// The remote call an error belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    /// Synchronous full-result analysis
    Analyse,
    /// Asynchronous job submission
    Submit,
    /// Job progress check
    Progress,
    /// Job result fetch
    Result,
    /// Term metadata lookup
    ResolveTerms,
}

impl RemoteOperation {
    /// Short name used in logs and error messages
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Analyse => "analyse",
            Self::Submit => "submit",
            Self::Progress => "progress",
            Self::Result => "result",
            Self::ResolveTerms => "goterms",
        }
    }
}

impl std::fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a call to the remote analysis service
#[derive(Clone, Debug, Error, PartialEq)]
pub enum RemoteAnalysisError {
    /// The request never produced a response (connect, timeout, I/O)
    #[error("{operation} request failed: {message}")]
    Transport {
        /// Operation that failed
        operation: RemoteOperation,
        /// Underlying transport error text
        message: String,
    },

    /// The service answered with a non-success status
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        /// Operation that failed
        operation: RemoteOperation,
        /// HTTP status code
        status: u16,
        /// Response body, if any
        body: String,
    },

    /// The response body was missing fields or had the wrong shape
    #[error("{operation} response was malformed: {reason}")]
    MalformedResponse {
        /// Operation that failed
        operation: RemoteOperation,
        /// What was wrong with the body
        reason: String,
    },
}

impl RemoteAnalysisError {
    /// Create a transport error
    pub fn transport(operation: RemoteOperation, message: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            message: message.into(),
        }
    }

    /// Create a malformed-response error
    pub fn malformed(operation: RemoteOperation, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            operation,
            reason: reason.into(),
        }
    }

    /// The operation that failed
    #[must_use]
    pub fn operation(&self) -> RemoteOperation {
        match self {
            Self::Transport { operation, .. }
            | Self::Status { operation, .. }
            | Self::MalformedResponse { operation, .. } => *operation,
        }
    }

    /// Whether the service responded but the body could not be understood
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse { .. })
    }
}

/// Result alias for remote calls
pub type RemoteResult<T> = Result<T, RemoteAnalysisError>;
