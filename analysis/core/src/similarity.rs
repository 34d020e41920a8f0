//! Similarity Results
//!
//! The three per-namespace scores produced by the remote service and the set
//! of submitted terms it could not resolve. A score of NaN means "not yet
//! computed / undefined".

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Similarity of the two term sets along each GO namespace
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimilarityScores {
    /// Biological process score
    pub biological_process: f64,
    /// Cellular component score
    pub cellular_component: f64,
    /// Molecular function score
    pub molecular_function: f64,
}

impl Default for SimilarityScores {
    fn default() -> Self {
        Self::undefined()
    }
}

impl SimilarityScores {
    /// Scores with all three fields set
    #[must_use]
    pub fn new(biological_process: f64, cellular_component: f64, molecular_function: f64) -> Self {
        Self {
            biological_process,
            cellular_component,
            molecular_function,
        }
    }

    /// All three scores NaN
    #[must_use]
    pub fn undefined() -> Self {
        Self::new(f64::NAN, f64::NAN, f64::NAN)
    }

    /// Whether no score has been computed
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        self.as_array().iter().all(|s| s.is_nan())
    }

    /// Scores in namespace order (BP, CC, MF)
    #[must_use]
    pub fn as_array(&self) -> [f64; 3] {
        [
            self.biological_process,
            self.cellular_component,
            self.molecular_function,
        ]
    }
}

/// NaN compares equal to NaN here; a result is a value, not a measurement.
impl PartialEq for SimilarityScores {
    fn eq(&self, other: &Self) -> bool {
        self.as_array()
            .iter()
            .zip(other.as_array().iter())
            .all(|(a, b)| a == b || (a.is_nan() && b.is_nan()))
    }
}

/// A completed analysis: scores plus the terms excluded from them
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Per-namespace similarity
    pub similarity: SimilarityScores,
    /// Submitted identifiers the service could not resolve
    pub invalid_terms: BTreeSet<String>,
}

impl AnalysisOutcome {
    /// Build an outcome from scores and an iterator of invalid terms
    pub fn new<I, S>(similarity: SimilarityScores, invalid_terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            similarity,
            invalid_terms: invalid_terms.into_iter().map(Into::into).collect(),
        }
    }
}
