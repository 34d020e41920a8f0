//! GO Term Sets
//!
//! The two user-supplied lists of ontology term identifiers that an analysis
//! compares. A term set is always replaced wholesale; order is kept for
//! display even though the remote computation does not depend on it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Which of the two input lists a command targets
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TermSlot {
    /// "List 1", sent as `sample1`
    First,
    /// "List 2", sent as `sample2`
    Second,
}

impl TermSlot {
    /// Map the user-facing list number (1 or 2) to a slot
    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Self::First),
            2 => Some(Self::Second),
            _ => None,
        }
    }

    /// User-facing list number
    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl std::fmt::Display for TermSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "list {}", self.index())
    }
}

/// What happens to repeated identifiers when a term set is assigned
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Store the sequence exactly as given
    #[default]
    Keep,
    /// Keep the first occurrence of each identifier, drop later repeats
    Remove,
}

impl DuplicatePolicy {
    /// Parse a policy name (`keep` / `remove`, plus boolean spellings)
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "keep" | "0" | "false" | "no" => Some(Self::Keep),
            "remove" | "dedup" | "1" | "true" | "yes" => Some(Self::Remove),
            _ => None,
        }
    }
}

/// An ordered sequence of term identifiers occupying one slot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSet {
    terms: Vec<String>,
}

impl TermSet {
    /// Create an empty term set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole contents, applying `policy`
    pub fn replace<I, S>(&mut self, terms: I, policy: DuplicatePolicy)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terms.clear();
        match policy {
            DuplicatePolicy::Keep => self.terms.extend(terms.into_iter().map(Into::into)),
            DuplicatePolicy::Remove => {
                let mut seen = HashSet::new();
                for term in terms {
                    let term = term.into();
                    if seen.insert(term.clone()) {
                        self.terms.push(term);
                    }
                }
            }
        }
    }

    /// The identifiers in insertion order
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.terms
    }

    /// Number of identifiers
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the set holds no identifiers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Whether `s` looks like a GO identifier (`GO:` and seven digits, any case)
#[must_use]
pub fn is_go_term(s: &str) -> bool {
    let Some((prefix, digits)) = s.split_once(':') else {
        return false;
    };
    prefix.eq_ignore_ascii_case("go")
        && digits.len() == 7
        && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Split free text into normalised term identifiers
///
/// Separators are `;`, `,` and whitespace. Entries are trimmed and
/// upper-cased; empty entries are dropped. Order is preserved.
#[must_use]
pub fn parse_term_list(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase)
        .collect()
}
