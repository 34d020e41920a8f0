//! MEGAGO Core - Client-Side GO Term Set Similarity Analysis
//!
//! This crate holds the client state for comparing two sets of Gene
//! Ontology term identifiers with a remote analysis service. It owns the
//! term sets, dispatches analyses, tracks asynchronous jobs, and keeps the
//! last applied result. It has no UI dependencies; a CLI, TUI, or web front
//! end reads its projections and subscribes to its events.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                        Front Ends                              │
//! │        ┌─────────┐      ┌─────────┐      ┌──────────────┐      │
//! │        │   CLI   │      │   TUI   │      │   Headless   │      │
//! │        └────┬────┘      └────┬────┘      └──────┬───────┘      │
//! │             └────────────────┴──────────────────┘              │
//! │              commands ↓           ↑ projections / SessionEvent │
//! └─────────────────────────────┼─────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────┼─────────────────────────────────┐
//! │                       MEGAGO CORE                              │
//! │  ┌──────────────────────────┴──────────────────────────────┐   │
//! │  │                    AnalysisSession                       │   │
//! │  │  ┌──────────┐  ┌────────────┐  ┌─────────────────────┐  │   │
//! │  │  │ TermSets │  │  Result +  │  │ PollingCoordinator  │  │   │
//! │  │  │  (1, 2)  │  │  Invalid   │  │  (current job only) │  │   │
//! │  │  └──────────┘  └────────────┘  └──────────┬──────────┘  │   │
//! │  └───────────────────────────────────────────┼─────────────┘   │
//! │                                  AnalysisBackend (HTTP)        │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`AnalysisSession`]: The state container and its commands
//! - [`AnalysisBackend`]: The remote service abstraction
//! - [`HttpAnalysisBackend`]: JSON-over-HTTP implementation
//! - [`SimilarityScores`]: Per-namespace similarity result
//! - [`SessionEvent`]: Notifications for observers
//!
//! # Quick Start
//!
//! ```ignore
//! use megago_core::{
//!     load_config, AnalysisSession, HttpAnalysisBackend, TermSlot,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let backend = HttpAnalysisBackend::new(config.backend)?;
//!     let session = AnalysisSession::new(backend, config.session);
//!
//!     session.set_term_set(TermSlot::First, ["GO:0008150", "GO:0009987"]);
//!     session.set_term_set(TermSlot::Second, ["GO:0005575"]);
//!     session.analyse().await?;
//!
//!     println!("{:?}", session.similarity());
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`backend`]: Analysis service abstraction and HTTP implementation
//! - [`config`]: TOML, environment, and CLI configuration
//! - [`error`]: Remote call failures
//! - [`events`]: Session change notifications
//! - [`polling`]: Progress loop for asynchronous jobs
//! - [`session`]: The analysis session
//! - [`similarity`]: Result types
//! - [`terms`]: Term sets and identifier parsing

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod polling;
pub mod session;
pub mod similarity;
pub mod terms;

#[cfg(test)]
pub mod test_utils;

// Re-exports for convenience
pub use backend::{
    AnalysisBackend, BackendConfig, Endpoints, HttpAnalysisBackend, JobId, Progress, TermRecord,
};
pub use error::{RemoteAnalysisError, RemoteOperation, RemoteResult};
pub use events::SessionEvent;
pub use polling::{PollConfig, PollHandle, PollUpdate, PollingCoordinator};
pub use session::{
    AnalysisMode, AnalysisPhase, AnalysisSession, Completion, SessionConfig, SessionSnapshot,
};
pub use similarity::{AnalysisOutcome, SimilarityScores};
pub use terms::{is_go_term, parse_term_list, DuplicatePolicy, TermSet, TermSlot};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, load_config_with_env, ClientConfig,
    ClientToml, ConfigError, ConfigOverrides, ConfigSource,
};
