//! Analysis Service Integration
//!
//! This module provides abstracted access to the remote analysis service
//! through a common trait interface.
//!
//! # Available Backends
//!
//! - **HTTP**: JSON over HTTP (default)
//!
//! # Usage
//!
//! ```ignore
//! use megago_core::backend::{AnalysisBackend, BackendConfig, HttpAnalysisBackend};
//!
//! let backend = HttpAnalysisBackend::new(BackendConfig::with_base_url("http://localhost:5000"))?;
//! let job = backend.submit_async(&list1, &list2).await?;
//! let progress = backend.poll_progress(&job).await?;
//! ```

mod http;
mod traits;
pub mod wire;

pub use http::HttpAnalysisBackend;
pub use traits::{AnalysisBackend, BackendConfig, Endpoints, JobId, Progress, TermRecord};
