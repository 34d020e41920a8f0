//! TOML Configuration File Support
//!
//! Centralized configuration loading for the analysis client, supporting a
//! TOML file at `~/.config/megago/client.toml`.
//!
//! # Configuration Priority
//!
//! Values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [service]
//! base_url = "http://localhost:5000"
//! mode = "async"
//! request_timeout_ms = 120000
//!
//! [endpoints]
//! analyse = "/analyse"
//! progress = "/progress"
//! result = "/result"
//!
//! [polling]
//! interval_ms = 2000
//! max_consecutive_failures = 5
//!
//! [session]
//! duplicate_policy = "keep"
//! event_capacity = 64
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::BackendConfig;
use crate::session::{AnalysisMode, SessionConfig};
use crate::terms::DuplicatePolicy;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// Environment Variables
// =============================================================================

/// Service base URL
pub const ENV_BASE_URL: &str = "MEGAGO_BASE_URL";
/// `sync` or `async`
pub const ENV_MODE: &str = "MEGAGO_MODE";
/// Per-request timeout in milliseconds (0 disables)
pub const ENV_REQUEST_TIMEOUT_MS: &str = "MEGAGO_REQUEST_TIMEOUT_MS";
/// Polling interval in milliseconds
pub const ENV_POLL_INTERVAL_MS: &str = "MEGAGO_POLL_INTERVAL_MS";
/// Consecutive polling failures tolerated (0 = forever)
pub const ENV_POLL_MAX_FAILURES: &str = "MEGAGO_POLL_MAX_FAILURES";
/// `keep` or `remove`
pub const ENV_DEDUP: &str = "MEGAGO_DEDUP";

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Service section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceToml {
    /// Base URL of the analysis service
    pub base_url: Option<String>,

    /// `sync` or `async`
    pub mode: Option<String>,

    /// Per-request timeout in milliseconds (0 = no timeout)
    pub request_timeout_ms: Option<u64>,
}

/// Endpoint paths, relative to the base URL
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsToml {
    /// Synchronous analysis
    pub analyse: Option<String>,
    /// Asynchronous job submission
    pub submit: Option<String>,
    /// Job progress (job id is appended)
    pub progress: Option<String>,
    /// Job result (job id is appended)
    pub result: Option<String>,
    /// Term metadata lookup
    pub goterms: Option<String>,
}

/// Polling section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingToml {
    /// Delay between progress requests in milliseconds
    pub interval_ms: Option<u64>,

    /// Consecutive failed progress requests tolerated (0 = forever)
    pub max_consecutive_failures: Option<u32>,
}

/// Session section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionToml {
    /// `keep` or `remove`
    pub duplicate_policy: Option<String>,

    /// Buffered events per subscriber
    pub event_capacity: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Service section
    pub service: ServiceToml,

    /// Endpoint paths
    pub endpoints: EndpointsToml,

    /// Polling section
    pub polling: PollingToml,

    /// Session section
    pub session: SessionToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Centralized configuration for the analysis client
///
/// Use [`load_config`] to load configuration with proper priority handling.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Service connection settings
    pub backend: BackendConfig,

    /// Session behaviour
    pub session: SessionConfig,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            session: SessionConfig::default(),
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/megago/client.toml` or
/// `~/.config/megago/client.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("megago").join("client.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed or holds
/// an invalid value. A missing config file is not an error.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path, then the process environment
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read, parsed, or
/// validated.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Load configuration using `env` to look up environment variables
///
/// # Errors
///
/// Same as [`load_config_from_path`].
pub fn load_config_with_env<F>(path: Option<PathBuf>, env: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: ClientToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config)?;
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);

    Ok(config)
}

fn timeout_from_ms(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ClientConfig, toml: &ClientToml) -> Result<(), ConfigError> {
    // Service settings
    if let Some(ref url) = toml.service.base_url {
        config.backend.base_url = url.clone();
    }
    if let Some(ref mode) = toml.service.mode {
        config.session.mode = AnalysisMode::parse(mode).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "service.mode must be \"sync\" or \"async\", got {mode:?}"
            ))
        })?;
    }
    if let Some(ms) = toml.service.request_timeout_ms {
        config.backend.request_timeout = timeout_from_ms(ms);
    }

    // Endpoint paths
    let endpoints = &mut config.backend.endpoints;
    for (value, target) in [
        (&toml.endpoints.analyse, &mut endpoints.analyse),
        (&toml.endpoints.submit, &mut endpoints.submit),
        (&toml.endpoints.progress, &mut endpoints.progress),
        (&toml.endpoints.result, &mut endpoints.result),
        (&toml.endpoints.goterms, &mut endpoints.goterms),
    ] {
        if let Some(path) = value {
            *target = path.clone();
        }
    }

    // Polling settings
    if let Some(ms) = toml.polling.interval_ms {
        if ms == 0 {
            return Err(ConfigError::ValidationError(
                "polling.interval_ms must be greater than 0".to_string(),
            ));
        }
        config.session.poll.interval = Duration::from_millis(ms);
    }
    if let Some(max) = toml.polling.max_consecutive_failures {
        config.session.poll.max_consecutive_failures = max;
    }

    // Session settings
    if let Some(ref policy) = toml.session.duplicate_policy {
        config.session.duplicate_policy = DuplicatePolicy::parse(policy).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "session.duplicate_policy must be \"keep\" or \"remove\", got {policy:?}"
            ))
        })?;
    }
    if let Some(capacity) = toml.session.event_capacity {
        if capacity == 0 {
            return Err(ConfigError::ValidationError(
                "session.event_capacity must be at least 1".to_string(),
            ));
        }
        config.session.event_capacity = capacity;
    }

    Ok(())
}

/// Apply environment variable overrides to the config
///
/// Unparseable values are logged and ignored.
fn apply_env_config<F>(config: &mut ClientConfig, env: F)
where
    F: Fn(&str) -> Option<String>,
{
    fn ignored(key: &str, value: &str) {
        tracing::warn!(key, value, "Ignoring invalid environment override");
    }

    if let Some(url) = env(ENV_BASE_URL) {
        config.backend.base_url = url;
        config.source = ConfigSource::Env;
    }
    if let Some(mode) = env(ENV_MODE) {
        match AnalysisMode::parse(&mode) {
            Some(m) => {
                config.session.mode = m;
                config.source = ConfigSource::Env;
            }
            None => ignored(ENV_MODE, &mode),
        }
    }
    if let Some(timeout) = env(ENV_REQUEST_TIMEOUT_MS) {
        match timeout.parse::<u64>() {
            Ok(ms) => {
                config.backend.request_timeout = timeout_from_ms(ms);
                config.source = ConfigSource::Env;
            }
            Err(_) => ignored(ENV_REQUEST_TIMEOUT_MS, &timeout),
        }
    }
    if let Some(interval) = env(ENV_POLL_INTERVAL_MS) {
        match interval.parse::<u64>() {
            Ok(ms) if ms > 0 => {
                config.session.poll.interval = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            _ => ignored(ENV_POLL_INTERVAL_MS, &interval),
        }
    }
    if let Some(max) = env(ENV_POLL_MAX_FAILURES) {
        match max.parse::<u32>() {
            Ok(n) => {
                config.session.poll.max_consecutive_failures = n;
                config.source = ConfigSource::Env;
            }
            Err(_) => ignored(ENV_POLL_MAX_FAILURES, &max),
        }
    }
    if let Some(policy) = env(ENV_DEDUP) {
        match DuplicatePolicy::parse(&policy) {
            Some(p) => {
                config.session.duplicate_policy = p;
                config.source = ConfigSource::Env;
            }
            None => ignored(ENV_DEDUP, &policy),
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Base URL override
    pub base_url: Option<String>,

    /// Dispatch mode override
    pub mode: Option<AnalysisMode>,

    /// Request timeout override (milliseconds, 0 disables)
    pub request_timeout_ms: Option<u64>,

    /// Polling interval override (milliseconds)
    pub poll_interval_ms: Option<u64>,

    /// Duplicate handling override
    pub duplicate_policy: Option<DuplicatePolicy>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set base URL override
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set mode override
    #[must_use]
    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set request timeout override
    #[must_use]
    pub fn with_request_timeout_ms(mut self, ms: u64) -> Self {
        self.request_timeout_ms = Some(ms);
        self
    }

    /// Set polling interval override
    #[must_use]
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = Some(ms);
        self
    }

    /// Set duplicate policy override
    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = Some(policy);
        self
    }

    fn is_empty(&self) -> bool {
        self.base_url.is_none()
            && self.mode.is_none()
            && self.request_timeout_ms.is_none()
            && self.poll_interval_ms.is_none()
            && self.duplicate_policy.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ClientConfig) {
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref url) = self.base_url {
            config.backend.base_url = url.clone();
        }
        if let Some(mode) = self.mode {
            config.session.mode = mode;
        }
        if let Some(ms) = self.request_timeout_ms {
            config.backend.request_timeout = timeout_from_ms(ms);
        }
        if let Some(ms) = self.poll_interval_ms {
            config.session.poll.interval = Duration::from_millis(ms);
        }
        if let Some(policy) = self.duplicate_policy {
            config.session.duplicate_policy = policy;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
