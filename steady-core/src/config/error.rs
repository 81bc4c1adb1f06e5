//! Errors raised while loading or checking a configuration

use super::schema::SCHEMA_VERSION;
use thiserror::Error;

/// Failure to turn a config file into a usable [`super::SteadyConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Syntax error in '{path}' (line {}, column {}): {message}",
            .line.unwrap_or(0), .column.unwrap_or(0))]
    Syntax {
        path: String,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    #[error("Invalid config: {0}")]
    Invalid(#[from] ValidationError),

    #[error("Config references unset environment variable '{var}'")]
    MissingEnvVar { var: String },
}

/// A rule broken by one field, e.g. `resilience.fast.jitter_factor`
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {violation}")]
pub struct ValidationError {
    pub field: String,
    pub violation: Violation,
}

/// What is wrong with the field
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Violation {
    #[error("required value is missing")]
    Missing,

    #[error("at least one endpoint must be configured")]
    NoEndpoints,

    #[error("schema version '{found}' is not supported (expected '{}')", SCHEMA_VERSION)]
    UnsupportedVersion { found: String },

    #[error("not a usable http(s) URL: {reason}")]
    BadUrl { reason: String },

    #[error("{reason}")]
    OutOfRange { reason: &'static str },

    #[error("model '{model}' is listed twice")]
    DuplicateModel { model: String },

    #[error("'{base_url}' is configured twice for the same family")]
    DuplicateEndpoint { base_url: String },

    #[error("family '{family}' has no enabled endpoint")]
    NoEnabledEndpoint { family: String },

    #[error("max_delay_ms ({max_delay_ms}) is below initial_delay_ms ({initial_delay_ms})")]
    CeilingBelowInitialDelay {
        initial_delay_ms: u64,
        max_delay_ms: u64,
    },

    /// `exponential_base * (1 - jitter_factor) < 1`
    #[error(
        "exponential_base {exponential_base} with jitter_factor {jitter_factor} lets backoff shrink between retries"
    )]
    ShrinkingBackoff {
        exponential_base: f64,
        jitter_factor: f64,
    },

    #[error("a {max_elapsed_ms}ms window leaves no room for the first {initial_delay_ms}ms backoff")]
    WindowTooShort {
        initial_delay_ms: u64,
        max_elapsed_ms: u64,
    },

    #[error("max_total_ms ({max_total_ms}) is shorter than one {delay_ms}ms sleep")]
    TotalBelowSleepDelay { delay_ms: u64, max_total_ms: u64 },
}

impl ValidationError {
    pub fn new(field: impl Into<String>, violation: Violation) -> Self {
        Self {
            field: field.into(),
            violation,
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, Violation::Missing)
    }

    pub fn out_of_range(field: impl Into<String>, reason: &'static str) -> Self {
        Self::new(field, Violation::OutOfRange { reason })
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
