//! Configuration schema structures with serde support

use super::error::{ValidationError, Violation};
use super::secrets::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Only supported schema version
pub const SCHEMA_VERSION: &str = "0.1";

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SteadyConfig {
    /// Schema version (required - no default)
    pub version: String,

    /// Endpoints the allocator hands out
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    /// Client behaviour
    #[serde(default)]
    pub client: ClientOptions,

    /// Connection settings for the HTTP session
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Retry tiers
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

/// One completion endpoint serving a model family
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// Model family this endpoint serves (e.g. "GPT")
    pub family: String,

    /// Base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// API key (supports environment variable interpolation)
    pub api_key: SecretString,

    /// Model identifiers available on this endpoint
    pub models: Vec<String>,

    /// Whether the allocator may hand out this endpoint
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// Per-client behaviour
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientOptions {
    /// Request incremental (SSE) responses
    #[serde(default)]
    pub stream: bool,

    /// Keep prompts and replies as context for later asks
    #[serde(default)]
    pub memorize: bool,

    /// Optional system prompt placed before every conversation
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Temperature used by `ask_default`
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            stream: false,
            memorize: false,
            system_prompt: None,
            default_temperature: default_temperature(),
        }
    }
}

/// Connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionConfig {
    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,

    /// Request timeout in milliseconds, covering the whole streamed body
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Maximum idle connections per host
    #[serde(default = "default_max_idle")]
    pub max_idle_per_host: usize,

    /// Keep-alive timeout in seconds
    #[serde(default = "default_keepalive")]
    pub keepalive_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout(),
            request_timeout_ms: default_request_timeout(),
            max_idle_per_host: default_max_idle(),
            keepalive_secs: default_keepalive(),
        }
    }
}

/// Both retry tiers
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResilienceConfig {
    #[serde(default)]
    pub fast: FastRetryConfig,

    #[serde(default)]
    pub sleep: SleepRetryConfig,
}

/// Bounded exponential backoff tier
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FastRetryConfig {
    /// Attempts per window, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wall-clock budget per window in milliseconds
    #[serde(default = "default_max_elapsed")]
    pub max_elapsed_ms: u64,

    /// Delay ceiling before the first retry in milliseconds
    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single backoff in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    /// Base for exponential growth (2.0 doubles)
    #[serde(default = "default_exponential_base")]
    pub exponential_base: f64,

    /// Fraction of the delay removed at random (0.0 to 0.5)
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,

    /// Honour server-provided Retry-After hints, capped at `max_delay_ms`
    #[serde(default = "default_true")]
    pub respect_retry_after: bool,
}

impl Default for FastRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_elapsed_ms: default_max_elapsed(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            exponential_base: default_exponential_base(),
            jitter_factor: default_jitter_factor(),
            respect_retry_after: true,
        }
    }
}

/// Unbounded periodic retry tier
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SleepRetryConfig {
    /// Fixed wait before each sleep-mode attempt in milliseconds
    #[serde(default = "default_sleep_delay")]
    pub delay_ms: u64,

    /// Run a whole fast-retry window per sleep-mode attempt
    #[serde(default = "default_true")]
    pub nested_fast_retry: bool,

    /// Give up once this much time has passed since the first attempt.
    /// Unset means retry forever.
    #[serde(default)]
    pub max_total_ms: Option<u64>,
}

impl Default for SleepRetryConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_sleep_delay(),
            nested_fast_retry: true,
            max_total_ms: None,
        }
    }
}

impl FastRetryConfig {
    pub fn max_elapsed(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_ms)
    }
}

impl SleepRetryConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn max_total(&self) -> Option<Duration> {
        self.max_total_ms.map(Duration::from_millis)
    }
}

// Default value functions for serde
fn default_true() -> bool { true }
fn default_temperature() -> f32 { 1.0 }
fn default_connect_timeout() -> u64 { 10_000 }
fn default_request_timeout() -> u64 { 600_000 }
fn default_max_idle() -> usize { 10 }
fn default_keepalive() -> u64 { 90 }
fn default_max_attempts() -> u32 { 5 }
fn default_max_elapsed() -> u64 { 500_000 }
fn default_initial_delay() -> u64 { 1_000 }
fn default_max_delay() -> u64 { 60_000 }
fn default_exponential_base() -> f64 { 2.0 }
fn default_jitter_factor() -> f64 { 0.5 }
fn default_sleep_delay() -> u64 { 300_000 }

impl SteadyConfig {
    /// Configuration with defaults and no endpoints
    pub fn new() -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            endpoints: Vec::new(),
            client: ClientOptions::default(),
            connection: ConnectionConfig::default(),
            resilience: ResilienceConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.version.is_empty() {
            return Err(ValidationError::missing("version"));
        }

        if self.version != SCHEMA_VERSION {
            return Err(ValidationError::new(
                "version",
                Violation::UnsupportedVersion {
                    found: self.version.clone(),
                },
            ));
        }

        if self.endpoints.is_empty() {
            return Err(ValidationError::new("endpoints", Violation::NoEndpoints));
        }

        for (i, endpoint) in self.endpoints.iter().enumerate() {
            endpoint.validate(&format!("endpoints[{}]", i))?;
        }

        self.client.validate("client")?;
        self.connection.validate("connection")?;
        self.resilience.fast.validate("resilience.fast")?;
        self.resilience.sleep.validate("resilience.sleep")?;

        Ok(())
    }
}

impl Default for SteadyConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointConfig {
    /// Validate endpoint configuration
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.family.is_empty() {
            return Err(ValidationError::missing(format!("{}.family", path)));
        }

        if self.api_key.is_empty() {
            return Err(ValidationError::missing(format!("{}.api_key", path)));
        }

        if self.base_url.is_empty() {
            return Err(ValidationError::missing(format!("{}.base_url", path)));
        }

        match url::Url::parse(&self.base_url) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    return Err(ValidationError::new(
                        format!("{}.base_url", path),
                        Violation::BadUrl {
                            reason: format!("scheme '{}'", url.scheme()),
                        },
                    ));
                }
            }
            Err(e) => {
                return Err(ValidationError::new(
                    format!("{}.base_url", path),
                    Violation::BadUrl {
                        reason: e.to_string(),
                    },
                ));
            }
        }

        if self.models.is_empty() {
            return Err(ValidationError::missing(format!("{}.models", path)));
        }

        let mut seen = std::collections::HashSet::new();
        for (i, model) in self.models.iter().enumerate() {
            if model.is_empty() {
                return Err(ValidationError::missing(format!("{}.models[{}]", path, i)));
            }
            if !seen.insert(model) {
                return Err(ValidationError::new(
                    format!("{}.models[{}]", path, i),
                    Violation::DuplicateModel {
                        model: model.clone(),
                    },
                ));
            }
        }

        Ok(())
    }
}

impl ClientOptions {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        // The endpoint owns the accepted range; only reject values no provider takes.
        if !self.default_temperature.is_finite() || self.default_temperature < 0.0 {
            return Err(ValidationError::out_of_range(
                format!("{}.default_temperature", path),
                "must be a non-negative number",
            ));
        }

        Ok(())
    }
}

impl ConnectionConfig {
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.connect_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.connect_timeout_ms", path),
                "must be greater than 0",
            ));
        }

        if self.request_timeout_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.request_timeout_ms", path),
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl FastRetryConfig {
    /// Validate the fast retry tier
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.max_attempts", path),
                "must be at least 1",
            ));
        }

        if self.initial_delay_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.initial_delay_ms", path),
                "must be greater than 0",
            ));
        }

        if self.max_delay_ms < self.initial_delay_ms {
            return Err(ValidationError::new(
                format!("{}.max_delay_ms", path),
                Violation::CeilingBelowInitialDelay {
                    initial_delay_ms: self.initial_delay_ms,
                    max_delay_ms: self.max_delay_ms,
                },
            ));
        }

        if self.exponential_base < 1.0 {
            return Err(ValidationError::out_of_range(
                format!("{}.exponential_base", path),
                "must be at least 1.0",
            ));
        }

        if !(0.0..=0.5).contains(&self.jitter_factor) {
            return Err(ValidationError::out_of_range(
                format!("{}.jitter_factor", path),
                "must be between 0.0 and 0.5",
            ));
        }

        if self.exponential_base * (1.0 - self.jitter_factor) < 1.0 {
            return Err(ValidationError::new(
                format!("{}.jitter_factor", path),
                Violation::ShrinkingBackoff {
                    exponential_base: self.exponential_base,
                    jitter_factor: self.jitter_factor,
                },
            ));
        }

        Ok(())
    }
}

impl SleepRetryConfig {
    /// Validate the sleep retry tier
    pub fn validate(&self, path: &str) -> Result<(), ValidationError> {
        if self.delay_ms == 0 {
            return Err(ValidationError::out_of_range(
                format!("{}.delay_ms", path),
                "must be greater than 0",
            ));
        }

        if let Some(max_total) = self.max_total_ms {
            if max_total < self.delay_ms {
                return Err(ValidationError::new(
                    format!("{}.max_total_ms", path),
                    Violation::TotalBelowSleepDelay {
                        delay_ms: self.delay_ms,
                        max_total_ms: max_total,
                    },
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> EndpointConfig {
        EndpointConfig {
            family: "GPT".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: SecretString::new("sk-test"),
            models: vec!["gpt-4o".to_string()],
            enabled: true,
        }
    }

    #[test]
    fn test_defaults_match_retry_tiers() {
        let resilience = ResilienceConfig::default();
        assert_eq!(resilience.fast.max_attempts, 5);
        assert_eq!(resilience.fast.max_elapsed(), Duration::from_secs(500));
        assert_eq!(resilience.fast.max_delay_ms, 60_000);
        assert_eq!(resilience.sleep.delay(), Duration::from_secs(300));
        assert!(resilience.sleep.nested_fast_retry);
        assert_eq!(resilience.sleep.max_total(), None);
    }

    #[test]
    fn test_valid_config() {
        let mut config = SteadyConfig::new();
        config.endpoints.push(endpoint());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_requires_endpoint() {
        let err = SteadyConfig::new().validate().unwrap_err();
        assert_eq!(err.field, "endpoints");
        assert_eq!(err.violation, Violation::NoEndpoints);
    }

    #[test]
    fn test_rejects_non_http_url() {
        let mut config = SteadyConfig::new();
        let mut bad = endpoint();
        bad.base_url = "ftp://example.com".to_string();
        config.endpoints.push(bad);

        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "endpoints[0].base_url");
        assert!(matches!(err.violation, Violation::BadUrl { .. }));
    }

    #[test]
    fn test_rejects_duplicate_models() {
        let mut config = SteadyConfig::new();
        let mut dup = endpoint();
        dup.models.push("gpt-4o".to_string());
        config.endpoints.push(dup);

        let err = config.validate().unwrap_err();
        assert_eq!(err.field, "endpoints[0].models[1]");
    }

    #[test]
    fn test_rejects_large_jitter() {
        let fast = FastRetryConfig {
            jitter_factor: 0.9,
            ..Default::default()
        };
        let err = fast.validate("resilience.fast").unwrap_err();
        assert_eq!(err.field, "resilience.fast.jitter_factor");
    }

    #[test]
    fn test_sleep_cap_must_cover_one_delay() {
        let sleep = SleepRetryConfig {
            delay_ms: 1_000,
            max_total_ms: Some(500),
            ..Default::default()
        };
        let err = sleep.validate("resilience.sleep").unwrap_err();
        assert_eq!(
            err.violation,
            Violation::TotalBelowSleepDelay {
                delay_ms: 1_000,
                max_total_ms: 500
            }
        );
    }
}
