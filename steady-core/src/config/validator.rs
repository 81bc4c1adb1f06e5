//! Cross-field configuration validation

use super::error::{ValidationError, Violation};
use super::schema::SteadyConfig;
use std::collections::{HashMap, HashSet};

/// Configuration validator with rules spanning several sections
#[derive(Debug, Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Create a new validator
    pub fn new() -> Self {
        Self
    }

    /// Validate a configuration with extended rules
    pub fn validate(&self, config: &SteadyConfig) -> Result<(), ValidationError> {
        // Field-level validation first
        config.validate()?;

        self.validate_families(config)?;
        self.validate_window_budget(config)?;

        Ok(())
    }

    /// Every configured family needs at least one enabled endpoint, and an
    /// endpoint URL may only appear once per family
    fn validate_families(&self, config: &SteadyConfig) -> Result<(), ValidationError> {
        let mut enabled: HashMap<&str, usize> = HashMap::new();
        let mut urls: HashSet<(&str, &str)> = HashSet::new();

        for (i, endpoint) in config.endpoints.iter().enumerate() {
            let count = enabled.entry(endpoint.family.as_str()).or_insert(0);
            if endpoint.enabled {
                *count += 1;
            }

            let base_url = endpoint.base_url.trim_end_matches('/');
            if !urls.insert((endpoint.family.as_str(), base_url)) {
                return Err(ValidationError::new(
                    format!("endpoints[{}].base_url", i),
                    Violation::DuplicateEndpoint {
                        base_url: endpoint.base_url.clone(),
                    },
                ));
            }
        }

        let mut families: Vec<_> = enabled.into_iter().collect();
        families.sort();
        for (family, count) in families {
            if count == 0 {
                return Err(ValidationError::new(
                    "endpoints",
                    Violation::NoEnabledEndpoint {
                        family: family.to_string(),
                    },
                ));
            }
        }

        Ok(())
    }

    /// The first backoff must fit in the fast window's wall-clock budget
    fn validate_window_budget(&self, config: &SteadyConfig) -> Result<(), ValidationError> {
        let fast = &config.resilience.fast;
        if fast.max_attempts > 1 && fast.initial_delay_ms >= fast.max_elapsed_ms {
            return Err(ValidationError::new(
                "resilience.fast.max_elapsed_ms",
                Violation::WindowTooShort {
                    initial_delay_ms: fast.initial_delay_ms,
                    max_elapsed_ms: fast.max_elapsed_ms,
                },
            ));
        }

        Ok(())
    }
}
