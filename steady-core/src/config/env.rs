//! Environment variable interpolation for configuration

use super::error::ConfigError;
use super::schema::SteadyConfig;
use super::secrets::SecretString;
use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Interpolate `${VAR}` references in a configuration string
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    let mut missing = None;

    let result = ENV_VAR_PATTERN.replace_all(content, |cap: &regex::Captures<'_>| {
        match env::var(&cap[1]) {
            Ok(value) => value,
            Err(_) => {
                if missing.is_none() {
                    missing = Some(cap[1].to_string());
                }
                String::new()
            }
        }
    });

    if let Some(var) = missing {
        return Err(ConfigError::MissingEnvVar { var });
    }

    Ok(result.into_owned())
}

/// Interpolate environment variables left in endpoint fields after parsing
///
/// Covers configs built in code rather than loaded from a file.
pub fn interpolate_config_env_vars(config: &mut SteadyConfig) -> Result<(), ConfigError> {
    for endpoint in &mut config.endpoints {
        let api_key = endpoint.api_key.expose_secret();
        if ENV_VAR_PATTERN.is_match(api_key) {
            endpoint.api_key = SecretString::new(interpolate_env_vars(api_key)?);
        }

        if ENV_VAR_PATTERN.is_match(&endpoint.base_url) {
            endpoint.base_url = interpolate_env_vars(&endpoint.base_url)?;
        }
    }

    Ok(())
}
