//! Configuration module
//!
//! Loads the endpoint list, client options and retry tiers from YAML or JSON
//! files, with `${VAR}` environment interpolation and validation.

mod env;
mod error;
mod schema;
mod secrets;
mod validator;

pub use error::{ConfigError, ConfigResult, ValidationError, Violation};
pub use schema::{
    ClientOptions, ConnectionConfig, EndpointConfig, FastRetryConfig, ResilienceConfig,
    SleepRetryConfig, SteadyConfig, SCHEMA_VERSION,
};
pub use secrets::SecretString;
pub use validator::ConfigValidator;

use std::fs;
use std::path::Path;

/// Load a configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> ConfigResult<SteadyConfig> {
    let path = path.as_ref();
    let content = read(path)?;

    let interpolated = env::interpolate_env_vars(&content)?;

    let config: SteadyConfig =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Syntax {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

/// Load a configuration from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> ConfigResult<SteadyConfig> {
    let path = path.as_ref();
    let content = read(path)?;

    let interpolated = env::interpolate_env_vars(&content)?;

    let config: SteadyConfig =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::Syntax {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    finish(config)
}

/// Load a configuration, picking the format from the file extension
pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<SteadyConfig> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => load_from_json(path),
        _ => load_from_yaml(path),
    }
}

/// Interpolate and validate a configuration built in code
pub fn prepare(config: SteadyConfig) -> ConfigResult<SteadyConfig> {
    finish(config)
}

fn read(path: &Path) -> ConfigResult<String> {
    fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_string_lossy().to_string(),
        source: e,
    })
}

fn finish(mut config: SteadyConfig) -> ConfigResult<SteadyConfig> {
    env::interpolate_config_env_vars(&mut config)?;

    ConfigValidator::new().validate(&config)?;
    Ok(config)
}
