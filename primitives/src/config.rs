use std::{fs, path::Path, time::Duration};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use toml::de::Error as TomlError;

pub static DEVELOPMENT_CONFIG: Lazy<Config> = Lazy::new(|| {
    Config::try_toml(include_str!("../../docs/config/dev.toml"))
        .expect("Failed to parse dev.toml config file")
});

pub static PRODUCTION_CONFIG: Lazy<Config> = Lazy::new(|| {
    Config::try_toml(include_str!("../../docs/config/prod.toml"))
        .expect("Failed to parse prod.toml config file")
});

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "camelCase")]
/// The environment in which the application is running
/// Defaults to [`Environment::Development`]
pub enum Environment {
    Development,
    Production,
}

impl Default for Environment {
    fn default() -> Self {
        Self::Development
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Requests taking longer than this are aborted with `408 Request Timeout`.
    /// In milliseconds
    #[serde(with = "serde_millis")]
    pub request_timeout: Duration,
    pub rate_limit: RateLimit,
}

/// Per-client token bucket settings.
///
/// Zero values are replaced by the rate limiter's defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    /// Tokens refilled per second, also reported in `X-RateLimit-Limit`.
    #[serde(default)]
    pub requests_per_second: u32,
    /// The capacity of the bucket.
    #[serde(default)]
    pub burst_size: u32,
    /// How often idle buckets are reclaimed, also the idle threshold.
    /// In milliseconds
    #[serde(default, with = "serde_millis")]
    pub cleanup_interval: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Reading the config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parsing the config file: {0}")]
    Toml(#[from] TomlError),
}

impl Config {
    /// Utility method that will deserialize a Toml file content into a [`Config`].
    ///
    /// Instead of relying on the `toml` crate directly, use this method instead.
    pub fn try_toml(toml: &str) -> Result<Self, TomlError> {
        toml::from_str(toml)
    }
}

/// Reads the [`Config`] from `config_file` if one is given,
/// otherwise uses the built-in one for the `environment`.
pub fn configuration(
    environment: Environment,
    config_file: Option<&Path>,
) -> Result<Config, ConfigError> {
    match config_file {
        Some(path) => Ok(Config::try_toml(&fs::read_to_string(path)?)?),
        None => match environment {
            Environment::Development => Ok(DEVELOPMENT_CONFIG.clone()),
            Environment::Production => Ok(PRODUCTION_CONFIG.clone()),
        },
    }
}
