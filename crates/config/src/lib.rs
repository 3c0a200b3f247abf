#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for kratos
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/kratos/config.toml)
//! - Environment variables
//! - CLI flags (applied by the caller)

use kratos_errors::{ConfigError, Error};
use kratos_hash::HashAlgorithm;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub verify: VerifyConfig,
}

/// HTTP client configuration
///
/// The download engine enforces no timeout of its own; these bound each
/// request from the outside when set.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct NetworkConfig {
    #[serde(default)]
    pub timeout: Option<u64>, // seconds
    #[serde(default)]
    pub connect_timeout: Option<u64>, // seconds
    #[serde(default)]
    pub user_agent: Option<String>,
}

/// Hash verification configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyConfig {
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_algorithm() -> String {
    HashAlgorithm::default().as_str().to_string()
}

fn default_max_attempts() -> u32 {
    3
}

impl NetworkConfig {
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout.map(Duration::from_secs)
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("kratos").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        tracing::debug!(path = %path.display(), "loaded configuration file");

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_env_from(|key| std::env::var(key).ok())
    }

    /// Merge values produced by `lookup` for each `KRATOS_*` variable
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be parsed into the expected type.
    pub fn merge_env_from<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        // KRATOS_HASH_ALGORITHM
        if let Some(algorithm) = lookup("KRATOS_HASH_ALGORITHM") {
            self.verify.algorithm = algorithm;
        }

        // KRATOS_MAX_ATTEMPTS
        if let Some(attempts) = lookup("KRATOS_MAX_ATTEMPTS") {
            self.verify.max_attempts = parse_value("KRATOS_MAX_ATTEMPTS", attempts)?;
        }

        // KRATOS_TIMEOUT
        if let Some(timeout) = lookup("KRATOS_TIMEOUT") {
            self.network.timeout = Some(parse_value("KRATOS_TIMEOUT", timeout)?);
        }

        // KRATOS_CONNECT_TIMEOUT
        if let Some(timeout) = lookup("KRATOS_CONNECT_TIMEOUT") {
            self.network.connect_timeout = Some(parse_value("KRATOS_CONNECT_TIMEOUT", timeout)?);
        }

        // KRATOS_USER_AGENT
        if let Some(agent) = lookup("KRATOS_USER_AGENT") {
            self.network.user_agent = Some(agent);
        }

        Ok(())
    }

    /// Check values that serde cannot reject on its own
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown hash algorithm or a zero attempt budget.
    pub fn validate(&self) -> Result<(), Error> {
        if HashAlgorithm::from_name(&self.verify.algorithm).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "verify.algorithm".to_string(),
                value: self.verify.algorithm.clone(),
            }
            .into());
        }

        if self.verify.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "verify.max_attempts".to_string(),
                value: "0".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// The configured algorithm, parsed
    ///
    /// # Errors
    ///
    /// Returns an error if the algorithm name is not supported.
    pub fn hash_algorithm(&self) -> Result<HashAlgorithm, Error> {
        HashAlgorithm::from_name(&self.verify.algorithm)
    }
}

fn parse_value<T: std::str::FromStr>(field: &str, value: String) -> Result<T, Error> {
    value.parse().map_err(|_| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            value,
        }
        .into()
    })
}
