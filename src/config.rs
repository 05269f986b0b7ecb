use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Priority;
use crate::recurrence::ExpansionLimits;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// User configuration loaded from `config.toml`.
///
/// Every field has a default, so a partial file (or no file) is fine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub recurrence: RecurrenceConfig,
    #[serde(default)]
    pub default_priority: Priority,
}

/// Ceilings applied by the recurrence expander.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceConfig {
    /// Hard cap on instances per expansion, whatever the end condition.
    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: usize,
    /// Cap for recurrences that never end.
    #[serde(default = "default_open_ended_occurrences")]
    pub open_ended_occurrences: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recurrence: RecurrenceConfig::default(),
            default_priority: Priority::default(),
        }
    }
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            max_occurrences: default_max_occurrences(),
            open_ended_occurrences: default_open_ended_occurrences(),
        }
    }
}

fn default_max_occurrences() -> usize {
    ExpansionLimits::DEFAULT_MAX_OCCURRENCES
}

fn default_open_ended_occurrences() -> usize {
    ExpansionLimits::DEFAULT_OPEN_ENDED_OCCURRENCES
}

impl Config {
    /// Returns the path to `config.toml`.
    ///
    /// `TIDELINE_CONFIG` wins; otherwise `<config_dir>/tideline/config.toml`.
    pub fn path() -> PathBuf {
        std::env::var("TIDELINE_CONFIG").map(PathBuf::from).unwrap_or_else(|_| {
            let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
            p.push("tideline");
            p.push("config.toml");
            p
        })
    }

    /// Loads the configuration, falling back to defaults when the file is missing.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::ReadError {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.recurrence.max_occurrences == 0 {
            return Err(ConfigError::Invalid(
                "recurrence.max_occurrences must be at least 1".into(),
            ));
        }
        if self.recurrence.open_ended_occurrences == 0 {
            return Err(ConfigError::Invalid(
                "recurrence.open_ended_occurrences must be at least 1".into(),
            ));
        }
        let limit = ExpansionLimits::CEILING_LIMIT;
        if self.recurrence.max_occurrences > limit {
            return Err(ConfigError::Invalid(format!(
                "recurrence.max_occurrences must be at most {}",
                limit
            )));
        }
        if self.recurrence.open_ended_occurrences > limit {
            return Err(ConfigError::Invalid(format!(
                "recurrence.open_ended_occurrences must be at most {}",
                limit
            )));
        }
        Ok(())
    }

    /// Limits handed to the recurrence expander.
    pub fn expansion_limits(&self) -> ExpansionLimits {
        ExpansionLimits {
            max_occurrences: self.recurrence.max_occurrences,
            open_ended_occurrences: self.recurrence.open_ended_occurrences,
        }
    }
}
