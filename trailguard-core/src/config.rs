//! Serializable monitor configuration, loaded from TOML.
//!
//! ```toml
//! [[models]]
//! type = "trailing_stop"
//! maximum_drawdown_fraction = 0.05
//! on_malformed = "trust"
//!
//! [session]
//! stop_on_executor_error = false
//! ```
//!
//! With no `[[models]]` table a single 5% trailing stop is used. More than
//! one model is combined into a composite.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::monitor::DEFAULT_MAXIMUM_DRAWDOWN_FRACTION;
use crate::validation::MalformedTickPolicy;

/// Errors from loading or validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("model #{index}: maximum_drawdown_fraction must be finite, got {value}")]
    NonFiniteFraction { index: usize, value: f64 },
    #[error("at least one risk model is required")]
    NoModels,
    #[error("encode config: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One risk model entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ModelConfig {
    /// Trailing-high drawdown monitor.
    TrailingStop {
        #[serde(default = "default_fraction")]
        maximum_drawdown_fraction: f64,
        #[serde(default)]
        on_malformed: MalformedTickPolicy,
    },
    /// Never emits anything.
    Null,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self::TrailingStop {
            maximum_drawdown_fraction: DEFAULT_MAXIMUM_DRAWDOWN_FRACTION,
            on_malformed: MalformedTickPolicy::default(),
        }
    }
}

fn default_fraction() -> f64 {
    DEFAULT_MAXIMUM_DRAWDOWN_FRACTION
}

fn default_models() -> Vec<ModelConfig> {
    vec![ModelConfig::default()]
}

/// Driver behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Abort the session on the first instruction the executor refuses.
    #[serde(default)]
    pub stop_on_executor_error: bool,
}

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_models")]
    pub models: Vec<ModelConfig>,
    #[serde(default)]
    pub session: SessionConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            models: default_models(),
            session: SessionConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject what cannot be evaluated; warn about what can but is unusual.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.models.is_empty() {
            return Err(ConfigError::NoModels);
        }
        for (index, model) in self.models.iter().enumerate() {
            if let ModelConfig::TrailingStop {
                maximum_drawdown_fraction,
                ..
            } = model
            {
                let value = *maximum_drawdown_fraction;
                if !value.is_finite() {
                    return Err(ConfigError::NonFiniteFraction { index, value });
                }
                if value.abs() > 1.0 {
                    warn!(
                        index,
                        value, "maximum_drawdown_fraction above 1.0, this model can never trigger"
                    );
                }
            }
        }
        Ok(())
    }

    /// Replace the fraction of every trailing-stop model (CLI override).
    pub fn override_fraction(&mut self, fraction: f64) {
        for model in &mut self.models {
            if let ModelConfig::TrailingStop {
                maximum_drawdown_fraction,
                ..
            } = model
            {
                *maximum_drawdown_fraction = fraction;
            }
        }
    }

    /// Deterministic hash of the configuration (BLAKE3 over canonical JSON).
    ///
    /// Fractions are hashed after sign normalization, so `f` and `-f` hash equal.
    pub fn config_hash(&self) -> Result<String, ConfigError> {
        let mut normalized = self.clone();
        for model in &mut normalized.models {
            if let ModelConfig::TrailingStop {
                maximum_drawdown_fraction,
                ..
            } = model
            {
                *maximum_drawdown_fraction = maximum_drawdown_fraction.abs();
            }
        }
        let json = serde_json::to_string(&normalized)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}
