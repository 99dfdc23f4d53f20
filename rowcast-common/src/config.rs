//! Configuration management for Rowcast

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

/// Main configuration structure for Rowcast
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Scan configuration
    #[serde(default)]
    pub scan: ScanConfig,
}

impl Config {
    /// Load configuration from a TOML or JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = if path.as_ref().extension().map_or(false, |ext| ext == "toml") {
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse TOML config: {}", e)))?
        } else {
            serde_json::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse JSON config: {}", e)))?
        };

        debug!("Loaded configuration from {:?}", path.as_ref());
        Ok(config)
    }
}

/// Scan configuration handed to the external scan builder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Row-cache/batch-size hint for the store scanner (0 = store default)
    pub cache_size: usize,
    /// Inclusive start-key literal; may carry an `@mask` conversion suffix
    #[serde(default)]
    pub key_start: Option<String>,
    /// Exclusive stop-key literal; may carry an `@mask` conversion suffix
    #[serde(default)]
    pub key_stop: Option<String>,
    /// If true a row passes when any filter matches, otherwise all must match
    #[serde(rename = "match_any_filter")]
    pub match_any: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            cache_size: 0,
            key_start: None,
            key_stop: None,
            match_any: false,
        }
    }
}
