//! Runtime configuration.
//!
//! Values come from three layers, highest precedence first: command-line
//! flags (or their environment variables), an optional TOML file, and the
//! built-in defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::host::DEFAULT_ENTRY_POINT;

pub const DEFAULT_DATABASE_URI: &str = "rtree://";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// One partial configuration layer, as read from a file or the command line
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    pub spatial_database_uri: Option<String>,
    pub entry_point: Option<String>,
    pub log_level: Option<String>,
}

impl ConfigLayer {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let layer: ConfigLayer = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(layer)
    }
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub spatial_database_uri: String,
    pub entry_point: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            spatial_database_uri: DEFAULT_DATABASE_URI.to_string(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl Config {
    /// Merge layers over the defaults; later layers win.
    pub fn from_layers<I>(layers: I) -> Result<Self>
    where
        I: IntoIterator<Item = ConfigLayer>,
    {
        let mut config = Config::default();

        for layer in layers {
            if let Some(uri) = layer.spatial_database_uri {
                config.spatial_database_uri = uri;
            }
            if let Some(name) = layer.entry_point {
                config.entry_point = name;
            }
            if let Some(level) = layer.log_level {
                config.log_level = level;
            }
        }

        if config.spatial_database_uri.trim().is_empty() {
            anyhow::bail!("spatial_database_uri must not be empty");
        }
        if config.entry_point.trim().is_empty() {
            anyhow::bail!("entry_point must not be empty");
        }

        Ok(config)
    }
}
