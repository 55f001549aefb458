//! Configuration file support for py-dep-why
//!
//! Reads configuration from `~/.config/py-dep-why/config.json`:
//!
//! ```json
//! {
//!   "python": "/home/me/project/.venv/bin/python",
//!   "max_paths": 10,
//!   "max_depth": 40,
//!   "color": false
//! }
//! ```
//!
//! Every key is optional. Command-line flags take precedence.

use crate::explain::{DEFAULT_MAX_DEPTH, DEFAULT_MAX_PATHS};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot determine config directory. HOME environment variable not set.")]
    NoConfigDir,

    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Interpreter to inspect when neither --python nor --venv is given
    #[serde(default)]
    pub python: Option<PathBuf>,

    #[serde(default)]
    pub max_paths: Option<usize>,

    #[serde(default)]
    pub max_depth: Option<usize>,

    /// Set to false to disable ANSI colors
    #[serde(default)]
    pub color: Option<bool>,
}

impl Config {
    /// Load configuration from the default path or return defaults if not found
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn max_paths(&self) -> usize {
        self.max_paths.unwrap_or(DEFAULT_MAX_PATHS)
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    pub fn color_enabled(&self) -> bool {
        self.color.unwrap_or(true)
    }
}

/// Returns the config file path: `~/.config/py-dep-why/config.json`
pub fn config_path() -> Result<PathBuf, ConfigError> {
    // Use XDG_CONFIG_HOME if set, otherwise fall back to ~/.config
    let config_base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".config"))
                .unwrap_or_default()
        });

    if config_base.as_os_str().is_empty() {
        return Err(ConfigError::NoConfigDir);
    }

    Ok(config_base.join("py-dep-why").join("config.json"))
}
