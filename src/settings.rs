//! Render settings loaded from an optional TOML file

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse settings TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Options controlling the generated artifacts
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Value of the compose file's `version` key
    pub compose_version: String,

    /// Output file name used when none is given
    pub compose_file: String,

    /// Directory, next to the compose file, holding per-package build contexts
    pub packages_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            compose_version: "3.8".to_string(),
            compose_file: "docker-compose.yml".to_string(),
            packages_dir: "packages".to_string(),
        }
    }
}

impl Settings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load settings from a TOML string; missing keys keep their defaults
    pub fn from_str(content: &str) -> Result<Self, SettingsError> {
        Ok(toml::from_str(content)?)
    }

    /// Set the compose file version
    pub fn with_compose_version(mut self, version: impl Into<String>) -> Self {
        self.compose_version = version.into();
        self
    }

    /// Set the default output file name
    pub fn with_compose_file(mut self, name: impl Into<String>) -> Self {
        self.compose_file = name.into();
        self
    }

    /// Set the build context directory
    pub fn with_packages_dir(mut self, dir: impl Into<String>) -> Self {
        self.packages_dir = dir.into();
        self
    }
}
