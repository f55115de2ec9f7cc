//! Configuration for the mod loading runtime
//!
//! Loaded from a TOML file; every field has a default so an absent or empty
//! file still yields a working configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log filter (e.g. "info", "catan_mods=debug"). `RUST_LOG` takes
    /// precedence when set.
    pub filter: Option<String>,

    /// Emit JSON-formatted logs (requires the `json-logging` feature)
    #[serde(default)]
    pub json_format: bool,
}

/// Mod loader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModLoaderConfig {
    /// Directory scanned for mod packages
    #[serde(default = "default_mods_dir")]
    pub mods_dir: PathBuf,

    /// Logging configuration
    pub logging: Option<LoggingConfig>,
}

fn default_mods_dir() -> PathBuf {
    PathBuf::from("mods")
}

impl Default for ModLoaderConfig {
    fn default() -> Self {
        Self {
            mods_dir: PathBuf::from("mods"),
            logging: None,
        }
    }
}

impl ModLoaderConfig {
    /// Load configuration from a TOML file
    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ModLoaderConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_toml_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
