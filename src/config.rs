//! Configuration management for drifter
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (drifter.toml)
//! - Environment variables (DRIFTER__*)
//!
//! ## Example config file (drifter.toml):
//! ```toml
//! [registry]
//! schema_dir = ".drifter"
//!
//! [storage]
//! output_format = "pretty"
//! sync = true
//! ```

use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrifterConfig {
    /// Registry settings
    #[serde(default)]
    pub registry: RegistryConfig,

    /// History document settings
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Registry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Directory holding one history document per dataset
    #[serde(default = "default_schema_dir")]
    pub schema_dir: PathBuf,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// JSON layout of history documents
    #[serde(default)]
    pub output_format: OutputFormat,

    /// fsync history documents before they replace the previous version
    #[serde(default = "default_true")]
    pub sync: bool,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_schema_dir() -> PathBuf {
    PathBuf::from(".drifter")
}

fn default_true() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            schema_dir: default_schema_dir(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::Pretty,
            sync: true,
        }
    }
}

impl DrifterConfig {
    /// Defaults with a different history directory
    pub fn with_schema_dir(schema_dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::default();
        config.registry.schema_dir = schema_dir.into();
        config
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_locations = ["drifter.toml", ".drifter.toml", "config/drifter.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "drifter", "drifter") {
            let xdg_config = config_dir.config_dir().join("drifter.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        // DRIFTER__REGISTRY__SCHEMA_DIR, DRIFTER__STORAGE__SYNC, ...
        builder = builder.add_source(
            Environment::with_prefix("DRIFTER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Save configuration to a file
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get the history directory (resolves relative paths)
    pub fn schema_dir(&self) -> PathBuf {
        if self.registry.schema_dir.is_absolute() {
            self.registry.schema_dir.clone()
        } else {
            std::env::current_dir()
                .unwrap_or_default()
                .join(&self.registry.schema_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = DrifterConfig::default();
        assert_eq!(config.registry.schema_dir, PathBuf::from(".drifter"));
        assert_eq!(config.storage.output_format, OutputFormat::Pretty);
        assert!(config.storage.sync);
        assert!(config.schema_dir().ends_with(".drifter"));
    }

    #[test]
    fn test_serialize_config() {
        let config = DrifterConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[registry]"));
        assert!(toml_str.contains("[storage]"));
    }

    #[test]
    fn test_save_and_load_explicit_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");

        let mut config = DrifterConfig::with_schema_dir(dir.path().join("histories"));
        config.storage.output_format = OutputFormat::Compact;
        config.save(&path).unwrap();

        let loaded = DrifterConfig::load_from(Some(path.as_path())).unwrap();
        assert_eq!(loaded.registry.schema_dir, dir.path().join("histories"));
        assert_eq!(loaded.storage.output_format, OutputFormat::Compact);
        assert_eq!(loaded.schema_dir(), dir.path().join("histories"));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempdir().unwrap();
        let result = DrifterConfig::load_from(Some(dir.path().join("nope.toml").as_path()));
        assert!(result.is_err());
    }
}
