//! Runtime setup file.
//!
//! The setup names the plugin directories to scan, the preprocessor
//! constants to define while reading descriptors, and how descriptor
//! metadata is cached. The file format follows the file extension.
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::storage::error::{Result, StorageSystemError};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// Disk cache settings for plugin metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    /// Defaults to the per-user cache directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        CacheSettings {
            enabled: true,
            directory: None,
        }
    }
}

/// How the runtime discovers and loads plugins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSetup {
    pub plugin_directories: Vec<PathBuf>,
    pub preprocessor_constants: Vec<String>,
    pub cache: CacheSettings,
}

impl RuntimeSetup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin_directory(mut self, directory: impl Into<PathBuf>) -> Self {
        self.plugin_directories.push(directory.into());
        self
    }

    pub fn with_preprocessor_constant(mut self, constant: impl Into<String>) -> Self {
        self.preprocessor_constants.push(constant.into());
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.cache.enabled = false;
        self
    }

    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> Result<String> {
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| {
                StorageSystemError::SerializationError {
                    format: "JSON".to_string(),
                    source: Box::new(e),
                }
            }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| {
                StorageSystemError::SerializationError {
                    format: "YAML".to_string(),
                    source: Box::new(e),
                }
            }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| {
                StorageSystemError::SerializationError {
                    format: "TOML".to_string(),
                    source: Box::new(e),
                }
            }),
        }
    }

    /// Deserialize from string based on format
    pub fn deserialize(data: &str, format: ConfigFormat) -> Result<Self> {
        match format {
            ConfigFormat::Json => serde_json::from_str(data).map_err(|e| {
                StorageSystemError::DeserializationError {
                    format: "JSON".to_string(),
                    source: Box::new(e),
                }
            }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(data).map_err(|e| {
                StorageSystemError::DeserializationError {
                    format: "YAML".to_string(),
                    source: Box::new(e),
                }
            }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(data).map_err(|e| {
                StorageSystemError::DeserializationError {
                    format: "TOML".to_string(),
                    source: Box::new(e),
                }
            }),
        }
    }

    /// Reads a setup file. Relative plugin directories are resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let format = format_of(path)?;
        let data = fs::read_to_string(path)
            .map_err(|e| StorageSystemError::io(e, "read_setup_file", path.to_path_buf()))?;
        let mut setup = Self::deserialize(&data, format)?;
        if let Some(parent) = path.parent() {
            for directory in &mut setup.plugin_directories {
                if directory.is_relative() {
                    *directory = parent.join(&*directory);
                }
            }
        }
        Ok(setup)
    }

    /// Writes the setup atomically, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let format = format_of(path)?;
        let data = self.serialize(format)?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .map_err(|e| StorageSystemError::io(e, "create_dir_all", parent.to_path_buf()))?;

        let temp_file = NamedTempFile::new_in(parent)
            .map_err(|e| StorageSystemError::io(e, "create_temp_file", parent.to_path_buf()))?;
        temp_file
            .as_file()
            .write_all(data.as_bytes())
            .map_err(|e| StorageSystemError::io(e, "write_to_temp_file", temp_file.path().to_path_buf()))?;
        temp_file
            .persist(path)
            .map_err(|e| StorageSystemError::io(e.error, "persist_temp_file", path.to_path_buf()))?;
        Ok(())
    }
}

fn format_of(path: &Path) -> Result<ConfigFormat> {
    ConfigFormat::from_path(path).ok_or_else(|| {
        StorageSystemError::UnsupportedConfigFormat(
            path.extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        )
    })
}
