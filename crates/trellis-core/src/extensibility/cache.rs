//! Disk cache of parsed plugin descriptors.
//!
//! The cache file name is derived from a hash of the loader inputs, so each
//! distinct combination of plugin paths, preprocessor constants and inline
//! descriptors gets its own snapshot. A snapshot is used only while every
//! descriptor file it was built from still exists with the recorded
//! modification time. Cache failures are logged and treated as a miss.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::loader::{DefaultPluginLoader, LoadedPlugin, LoaderInputs, PluginLoader, PluginSource};
use crate::kernel::constants::{APP_DIR_NAME, PLUGIN_METADATA_CACHE_DIR};
use crate::utils::fs::modified_time;

const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct CacheSnapshot {
    format_version: u32,
    entries: Vec<CacheEntry>,
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    loaded: LoadedPlugin,
    source_modified: Option<SystemTime>,
}

/// The per-user directory holding plugin metadata snapshots.
pub fn default_cache_directory() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
        .join(PLUGIN_METADATA_CACHE_DIR)
}

/// Wraps a [`PluginSource`], reusing its last scan while the descriptor
/// files are unchanged.
pub struct CachingPluginLoader<S: PluginSource = DefaultPluginLoader> {
    source: S,
    cache_directory: PathBuf,
}

impl<S: PluginSource> CachingPluginLoader<S> {
    pub fn new(source: S, cache_directory: impl Into<PathBuf>) -> Self {
        CachingPluginLoader {
            source,
            cache_directory: cache_directory.into(),
        }
    }

    pub fn with_default_cache_directory(source: S) -> Self {
        Self::new(source, default_cache_directory())
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache_directory(&self) -> &Path {
        &self.cache_directory
    }

    /// First 64 bits of a SHA-256 over the sorted loader inputs.
    pub fn cache_key(&self) -> u64 {
        let inputs: &LoaderInputs = self.source.inputs();
        let mut hasher = Sha256::new();

        let mut paths: Vec<String> = inputs
            .plugin_paths
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        paths.sort();
        paths.dedup();
        for path in &paths {
            hasher.update(b"path\0");
            hasher.update(path.as_bytes());
            hasher.update(b"\0");
        }
        for constant in &inputs.preprocessor_constants {
            hasher.update(b"define\0");
            hasher.update(constant.as_bytes());
            hasher.update(b"\0");
        }
        for inline in &inputs.inline_plugins {
            hasher.update(b"inline\0");
            hasher.update(inline.text.as_bytes());
            hasher.update(b"\0");
            hasher.update(inline.base_directory.to_string_lossy().as_bytes());
            hasher.update(b"\0");
        }

        let digest = hasher.finalize();
        let mut key = [0u8; 8];
        key.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(key)
    }

    pub fn cache_file_path(&self) -> PathBuf {
        self.cache_directory.join(format!("{:016x}.json", self.cache_key()))
    }

    fn read_snapshot(&self, path: &Path) -> Option<Vec<LoadedPlugin>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No plugin metadata cache at '{}'", path.display());
                return None;
            }
            Err(e) => {
                warn!("Could not read plugin metadata cache '{}': {}", path.display(), e);
                return None;
            }
        };
        let snapshot: CacheSnapshot = match serde_json::from_str(&text) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Ignoring unreadable plugin metadata cache '{}': {}", path.display(), e);
                return None;
            }
        };
        if snapshot.format_version != CACHE_FORMAT_VERSION {
            debug!("Ignoring plugin metadata cache '{}' with format {}", path.display(), snapshot.format_version);
            return None;
        }

        let mut plugins = Vec::with_capacity(snapshot.entries.len());
        for entry in snapshot.entries {
            if let Some(source_file) = &entry.loaded.source_file {
                let current = modified_time(source_file).ok();
                if current.is_none() || current != entry.source_modified {
                    debug!(
                        "Plugin metadata cache '{}' is stale because '{}' changed",
                        path.display(),
                        source_file.display()
                    );
                    return None;
                }
            }
            plugins.push(entry.loaded);
        }
        Some(plugins)
    }

    fn write_snapshot(&self, path: &Path, plugins: &[LoadedPlugin]) {
        if let Err(e) = self.try_write_snapshot(path, plugins) {
            warn!("Could not write plugin metadata cache '{}': {}", path.display(), e);
        }
    }

    fn try_write_snapshot(&self, path: &Path, plugins: &[LoadedPlugin]) -> Result<()> {
        let entries = plugins
            .iter()
            .map(|loaded| {
                let source_modified = match &loaded.source_file {
                    Some(file) => Some(
                        modified_time(file)
                            .map_err(|e| ExtensibilityError::io(e, "read_modified_time", file.clone()))?,
                    ),
                    None => None,
                };
                Ok(CacheEntry {
                    loaded: loaded.clone(),
                    source_modified,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let snapshot = CacheSnapshot {
            format_version: CACHE_FORMAT_VERSION,
            entries,
        };

        fs::create_dir_all(&self.cache_directory)
            .map_err(|e| ExtensibilityError::io(e, "create_cache_directory", self.cache_directory.clone()))?;
        let temp_file = NamedTempFile::new_in(&self.cache_directory)
            .map_err(|e| ExtensibilityError::io(e, "create_temp_file", self.cache_directory.clone()))?;
        serde_json::to_writer(temp_file.as_file(), &snapshot)
            .map_err(|e| ExtensibilityError::io(io::Error::from(e), "write_cache_file", temp_file.path().to_path_buf()))?;
        temp_file
            .persist(path)
            .map_err(|e| ExtensibilityError::io(e.error, "persist_cache_file", path.to_path_buf()))?;
        debug!("Wrote plugin metadata cache '{}'", path.display());
        Ok(())
    }
}

impl<S: PluginSource> PluginLoader for CachingPluginLoader<S> {
    fn inputs_mut(&mut self) -> &mut LoaderInputs {
        self.source.inputs_mut()
    }

    fn load(&self) -> Result<Vec<LoadedPlugin>> {
        let cache_file = self.cache_file_path();
        if let Some(plugins) = self.read_snapshot(&cache_file) {
            debug!("Loaded {} plugin(s) from cache '{}'", plugins.len(), cache_file.display());
            return Ok(plugins);
        }
        let plugins = self.source.scan()?;
        self.write_snapshot(&cache_file, &plugins);
        Ok(plugins)
    }
}
