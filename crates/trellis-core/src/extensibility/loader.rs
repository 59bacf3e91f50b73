//! Discovery and parsing of plugin descriptor documents.
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::extensibility::catalog::PluginCatalog;
use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::manifest::PluginManifest;
use crate::extensibility::preprocessor::{DirectivePreprocessor, Preprocessor};
use crate::kernel::constants::PLUGIN_FILE_EXTENSION;
use crate::utils::fs::find_files_with_extension;

/// A parsed plugin descriptor and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadedPlugin {
    pub plugin: PluginManifest,
    pub base_directory: PathBuf,
    /// `None` for descriptors supplied as inline text.
    pub source_file: Option<PathBuf>,
}

/// A descriptor supplied as text rather than as a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePlugin {
    pub text: String,
    pub base_directory: PathBuf,
}

/// Everything that determines what a loader discovers.
#[derive(Debug, Clone, Default)]
pub struct LoaderInputs {
    pub plugin_paths: Vec<PathBuf>,
    pub preprocessor_constants: BTreeSet<String>,
    pub inline_plugins: Vec<InlinePlugin>,
}

/// Produces parsed descriptors from a set of inputs.
pub trait PluginSource {
    fn inputs(&self) -> &LoaderInputs;
    fn inputs_mut(&mut self) -> &mut LoaderInputs;
    fn scan(&self) -> Result<Vec<LoadedPlugin>>;
}

pub trait PluginLoader {
    fn inputs_mut(&mut self) -> &mut LoaderInputs;

    fn load(&self) -> Result<Vec<LoadedPlugin>>;

    /// Adds a descriptor file, or a directory scanned recursively for
    /// descriptor files.
    fn add_plugin_path(&mut self, path: PathBuf) {
        self.inputs_mut().plugin_paths.push(path);
    }

    fn add_plugin_text(&mut self, text: String, base_directory: PathBuf) {
        self.inputs_mut().inline_plugins.push(InlinePlugin { text, base_directory });
    }

    fn define_preprocessor_constant(&mut self, constant: String) {
        self.inputs_mut().preprocessor_constants.insert(constant);
    }

    fn populate_catalog(&self, catalog: &mut PluginCatalog) -> Result<()> {
        for loaded in self.load()? {
            catalog.add_plugin(loaded.plugin, loaded.base_directory);
        }
        Ok(())
    }
}

/// Scans the filesystem on every load.
#[derive(Clone)]
pub struct DefaultPluginLoader {
    inputs: LoaderInputs,
    preprocessor: Arc<dyn Preprocessor>,
}

impl DefaultPluginLoader {
    pub fn new() -> Self {
        Self::with_preprocessor(Arc::new(DirectivePreprocessor))
    }

    pub fn with_preprocessor(preprocessor: Arc<dyn Preprocessor>) -> Self {
        DefaultPluginLoader {
            inputs: LoaderInputs::default(),
            preprocessor,
        }
    }

    fn descriptor_files(&self) -> Result<Vec<PathBuf>> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();
        for path in &self.inputs.plugin_paths {
            let candidates = if path.is_file() {
                vec![path.clone()]
            } else if path.is_dir() {
                find_files_with_extension(path, PLUGIN_FILE_EXTENSION)
                    .map_err(|e| ExtensibilityError::io(e, "scan_plugin_directory", path.clone()))?
            } else {
                warn!("Ignoring plugin path '{}' because it does not exist.", path.display());
                continue;
            };
            for file in candidates {
                let key = fs::canonicalize(&file).unwrap_or_else(|_| file.clone());
                if seen.insert(key) {
                    files.push(file);
                }
            }
        }
        Ok(files)
    }

    fn parse(&self, text: &str, path: Option<&Path>) -> Result<PluginManifest> {
        let text = self
            .preprocessor
            .preprocess(text, &self.inputs.preprocessor_constants)
            .map_err(|e| ExtensibilityError::Manifest {
                path: path.map(Path::to_path_buf),
                message: "Failed to preprocess plugin descriptor.".to_string(),
                source: Some(Box::new(e)),
            })?;
        PluginManifest::from_json_str(&text, path)
    }

    fn load_file(&self, file: &Path) -> Result<LoadedPlugin> {
        let text = fs::read_to_string(file)
            .map_err(|e| ExtensibilityError::io(e, "read_plugin_descriptor", file.to_path_buf()))?;
        let plugin = self.parse(&text, Some(file))?;
        let base_directory = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        debug!("Loaded plugin '{}' from '{}'", plugin.plugin_id, file.display());
        Ok(LoadedPlugin {
            plugin,
            base_directory,
            source_file: Some(file.to_path_buf()),
        })
    }
}

impl Default for DefaultPluginLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginSource for DefaultPluginLoader {
    fn inputs(&self) -> &LoaderInputs {
        &self.inputs
    }

    fn inputs_mut(&mut self) -> &mut LoaderInputs {
        &mut self.inputs
    }

    fn scan(&self) -> Result<Vec<LoadedPlugin>> {
        let mut loaded = Vec::new();
        for file in self.descriptor_files()? {
            loaded.push(self.load_file(&file)?);
        }
        for inline in &self.inputs.inline_plugins {
            loaded.push(LoadedPlugin {
                plugin: self.parse(&inline.text, None)?,
                base_directory: inline.base_directory.clone(),
                source_file: None,
            });
        }
        Ok(loaded)
    }
}

impl PluginLoader for DefaultPluginLoader {
    fn inputs_mut(&mut self) -> &mut LoaderInputs {
        &mut self.inputs
    }

    fn load(&self) -> Result<Vec<LoadedPlugin>> {
        self.scan()
    }
}
