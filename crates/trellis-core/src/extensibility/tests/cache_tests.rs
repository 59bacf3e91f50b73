#![cfg(test)]

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, SystemTime};

use tempfile::tempdir;

use crate::extensibility::cache::CachingPluginLoader;
use crate::extensibility::error::Result;
use crate::extensibility::loader::{
    DefaultPluginLoader, LoadedPlugin, LoaderInputs, PluginLoader, PluginSource,
};
use crate::extensibility::tests::loader_tests::write_plugin;

/// Counts how often the wrapped loader actually scans.
struct CountingSource {
    inner: DefaultPluginLoader,
    scans: AtomicUsize,
}

impl CountingSource {
    fn new() -> Self {
        CountingSource {
            inner: DefaultPluginLoader::new(),
            scans: AtomicUsize::new(0),
        }
    }

    fn scans(&self) -> usize {
        self.scans.load(Ordering::SeqCst)
    }
}

impl PluginSource for CountingSource {
    fn inputs(&self) -> &LoaderInputs {
        self.inner.inputs()
    }

    fn inputs_mut(&mut self) -> &mut LoaderInputs {
        PluginSource::inputs_mut(&mut self.inner)
    }

    fn scan(&self) -> Result<Vec<LoadedPlugin>> {
        self.scans.fetch_add(1, Ordering::SeqCst);
        self.inner.scan()
    }
}

fn caching_loader(plugins: &Path, cache: &Path) -> CachingPluginLoader<CountingSource> {
    let mut loader = CachingPluginLoader::new(CountingSource::new(), cache);
    loader.add_plugin_path(plugins.to_path_buf());
    loader
}

fn touch(path: &Path) {
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(10))
        .unwrap();
}

#[test]
fn test_second_load_is_served_from_cache() {
    let plugins = tempdir().unwrap();
    let cache = tempdir().unwrap();
    write_plugin(plugins.path(), "a.plugin", "A");
    let loader = caching_loader(plugins.path(), cache.path());

    let first = loader.load().unwrap();
    let second = loader.load().unwrap();

    assert_eq!(loader.source().scans(), 1);
    assert_eq!(first, second);
    assert!(loader.cache_file_path().exists());
}

#[test]
fn test_cache_survives_new_loader_instances() {
    let plugins = tempdir().unwrap();
    let cache = tempdir().unwrap();
    write_plugin(plugins.path(), "a.plugin", "A");

    caching_loader(plugins.path(), cache.path()).load().unwrap();
    let loader = caching_loader(plugins.path(), cache.path());
    let loaded = loader.load().unwrap();

    assert_eq!(loader.source().scans(), 0);
    assert_eq!(loaded[0].plugin.plugin_id, "A");
}

#[test]
fn test_modified_descriptor_invalidates_cache() {
    let plugins = tempdir().unwrap();
    let cache = tempdir().unwrap();
    let file = write_plugin(plugins.path(), "a.plugin", "A");
    let loader = caching_loader(plugins.path(), cache.path());
    loader.load().unwrap();

    fs::write(&file, r#"{ "plugin_id": "A", "dependencies": ["B"] }"#).unwrap();
    touch(&file);
    let reloaded = loader.load().unwrap();

    assert_eq!(loader.source().scans(), 2);
    assert_eq!(reloaded[0].plugin.dependencies, vec!["B"]);
}

#[test]
fn test_deleted_descriptor_invalidates_cache() {
    let plugins = tempdir().unwrap();
    let cache = tempdir().unwrap();
    let file = write_plugin(plugins.path(), "a.plugin", "A");
    let loader = caching_loader(plugins.path(), cache.path());
    loader.load().unwrap();

    fs::remove_file(&file).unwrap();
    let reloaded = loader.load().unwrap();

    assert_eq!(loader.source().scans(), 2);
    assert!(reloaded.is_empty());
}

#[test]
fn test_cache_key_depends_on_inputs_not_their_order() {
    let cache = tempdir().unwrap();
    let mut first = CachingPluginLoader::new(DefaultPluginLoader::new(), cache.path());
    first.add_plugin_path(PathBuf::from("/a"));
    first.add_plugin_path(PathBuf::from("/b"));
    let mut second = CachingPluginLoader::new(DefaultPluginLoader::new(), cache.path());
    second.add_plugin_path(PathBuf::from("/b"));
    second.add_plugin_path(PathBuf::from("/a"));

    assert_eq!(first.cache_file_path(), second.cache_file_path());

    second.define_preprocessor_constant("DEBUG".to_string());
    assert_ne!(first.cache_file_path(), second.cache_file_path());

    first.add_plugin_text("{}".to_string(), PathBuf::from("/inline"));
    assert_ne!(first.cache_key(), second.cache_key());

    let name = first.cache_file_path().file_name().unwrap().to_string_lossy().into_owned();
    assert_eq!(name.len(), "0123456789abcdef.json".len());
    assert!(name.ends_with(".json"));
}

#[test]
fn test_corrupt_cache_file_is_rebuilt() {
    let plugins = tempdir().unwrap();
    let cache = tempdir().unwrap();
    write_plugin(plugins.path(), "a.plugin", "A");
    let loader = caching_loader(plugins.path(), cache.path());
    fs::write(loader.cache_file_path(), "garbage").unwrap();

    assert_eq!(loader.load().unwrap().len(), 1);
    assert_eq!(loader.load().unwrap().len(), 1);
    assert_eq!(loader.source().scans(), 1);
}

#[test]
fn test_unwritable_cache_directory_falls_back_to_scanning() {
    let plugins = tempdir().unwrap();
    let cache = tempdir().unwrap();
    write_plugin(plugins.path(), "a.plugin", "A");
    let blocker = cache.path().join("blocker");
    fs::write(&blocker, "a file where the cache directory should be").unwrap();
    let loader = caching_loader(plugins.path(), &blocker.join("cache"));

    assert_eq!(loader.load().unwrap().len(), 1);
    assert_eq!(loader.load().unwrap().len(), 1);
    assert_eq!(loader.source().scans(), 2);
}

#[test]
fn test_inline_plugins_are_cached() {
    let cache = tempdir().unwrap();
    let mut loader = CachingPluginLoader::new(CountingSource::new(), cache.path());
    loader.add_plugin_text(r#"{ "plugin_id": "Inline" }"#.to_string(), PathBuf::from("/inline"));

    loader.load().unwrap();
    let loaded = loader.load().unwrap();

    assert_eq!(loader.source().scans(), 1);
    assert_eq!(loaded[0].plugin.plugin_id, "Inline");
    assert!(loaded[0].source_file.is_none());
}
