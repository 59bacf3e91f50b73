#![cfg(test)]

use std::fs::File;
use std::path::Path;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tempfile::tempdir;

use crate::extensibility::catalog::PluginCatalog;
use crate::extensibility::loader::{DefaultPluginLoader, PluginLoader};
use crate::extensibility::locator::ServiceLocatorExt;
use crate::extensibility::registry::Registry;
use crate::kernel::bootstrap::Runtime;
use crate::storage::config::RuntimeSetup;

use super::common::{foo_types, write_file, Foo, BAR_IMPL, FOO_IMPL, IFOO};

fn provider_descriptor(component_type: &str) -> String {
    format!(
        r#"{{
  "plugin_id": "provider",
  "modules": [{{ "name": "Provider", "location": "provider.mod" }}],
  "services": [{{ "service_id": "svc1", "service_type": "{}" }}],
  "components": [{{ "component_id": "comp1", "service_id": "svc1", "component_type": "{}" }}]
}}"#,
        IFOO, component_type
    )
}

fn write_provider(plugins: &Path, component_type: &str) {
    write_file(&plugins.join("provider").join("bin").join("provider.mod"), "");
    write_file(
        &plugins.join("provider").join("provider.plugin"),
        &provider_descriptor(component_type),
    );
}

#[test]
fn test_descriptors_on_disk_reach_the_registry() {
    let dir = tempdir().unwrap();
    write_provider(dir.path(), FOO_IMPL);
    write_file(
        &dir.path().join("consumer").join("consumer.plugin"),
        r#"{ "plugin_id": "consumer", "dependencies": ["provider"] }"#,
    );

    let mut loader = DefaultPluginLoader::new();
    loader.add_plugin_path(dir.path().to_path_buf());
    let mut catalog = PluginCatalog::new();
    loader.populate_catalog(&mut catalog).unwrap();
    let registry = Registry::new(foo_types(Arc::new(AtomicUsize::new(0))));
    let report = catalog.apply_to(&registry).unwrap();

    assert_eq!(report.registered.len(), 2);
    assert_eq!(report.disabled().count(), 0);
    let provider = registry.plugins().get("provider").unwrap();
    assert_eq!(provider.base_directory(), dir.path().join("provider").as_path());
    assert_eq!(
        provider.modules()[0].location.as_deref(),
        Some(dir.path().join("provider").join("bin").join("provider.mod").as_path())
    );
    let consumer = registry.plugins().get("consumer").unwrap();
    assert!(consumer.depends_on(&provider));
    assert_eq!(registry.resolve::<dyn Foo>().unwrap().label(), "foo");
}

#[test]
fn test_runtime_from_setup_file() {
    let dir = tempdir().unwrap();
    write_provider(&dir.path().join("plugins"), FOO_IMPL);
    write_file(
        &dir.path().join("trellis.json"),
        r#"{ "plugin_directories": ["plugins"], "cache": { "enabled": false } }"#,
    );

    let setup = RuntimeSetup::load(&dir.path().join("trellis.json")).unwrap();
    let mut runtime = Runtime::new(setup, foo_types(Arc::new(AtomicUsize::new(0))));
    runtime.initialize().unwrap();

    assert!(runtime.verify_installation());
    assert_eq!(runtime.registry().resolve::<dyn Foo>().unwrap().label(), "foo");
}

#[test]
fn test_cached_runtime_sees_descriptor_changes() {
    let plugins = tempdir().unwrap();
    let cache = tempdir().unwrap();
    write_provider(plugins.path(), FOO_IMPL);
    let mut setup = RuntimeSetup::new().with_plugin_directory(plugins.path());
    setup.cache.directory = Some(cache.path().to_path_buf());

    let mut first = Runtime::new(setup.clone(), foo_types(Arc::new(AtomicUsize::new(0))));
    first.initialize().unwrap();
    assert_eq!(first.registry().resolve::<dyn Foo>().unwrap().label(), "foo");

    let mut unchanged = Runtime::new(setup.clone(), foo_types(Arc::new(AtomicUsize::new(0))));
    unchanged.initialize().unwrap();
    assert_eq!(unchanged.registry().resolve::<dyn Foo>().unwrap().label(), "foo");

    let descriptor = plugins.path().join("provider").join("provider.plugin");
    write_file(&descriptor, &provider_descriptor(BAR_IMPL));
    File::options()
        .write(true)
        .open(&descriptor)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(10))
        .unwrap();

    let mut changed = Runtime::new(setup, foo_types(Arc::new(AtomicUsize::new(0))));
    changed.initialize().unwrap();
    assert_eq!(changed.registry().resolve::<dyn Foo>().unwrap().label(), "bar");
}
