#![cfg(test)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tempfile::tempdir;

use crate::extensibility::catalog::PluginCatalog;
use crate::extensibility::error::ExtensibilityError;
use crate::extensibility::locator::{ServiceLocator, ServiceLocatorExt};
use crate::extensibility::manifest::PluginManifest;
use crate::extensibility::registry::Registry;
use crate::extensibility::types::TypeName;

use super::common::{foo_types, write_file, Foo, BAR_IMPL, FOO_IMPL, IFOO};

#[test]
fn test_provider_and_consumer_plugins() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("a").join("a.mod"), "");
    let constructed = Arc::new(AtomicUsize::new(0));
    let registry = Registry::new(foo_types(constructed.clone()));

    let mut catalog = PluginCatalog::new();
    catalog.add_plugin(
        PluginManifest::new("B")
            .with_dependency("A")
            .with_service("svc1", IFOO)
            .with_component("comp1", "svc1", Some(FOO_IMPL)),
        dir.path().join("b"),
    );
    catalog.add_plugin(
        PluginManifest::new("A").with_module("A.Module", Some("a.mod")),
        dir.path().join("a"),
    );
    let report = catalog.apply_to(&registry).unwrap();

    let order: Vec<&str> = report.registered.iter().map(|p| p.plugin_id()).collect();
    assert_eq!(order, vec!["A", "B"]);
    let a = registry.plugins().get("A").unwrap();
    assert!(!a.is_disabled());
    assert_eq!(a.modules()[0].location.as_deref(), Some(dir.path().join("a").join("a.mod").as_path()));
    assert!(registry.plugins().get("B").is_some());

    let components = registry.components().find_by_service_id("svc1");
    let ids: Vec<&str> = components.iter().map(|c| c.component_id()).collect();
    assert_eq!(ids, vec!["comp1"]);

    let first = registry.resolve::<dyn Foo>().unwrap();
    let second = registry.resolve::<dyn Foo>().unwrap();
    assert_eq!(first.label(), "foo");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(constructed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_dependent_plugin_extends_service() {
    let dir = tempdir().unwrap();
    let registry = Registry::new(foo_types(Arc::new(AtomicUsize::new(0))));

    let mut catalog = PluginCatalog::new();
    catalog.add_plugin(
        PluginManifest::new("A")
            .with_service("svc1", IFOO)
            .with_component("comp1", "svc1", Some(FOO_IMPL)),
        dir.path().join("a"),
    );
    catalog.add_plugin(
        PluginManifest::new("B")
            .with_dependency("A")
            .with_component("comp2", "svc1", Some(BAR_IMPL)),
        dir.path().join("b"),
    );
    catalog.apply_to(&registry).unwrap();

    let mut labels: Vec<&str> = registry
        .resolve_all::<dyn Foo>()
        .unwrap()
        .iter()
        .map(|foo| foo.label())
        .collect();
    labels.sort();
    assert_eq!(labels, vec!["bar", "foo"]);

    let Err(error) = registry.resolve::<dyn Foo>() else {
        panic!("expected an ambiguous resolution");
    };
    match error {
        ExtensibilityError::AmbiguousResolution { component_ids, .. } => {
            assert_eq!(component_ids, vec!["comp1", "comp2"]);
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(!registry.can_resolve(&TypeName::new(IFOO)));
    assert!(registry.can_resolve_all(&TypeName::new(IFOO)));
    assert_eq!(registry.resolve_component::<dyn Foo>("comp2").unwrap().label(), "bar");
}

#[test]
fn test_missing_module_hides_plugin_components() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("c");
    let registry = Registry::new(foo_types(Arc::new(AtomicUsize::new(0))));

    let mut catalog = PluginCatalog::new();
    catalog.add_plugin(
        PluginManifest::new("A")
            .with_service("svc1", IFOO)
            .with_component("comp1", "svc1", Some(FOO_IMPL)),
        dir.path().join("a"),
    );
    catalog.add_plugin(
        PluginManifest::new("C")
            .with_dependency("A")
            .with_module("C.Module", Some("missing.mod"))
            .with_probing_path("lib")
            .with_component("comp3", "svc1", Some(BAR_IMPL)),
        &base,
    );
    catalog.apply_to(&registry).unwrap();

    let c = registry.plugins().get("C").unwrap();
    assert!(c.is_disabled());
    let reason = c.disabled_reason().unwrap();
    for attempted in [
        base.join("missing.mod"),
        base.join("bin").join("missing.mod"),
        base.join("lib").join("missing.mod"),
        base.join("bin").join("lib").join("missing.mod"),
    ] {
        assert!(reason.contains(&attempted.display().to_string()), "{}", reason);
    }

    let comp3 = registry.components().get("comp3").unwrap();
    assert!(comp3.is_disabled());
    assert!(comp3.disabled_reason().unwrap().contains("missing.mod"));
    assert!(!registry.has_component("comp3"));

    let resolved = registry.resolve_all::<dyn Foo>().unwrap();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].label(), "foo");
    assert_eq!(registry.resolve::<dyn Foo>().unwrap().label(), "foo");
}
