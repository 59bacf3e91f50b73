#![cfg(test)]

use semver::Version;
use tempfile::tempdir;

use crate::extensibility::locator::ServiceLocator;
use crate::extensibility::object::Value;
use crate::extensibility::registry::Registry;
use crate::extensibility::resolver::{
    DefaultObjectDependencyResolver, DependencyResolution, ObjectDependencyResolver,
};
use crate::extensibility::tests::fixtures::{greeter_registry, Greeter, GREETER};
use crate::extensibility::types::{ResourceKind, ValueKind};

fn resolver_for(registry: &Registry) -> DefaultObjectDependencyResolver {
    DefaultObjectDependencyResolver::new(registry.service_locator(), registry.resource_locator())
}

#[test]
fn test_convert_scalar_values() {
    let registry = Registry::default();
    let resolver = resolver_for(&registry);

    assert!(matches!(resolver.convert("flag", &ValueKind::Bool, "TRUE").unwrap(), Value::Bool(true)));
    assert!(matches!(resolver.convert("flag", &ValueKind::Bool, "false").unwrap(), Value::Bool(false)));
    assert!(matches!(resolver.convert("n", &ValueKind::Integer, " -5 ").unwrap(), Value::Integer(-5)));
    assert!(matches!(resolver.convert("n", &ValueKind::Unsigned, "7").unwrap(), Value::Unsigned(7)));
    assert_eq!(resolver.convert("f", &ValueKind::Float, "1.5").unwrap().as_f64().unwrap(), 1.5);
    assert_eq!(
        resolver.convert("v", &ValueKind::Version, "1.2.3").unwrap().into_version().unwrap(),
        Version::new(1, 2, 3)
    );
    assert_eq!(
        resolver.convert("s", &ValueKind::String, "  kept as is ").unwrap().into_string().unwrap(),
        "  kept as is "
    );
}

#[test]
fn test_convert_enumeration_returns_canonical_variant() {
    let registry = Registry::default();
    let resolver = resolver_for(&registry);
    let kind = ValueKind::enumeration("Mode", &["Fast", "Safe"]);

    let value = resolver.convert("mode", &kind, "safe").unwrap();
    assert_eq!(value.into_string().unwrap(), "Safe");
    assert!(resolver.convert("mode", &kind, "reckless").is_err());
}

#[test]
fn test_convert_list_splits_on_semicolons() {
    let registry = Registry::default();
    let resolver = resolver_for(&registry);

    let value = resolver
        .convert("ports", &ValueKind::list_of(ValueKind::Integer), "80; 443;;8080")
        .unwrap();
    let ports: Vec<i64> = value
        .into_list()
        .unwrap()
        .iter()
        .map(|item| item.as_i64().unwrap())
        .collect();
    assert_eq!(ports, vec![80, 443, 8080]);
}

#[test]
fn test_convert_invalid_values_fail() {
    let registry = Registry::default();
    let resolver = resolver_for(&registry);

    assert!(resolver.convert("n", &ValueKind::Integer, "ten").is_err());
    assert!(resolver.convert("b", &ValueKind::Bool, "yes").is_err());
    assert!(resolver.convert("v", &ValueKind::Version, "1.x").is_err());
    assert!(resolver.convert("d", &ValueKind::PluginDescriptor, "anything").is_err());
}

#[test]
fn test_convert_absolute_resource_path() {
    let registry = Registry::default();
    let resolver = resolver_for(&registry);
    let dir = tempdir().unwrap();
    let icon = dir.path().join("icon.png");

    let value = resolver
        .convert("icon", &ValueKind::Resource(ResourceKind::Icon), icon.to_str().unwrap())
        .unwrap();
    assert_eq!(value.into_path().unwrap(), icon);
}

#[test]
fn test_unconfigured_service_resolves_single_component() {
    let registry = greeter_registry(&["alice"]);
    let resolver = resolver_for(&registry);

    let resolution = resolver
        .resolve_dependency("greeter", &ValueKind::service(GREETER), None)
        .unwrap();
    let greeter = resolution.into_value().unwrap().into_service::<dyn Greeter>().unwrap();
    assert_eq!(greeter.greet(), "hello alice");
}

#[test]
fn test_unconfigured_service_is_unsatisfied_when_ambiguous_or_missing() {
    let registry = greeter_registry(&["alice", "bob"]);
    let resolver = resolver_for(&registry);

    let ambiguous = resolver
        .resolve_dependency("greeter", &ValueKind::service(GREETER), None)
        .unwrap();
    assert!(!ambiguous.is_satisfied());

    let unknown = resolver
        .resolve_dependency("other", &ValueKind::service("Tests.Unknown"), None)
        .unwrap();
    assert!(matches!(unknown, DependencyResolution::Unsatisfied));

    let scalar = resolver.resolve_dependency("count", &ValueKind::Integer, None).unwrap();
    assert!(!scalar.is_satisfied());
}

#[test]
fn test_unconfigured_list_collects_all_enabled_components() {
    let registry = greeter_registry(&["alice", "bob"]);
    let resolver = resolver_for(&registry);

    let value = resolver
        .resolve_dependency("greeters", &ValueKind::list_of(ValueKind::service(GREETER)), None)
        .unwrap()
        .into_value()
        .unwrap();
    let greetings: Vec<String> = value
        .into_services::<dyn Greeter>()
        .unwrap()
        .iter()
        .map(|greeter| greeter.greet())
        .collect();
    assert_eq!(greetings, vec!["hello alice", "hello bob"]);
}

#[test]
fn test_unconfigured_list_is_unsatisfied_without_components() {
    let registry = greeter_registry(&[]);
    let resolver = resolver_for(&registry);

    let resolution = resolver
        .resolve_dependency("greeters", &ValueKind::list_of(ValueKind::service(GREETER)), None)
        .unwrap();
    assert!(!resolution.is_satisfied());
}

#[test]
fn test_component_reference_selects_specific_component() {
    let registry = greeter_registry(&["alice", "bob"]);
    let resolver = resolver_for(&registry);

    let value = resolver
        .resolve_dependency("greeter", &ValueKind::service(GREETER), Some("${hello.bob}"))
        .unwrap()
        .into_value()
        .unwrap();
    assert_eq!(value.into_service::<dyn Greeter>().unwrap().greet(), "hello bob");

    let list = resolver
        .resolve_dependency(
            "greeters",
            &ValueKind::list_of(ValueKind::service(GREETER)),
            Some("${hello.bob};${hello.alice}"),
        )
        .unwrap()
        .into_value()
        .unwrap();
    let greetings: Vec<String> = list
        .into_services::<dyn Greeter>()
        .unwrap()
        .iter()
        .map(|greeter| greeter.greet())
        .collect();
    assert_eq!(greetings, vec!["hello bob", "hello alice"]);
}

#[test]
fn test_component_reference_to_unknown_component_fails() {
    let registry = greeter_registry(&["alice"]);
    let resolver = resolver_for(&registry);

    let result = resolver.resolve_dependency("greeter", &ValueKind::service(GREETER), Some("${nobody}"));
    assert!(result.is_err());
    assert!(!registry.has_component("nobody"));
}

#[test]
fn test_unconfigured_handle_resolves_single_component() {
    let registry = greeter_registry(&["alice"]);
    let resolver = resolver_for(&registry);

    let handle = resolver
        .resolve_dependency("greeter", &ValueKind::handle(GREETER), None)
        .unwrap()
        .into_value()
        .unwrap()
        .into_handle()
        .unwrap();
    assert_eq!(handle.id(), "hello.alice");
    assert_eq!(handle.get_component_as::<dyn Greeter>().unwrap().greet(), "hello alice");
}

#[test]
fn test_unconfigured_handles_follow_component_count() {
    let registry = greeter_registry(&["alice", "bob"]);
    let resolver = resolver_for(&registry);

    let single = resolver
        .resolve_dependency("greeter", &ValueKind::handle(GREETER), None)
        .unwrap();
    assert!(!single.is_satisfied());

    let handles = resolver
        .resolve_dependency("greeters", &ValueKind::list_of(ValueKind::handle(GREETER)), None)
        .unwrap()
        .into_value()
        .unwrap()
        .into_handles()
        .unwrap();
    let ids: Vec<&str> = handles.iter().map(|handle| handle.id()).collect();
    assert_eq!(ids, vec!["hello.alice", "hello.bob"]);

    let empty = greeter_registry(&[]);
    let resolution = resolver_for(&empty)
        .resolve_dependency("greeters", &ValueKind::list_of(ValueKind::handle(GREETER)), None)
        .unwrap();
    assert!(!resolution.is_satisfied());
}

#[test]
fn test_component_reference_yields_handle() {
    let registry = greeter_registry(&["alice", "bob"]);
    let resolver = resolver_for(&registry);

    let handle = resolver
        .resolve_dependency("greeter", &ValueKind::handle(GREETER), Some("${hello.bob}"))
        .unwrap()
        .into_value()
        .unwrap()
        .into_handle()
        .unwrap();
    assert_eq!(handle.id(), "hello.bob");

    let handles = resolver
        .resolve_dependency(
            "greeters",
            &ValueKind::list_of(ValueKind::handle(GREETER)),
            Some("${hello.bob};${hello.alice}"),
        )
        .unwrap()
        .into_value()
        .unwrap()
        .into_handles()
        .unwrap();
    let ids: Vec<&str> = handles.iter().map(|handle| handle.id()).collect();
    assert_eq!(ids, vec!["hello.bob", "hello.alice"]);
}

#[test]
fn test_handle_reference_must_match_contract() {
    let registry = greeter_registry(&["alice"]);
    let resolver = resolver_for(&registry);

    let mismatch = resolver.resolve_dependency("other", &ValueKind::handle("Tests.Other"), Some("${hello.alice}"));
    assert!(mismatch.is_err());

    let unknown = resolver.resolve_dependency("greeter", &ValueKind::handle(GREETER), Some("${nobody}"));
    assert!(unknown.is_err());

    let plain = resolver.resolve_dependency("greeter", &ValueKind::handle(GREETER), Some("hello.alice"));
    assert!(plain.is_err());
}
