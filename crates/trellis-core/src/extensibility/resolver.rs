//! Dependency resolution for constructor parameters and properties.
//!
//! A resolver turns a declared [`ParamSpec`](crate::extensibility::types::ParamSpec)
//! into a [`Value`], either by converting a configuration string taken from
//! a property set or, when no configuration is given, by asking the service
//! locator for matching components.
use std::sync::Arc;

use semver::Version;

use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::locator::{ResourceLocator, ServiceLocator};
use crate::extensibility::object::Value;
use crate::extensibility::types::{TypeName, ValueKind};

/// Outcome of resolving one dependency.
#[derive(Debug, Clone)]
pub enum DependencyResolution {
    Satisfied(Value),
    Unsatisfied,
}

impl DependencyResolution {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, DependencyResolution::Satisfied(_))
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            DependencyResolution::Satisfied(value) => Some(value),
            DependencyResolution::Unsatisfied => None,
        }
    }
}

pub trait ObjectDependencyResolver: Send + Sync {
    /// Resolves the dependency `name` of kind `kind`.
    ///
    /// `configuration` is the raw property value for `name`, if any. An
    /// unconvertible configuration value is an error; a dependency that
    /// simply has no source is [`DependencyResolution::Unsatisfied`].
    fn resolve_dependency(
        &self,
        name: &str,
        kind: &ValueKind,
        configuration: Option<&str>,
    ) -> Result<DependencyResolution>;
}

/// Resolves dependencies from configuration strings and a service locator.
#[derive(Clone)]
pub struct DefaultObjectDependencyResolver {
    service_locator: Arc<dyn ServiceLocator>,
    resource_locator: Arc<dyn ResourceLocator>,
}

impl DefaultObjectDependencyResolver {
    pub fn new(
        service_locator: Arc<dyn ServiceLocator>,
        resource_locator: Arc<dyn ResourceLocator>,
    ) -> Self {
        DefaultObjectDependencyResolver {
            service_locator,
            resource_locator,
        }
    }

    pub fn service_locator(&self) -> &Arc<dyn ServiceLocator> {
        &self.service_locator
    }

    pub fn resource_locator(&self) -> &Arc<dyn ResourceLocator> {
        &self.resource_locator
    }

    fn resolve_from_locator(&self, kind: &ValueKind) -> Result<DependencyResolution> {
        match kind {
            ValueKind::List(element) => match element.as_ref() {
                ValueKind::Service(contract) if self.service_locator.can_resolve_all(contract) => {
                    let objects = self.service_locator.resolve_all_by_type_name(contract)?;
                    Ok(DependencyResolution::Satisfied(Value::List(
                        objects.into_iter().map(Value::Object).collect(),
                    )))
                }
                ValueKind::Handle(contract) if self.service_locator.can_resolve_all(contract) => {
                    let handles = self.service_locator.resolve_all_handles_by_type_name(contract)?;
                    Ok(DependencyResolution::Satisfied(Value::List(
                        handles.into_iter().map(Value::Handle).collect(),
                    )))
                }
                _ => Ok(DependencyResolution::Unsatisfied),
            },
            ValueKind::Service(contract) if self.service_locator.can_resolve(contract) => {
                let object = self.service_locator.resolve_by_type_name(contract)?;
                Ok(DependencyResolution::Satisfied(Value::Object(object)))
            }
            ValueKind::Handle(contract) if self.service_locator.can_resolve(contract) => {
                let handle = self.service_locator.resolve_handle_by_type_name(contract)?;
                Ok(DependencyResolution::Satisfied(Value::Handle(handle)))
            }
            _ => Ok(DependencyResolution::Unsatisfied),
        }
    }

    /// Converts a configuration string to a value of `kind`.
    pub fn convert(&self, name: &str, kind: &ValueKind, text: &str) -> Result<Value> {
        if let ValueKind::List(element) = kind {
            return text
                .split(';')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| self.convert(name, element, item))
                .collect::<Result<Vec<_>>>()
                .map(Value::List);
        }
        if let ValueKind::String = kind {
            return Ok(Value::String(text.to_string()));
        }
        if let Some(component_id) = parse_component_reference(text) {
            return self.resolve_component_reference(name, kind, component_id);
        }
        let unsupported = || {
            ExtensibilityError::construction(format!(
                "Could not convert the value '{}' of dependency '{}' to {:?}.",
                text, name, kind
            ))
        };
        let trimmed = text.trim();
        match kind {
            ValueKind::Enum(spec) => spec
                .parse(trimmed)
                .map(|variant| Value::Enum(variant.to_string()))
                .ok_or_else(unsupported),
            ValueKind::Resource(_) => self
                .resource_locator
                .resolve_resource_path(trimmed)
                .map(Value::Path)
                .map_err(|e| {
                    e.into_construction(format!(
                        "Could not resolve the resource '{}' of dependency '{}'.",
                        trimmed, name
                    ))
                }),
            ValueKind::Bool => parse_bool(trimmed).map(Value::Bool).ok_or_else(unsupported),
            ValueKind::Integer => trimmed.parse().map(Value::Integer).map_err(|_| unsupported()),
            ValueKind::Unsigned => trimmed.parse().map(Value::Unsigned).map_err(|_| unsupported()),
            ValueKind::Float => trimmed.parse().map(Value::Float).map_err(|_| unsupported()),
            ValueKind::Version => Version::parse(trimmed)
                .map(Value::Version)
                .map_err(|_| unsupported()),
            _ => Err(unsupported()),
        }
    }

    fn resolve_component_reference(
        &self,
        name: &str,
        kind: &ValueKind,
        component_id: &str,
    ) -> Result<Value> {
        match kind {
            ValueKind::Service(contract) => {
                let object = self.service_locator.resolve_by_component_id(component_id)?;
                object
                    .cast_to(contract)
                    .map(Value::Object)
                    .ok_or_else(|| type_mismatch(component_id, object.type_name(), contract))
            }
            // Compared by service contract; the component is not activated here.
            ValueKind::Handle(contract) => {
                let handle = self.service_locator.resolve_handle_by_component_id(component_id)?;
                if handle.service_type_name().matches(contract) {
                    Ok(Value::Handle(handle))
                } else {
                    Err(type_mismatch(component_id, handle.service_type_name(), contract))
                }
            }
            other => Err(ExtensibilityError::construction(format!(
                "Dependency '{}' of kind {:?} cannot refer to component '{}'.",
                name, other, component_id
            ))),
        }
    }
}

fn type_mismatch(component_id: &str, actual: &TypeName, contract: &TypeName) -> ExtensibilityError {
    ExtensibilityError::construction(format!(
        "Could not inject component '{}' of type '{}' because it is not assignable to '{}'.",
        component_id, actual, contract
    ))
}

fn parse_component_reference(text: &str) -> Option<&str> {
    text.trim()
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .map(str::trim)
        .filter(|id| !id.is_empty())
}

fn parse_bool(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

impl ObjectDependencyResolver for DefaultObjectDependencyResolver {
    fn resolve_dependency(
        &self,
        name: &str,
        kind: &ValueKind,
        configuration: Option<&str>,
    ) -> Result<DependencyResolution> {
        match configuration {
            Some(text) => self
                .convert(name, kind, text)
                .map(DependencyResolution::Satisfied),
            None => self.resolve_from_locator(kind),
        }
    }
}
