//! Service and resource location.
//!
//! [`ServiceLocator`] is the surface most framework code depends on: it
//! resolves enabled components by contract type or by component id.
//! [`ResourceLocator`] turns resource URIs into filesystem paths.
use std::any::type_name;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use crate::extensibility::descriptor::PluginDescriptor;
use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::handle::ComponentHandle;
use crate::extensibility::object::{Object, Value};
use crate::extensibility::registry::RegistryInner;
use crate::extensibility::search_rules;
use crate::extensibility::types::{TypeName, TypeRegistry};

pub trait ServiceLocator: Send + Sync {
    fn type_registry(&self) -> Result<Arc<TypeRegistry>>;

    /// The single enabled component of a service type.
    ///
    /// Fails when there is no enabled component, or more than one.
    fn resolve_handle_by_type_name(&self, service_type: &TypeName) -> Result<ComponentHandle>;

    /// All enabled components of a service type, empty when the service is
    /// unknown.
    fn resolve_all_handles_by_type_name(&self, service_type: &TypeName) -> Result<Vec<ComponentHandle>>;

    /// Fails when the component is absent or disabled.
    fn resolve_handle_by_component_id(&self, component_id: &str) -> Result<ComponentHandle>;

    fn has_service(&self, service_type: &TypeName) -> bool;

    /// True when exactly one enabled component provides the service.
    fn can_resolve(&self, service_type: &TypeName) -> bool;

    /// True when at least one enabled component provides the service.
    fn can_resolve_all(&self, service_type: &TypeName) -> bool;

    /// True when the component exists and is enabled.
    fn has_component(&self, component_id: &str) -> bool;

    fn resolve_by_type_name(&self, service_type: &TypeName) -> Result<Object> {
        self.resolve_handle_by_type_name(service_type)?.get_component()
    }

    fn resolve_all_by_type_name(&self, service_type: &TypeName) -> Result<Vec<Object>> {
        self.resolve_all_handles_by_type_name(service_type)?
            .iter()
            .map(ComponentHandle::get_component)
            .collect()
    }

    fn resolve_by_component_id(&self, component_id: &str) -> Result<Object> {
        self.resolve_handle_by_component_id(component_id)?.get_component()
    }
}

/// Typed wrappers over [`ServiceLocator`] keyed by registered contract types.
pub trait ServiceLocatorExt: ServiceLocator {
    fn contract_name<C: ?Sized + 'static>(&self) -> Result<TypeName> {
        self.type_registry()?.contract_name_of::<C>().ok_or_else(|| {
            ExtensibilityError::resolution(
                type_name::<C>(),
                format!("Type '{}' is not registered as a contract.", type_name::<C>()),
            )
        })
    }

    fn resolve<C: ?Sized + 'static>(&self) -> Result<Arc<C>> {
        let contract = self.contract_name::<C>()?;
        Value::Object(self.resolve_by_type_name(&contract)?).into_service::<C>()
    }

    fn resolve_all<C: ?Sized + 'static>(&self) -> Result<Vec<Arc<C>>> {
        let contract = self.contract_name::<C>()?;
        self.resolve_all_by_type_name(&contract)?
            .into_iter()
            .map(|object| Value::Object(object).into_service::<C>())
            .collect()
    }

    fn resolve_component<C: ?Sized + 'static>(&self, component_id: &str) -> Result<Arc<C>> {
        Value::Object(self.resolve_by_component_id(component_id)?).into_service::<C>()
    }

    fn resolve_handle<C: ?Sized + 'static>(&self) -> Result<ComponentHandle> {
        let contract = self.contract_name::<C>()?;
        self.resolve_handle_by_type_name(&contract)
    }

    fn resolve_all_handles<C: ?Sized + 'static>(&self) -> Result<Vec<ComponentHandle>> {
        let contract = self.contract_name::<C>()?;
        self.resolve_all_handles_by_type_name(&contract)
    }
}

impl<L: ServiceLocator + ?Sized> ServiceLocatorExt for L {}

/// A service locator that reaches its registry through a weak reference.
#[derive(Clone)]
pub struct RegistryServiceLocator {
    registry: Weak<RegistryInner>,
}

impl RegistryServiceLocator {
    pub(crate) fn new(registry: Weak<RegistryInner>) -> Self {
        RegistryServiceLocator { registry }
    }

    fn registry(&self) -> Result<Arc<RegistryInner>> {
        self.registry.upgrade().ok_or(ExtensibilityError::RegistryDropped)
    }

    fn probe(&self, query: impl FnOnce(&RegistryInner) -> bool) -> bool {
        self.registry.upgrade().is_some_and(|registry| query(&registry))
    }
}

impl ServiceLocator for RegistryServiceLocator {
    fn type_registry(&self) -> Result<Arc<TypeRegistry>> {
        Ok(self.registry()?.types.clone())
    }

    fn resolve_handle_by_type_name(&self, service_type: &TypeName) -> Result<ComponentHandle> {
        self.registry()?.resolve_handle(service_type)
    }

    fn resolve_all_handles_by_type_name(&self, service_type: &TypeName) -> Result<Vec<ComponentHandle>> {
        Ok(self.registry()?.resolve_all_handles(service_type))
    }

    fn resolve_handle_by_component_id(&self, component_id: &str) -> Result<ComponentHandle> {
        self.registry()?.resolve_handle_by_component_id(component_id)
    }

    fn has_service(&self, service_type: &TypeName) -> bool {
        self.probe(|registry| registry.has_service(service_type))
    }

    fn can_resolve(&self, service_type: &TypeName) -> bool {
        self.probe(|registry| registry.enabled_component_count(service_type) == 1)
    }

    fn can_resolve_all(&self, service_type: &TypeName) -> bool {
        self.probe(|registry| registry.enabled_component_count(service_type) > 0)
    }

    fn has_component(&self, component_id: &str) -> bool {
        self.probe(|registry| registry.has_component(component_id))
    }
}

pub trait ResourceLocator: Send + Sync {
    /// Resolves a resource URI to a path.
    ///
    /// Accepts `plugin://<plugin-id>/<path>`, `file://` URIs and absolute
    /// paths.
    fn resolve_resource_path(&self, uri: &str) -> Result<PathBuf>;
}

const PLUGIN_SCHEME: &str = "plugin://";
const FILE_SCHEME: &str = "file://";

/// Probes a plugin's search paths for `relative`, falling back to the
/// plugin's base directory when nothing exists yet.
fn locate_in_plugin(plugin: &PluginDescriptor, relative: &Path) -> PathBuf {
    if relative.as_os_str().is_empty() {
        return plugin.base_directory().to_path_buf();
    }
    search_rules::probe_resource(plugin.base_directory(), plugin.probing_paths(), relative)
        .unwrap_or_else(|_| plugin.base_directory().join(relative))
}

#[derive(Clone)]
pub struct RegistryResourceLocator {
    registry: Weak<RegistryInner>,
}

impl RegistryResourceLocator {
    pub(crate) fn new(registry: Weak<RegistryInner>) -> Self {
        RegistryResourceLocator { registry }
    }
}

impl ResourceLocator for RegistryResourceLocator {
    fn resolve_resource_path(&self, uri: &str) -> Result<PathBuf> {
        if let Some(rest) = uri.strip_prefix(PLUGIN_SCHEME) {
            let (plugin_id, relative) = rest.split_once('/').unwrap_or((rest, ""));
            let registry = self.registry.upgrade().ok_or(ExtensibilityError::RegistryDropped)?;
            let plugin = registry
                .data
                .read(|data| data.plugin(plugin_id).cloned())
                .ok_or_else(|| {
                    ExtensibilityError::resolution(
                        plugin_id,
                        format!(
                            "Could not resolve resource '{}' because plugin '{}' is not registered.",
                            uri, plugin_id
                        ),
                    )
                })?;
            return Ok(locate_in_plugin(&plugin, Path::new(relative)));
        }
        if let Some(rest) = uri.strip_prefix(FILE_SCHEME) {
            return Ok(PathBuf::from(rest));
        }
        let path = Path::new(uri);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Err(ExtensibilityError::resolution(
                uri,
                format!("Could not resolve relative resource path '{}' outside of a plugin.", uri),
            ))
        }
    }
}

/// Resolves relative paths against a plugin's search paths.
#[derive(Clone)]
pub struct PluginResourceLocator {
    plugin: Weak<PluginDescriptor>,
    fallback: RegistryResourceLocator,
}

impl PluginResourceLocator {
    pub(crate) fn new(plugin: Weak<PluginDescriptor>, registry: Weak<RegistryInner>) -> Self {
        PluginResourceLocator {
            plugin,
            fallback: RegistryResourceLocator::new(registry),
        }
    }
}

impl ResourceLocator for PluginResourceLocator {
    fn resolve_resource_path(&self, uri: &str) -> Result<PathBuf> {
        if uri.contains("://") || Path::new(uri).is_absolute() {
            return self.fallback.resolve_resource_path(uri);
        }
        let plugin = self.plugin.upgrade().ok_or(ExtensibilityError::RegistryDropped)?;
        Ok(locate_in_plugin(&plugin, Path::new(uri)))
    }
}
