//! Plugin, service and component descriptors.
//!
//! Descriptors are created by the [`Registry`](crate::extensibility::Registry)
//! and describe declared metadata. Everything else is computed lazily:
//! resolved types, handlers and instances are memoized in compute-once
//! cells, so a successful resolution happens at most once per descriptor
//! while a failed one is retried by the next caller.
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::handler::{Handler, HandlerFactory};
use crate::extensibility::locator::{PluginResourceLocator, RegistryServiceLocator};
use crate::extensibility::object::{Object, Value};
use crate::extensibility::property_set::PropertySet;
use crate::extensibility::registry::RegistryInner;
use crate::extensibility::resolver::{
    DefaultObjectDependencyResolver, DependencyResolution, ObjectDependencyResolver,
};
use crate::extensibility::search_rules;
use crate::extensibility::traits::{Plugin, PluginTraits, PLUGIN_TRAITS_TYPE, PLUGIN_TYPE, TRAITS_TYPE};
use crate::extensibility::types::{TypeInfo, TypeName, ValueKind};

/// A module referenced by a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    pub name: String,
    pub location: Option<PathBuf>,
}

impl ModuleReference {
    pub fn new(name: impl Into<String>, location: Option<PathBuf>) -> Self {
        ModuleReference {
            name: name.into(),
            location,
        }
    }
}

fn upgrade_registry(registry: &Weak<RegistryInner>) -> Result<Arc<RegistryInner>> {
    registry.upgrade().ok_or(ExtensibilityError::RegistryDropped)
}

fn upgrade<T>(descriptor: &Weak<T>) -> Result<Arc<T>> {
    descriptor.upgrade().ok_or(ExtensibilityError::RegistryDropped)
}

pub struct PluginDescriptor {
    self_ref: Weak<PluginDescriptor>,
    registry: Weak<RegistryInner>,
    plugin_id: String,
    plugin_type_name: TypeName,
    base_directory: PathBuf,
    plugin_properties: PropertySet,
    traits_properties: PropertySet,
    plugin_handler_factory: Arc<dyn HandlerFactory>,
    modules: Vec<ModuleReference>,
    plugin_dependencies: Vec<Arc<PluginDescriptor>>,
    probing_paths: Vec<String>,
    disabled_reason: RwLock<Option<String>>,
    plugin_type: OnceCell<Arc<TypeInfo>>,
    plugin_handler: OnceCell<Arc<dyn Handler>>,
    traits_handler: OnceCell<Arc<dyn Handler>>,
}

pub(crate) struct PluginDescriptorParts {
    pub plugin_id: String,
    pub plugin_type_name: TypeName,
    pub base_directory: PathBuf,
    pub plugin_properties: PropertySet,
    pub traits_properties: PropertySet,
    pub plugin_handler_factory: Arc<dyn HandlerFactory>,
    pub modules: Vec<ModuleReference>,
    pub plugin_dependencies: Vec<Arc<PluginDescriptor>>,
    pub probing_paths: Vec<String>,
}

impl PluginDescriptor {
    pub(crate) fn new(registry: Weak<RegistryInner>, parts: PluginDescriptorParts) -> Arc<Self> {
        // plugin_dependencies holds the transitive closure.
        let mut closure: Vec<Arc<PluginDescriptor>> = Vec::new();
        for dependency in &parts.plugin_dependencies {
            for candidate in std::iter::once(dependency).chain(dependency.plugin_dependencies.iter()) {
                if !closure.iter().any(|known| Arc::ptr_eq(known, candidate)) {
                    closure.push(candidate.clone());
                }
            }
        }
        Arc::new_cyclic(|self_ref| PluginDescriptor {
            self_ref: self_ref.clone(),
            registry,
            plugin_id: parts.plugin_id,
            plugin_type_name: parts.plugin_type_name,
            base_directory: parts.base_directory,
            plugin_properties: parts.plugin_properties,
            traits_properties: parts.traits_properties,
            plugin_handler_factory: parts.plugin_handler_factory,
            modules: parts.modules,
            plugin_dependencies: closure,
            probing_paths: parts.probing_paths,
            disabled_reason: RwLock::new(None),
            plugin_type: OnceCell::new(),
            plugin_handler: OnceCell::new(),
            traits_handler: OnceCell::new(),
        })
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn plugin_type_name(&self) -> &TypeName {
        &self.plugin_type_name
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn plugin_properties(&self) -> &PropertySet {
        &self.plugin_properties
    }

    pub fn traits_properties(&self) -> &PropertySet {
        &self.traits_properties
    }

    pub fn plugin_handler_factory(&self) -> &Arc<dyn HandlerFactory> {
        &self.plugin_handler_factory
    }

    pub fn modules(&self) -> &[ModuleReference] {
        &self.modules
    }

    /// All plugins this plugin depends on, directly or indirectly.
    pub fn plugin_dependencies(&self) -> &[Arc<PluginDescriptor>] {
        &self.plugin_dependencies
    }

    pub fn probing_paths(&self) -> &[String] {
        &self.probing_paths
    }

    pub fn depends_on(&self, other: &PluginDescriptor) -> bool {
        self.plugin_dependencies
            .iter()
            .any(|dependency| std::ptr::eq(Arc::as_ptr(dependency), other))
    }

    pub(crate) fn belongs_to(&self, registry: &Weak<RegistryInner>) -> bool {
        Weak::ptr_eq(&self.registry, registry)
    }

    /// Directories searched for the plugin's modules and resources, in order.
    pub fn search_paths(&self, relative: Option<&Path>) -> Vec<PathBuf> {
        search_rules::search_paths(&self.base_directory, &self.probing_paths, relative)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled_reason().is_some()
    }

    pub fn disabled_reason(&self) -> Option<String> {
        if let Some(reason) = self.disabled_reason.read().clone() {
            return Some(reason);
        }
        self.plugin_dependencies
            .iter()
            .find_map(|dependency| dependency.disabled_reason.read().clone())
            .map(|reason| format!("The plugin depends on another disabled plugin.  Reason: {}", reason))
    }

    /// Disables the plugin. A later call replaces the reason.
    pub fn disable(&self, reason: impl Into<String>) {
        *self.disabled_reason.write() = Some(reason.into());
    }

    pub fn resolve_plugin_type(&self) -> Result<Arc<TypeInfo>> {
        self.plugin_type
            .get_or_try_init(|| upgrade_registry(&self.registry)?.types.resolve(&self.plugin_type_name))
            .cloned()
            .map_err(|e| {
                e.into_resolution(
                    &self.plugin_id,
                    format!("Could not resolve the plugin type of plugin '{}'.", self.plugin_id),
                )
            })
    }

    pub fn resolve_plugin_handler(&self) -> Result<Arc<dyn Handler>> {
        self.plugin_handler
            .get_or_try_init(|| {
                let plugin_type = self.resolve_plugin_type()?;
                self.plugin_handler_factory.create_handler(
                    self.dependency_resolver(true),
                    &TypeName::new(PLUGIN_TYPE),
                    plugin_type,
                    &self.plugin_properties,
                )
            })
            .cloned()
            .map_err(|e| {
                e.into_resolution(
                    &self.plugin_id,
                    format!("Could not resolve the plugin handler of plugin '{}'.", self.plugin_id),
                )
            })
    }

    pub fn resolve_plugin(&self) -> Result<Arc<dyn Plugin>> {
        let wrap = |e: ExtensibilityError| {
            e.into_construction(format!("Could not resolve instance of plugin '{}'.", self.plugin_id))
        };
        let object = self.resolve_plugin_handler().and_then(|h| h.activate()).map_err(wrap)?;
        object.downcast::<dyn Plugin>().ok_or_else(|| {
            ExtensibilityError::construction(format!(
                "Plugin '{}' of type '{}' does not implement the plugin contract.",
                self.plugin_id,
                object.type_name()
            ))
        })
    }

    pub fn resolve_traits_handler(&self) -> Result<Arc<dyn Handler>> {
        self.traits_handler
            .get_or_try_init(|| {
                let types = upgrade_registry(&self.registry)?.types.clone();
                let traits_name = TypeName::new(PLUGIN_TRAITS_TYPE);
                let traits_type = types.resolve(&traits_name)?;
                let mut properties = self.traits_properties.clone();
                if !properties.contains_key("name") {
                    properties.insert("name", self.plugin_id.clone());
                }
                self.plugin_handler_factory.create_handler(
                    self.dependency_resolver(false),
                    &traits_name,
                    traits_type,
                    &properties,
                )
            })
            .cloned()
            .map_err(|e| {
                e.into_resolution(
                    &self.plugin_id,
                    format!("Could not resolve the traits handler of plugin '{}'.", self.plugin_id),
                )
            })
    }

    pub fn resolve_traits(&self) -> Result<Arc<PluginTraits>> {
        let object = self.resolve_traits_object()?;
        object.downcast::<PluginTraits>().ok_or_else(|| {
            ExtensibilityError::construction(format!(
                "Traits of plugin '{}' have unexpected type '{}'.",
                self.plugin_id,
                object.type_name()
            ))
        })
    }

    fn resolve_traits_object(&self) -> Result<Object> {
        self.resolve_traits_handler()
            .and_then(|handler| handler.activate())
            .map_err(|e| {
                e.into_construction(format!("Could not resolve traits of plugin '{}'.", self.plugin_id))
            })
    }

    fn dependency_resolver(&self, inject_traits: bool) -> Arc<dyn ObjectDependencyResolver> {
        Arc::new(DescriptorDependencyResolver {
            inner: default_resolver(&self.registry, &self.self_ref),
            scope: Scope::Plugin(self.self_ref.clone()),
            inject_traits,
        })
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("plugin_id", &self.plugin_id)
            .field("plugin_type_name", &self.plugin_type_name)
            .field("base_directory", &self.base_directory)
            .field("disabled_reason", &self.disabled_reason())
            .finish()
    }
}

pub struct ServiceDescriptor {
    registry: Weak<RegistryInner>,
    plugin: Arc<PluginDescriptor>,
    service_id: String,
    service_type_name: TypeName,
    default_component_type_name: Option<TypeName>,
    traits_handler_factory: Arc<dyn HandlerFactory>,
    service_type: OnceCell<Arc<TypeInfo>>,
    traits_type: OnceCell<Arc<TypeInfo>>,
}

pub(crate) struct ServiceDescriptorParts {
    pub plugin: Arc<PluginDescriptor>,
    pub service_id: String,
    pub service_type_name: TypeName,
    pub default_component_type_name: Option<TypeName>,
    pub traits_handler_factory: Arc<dyn HandlerFactory>,
}

impl ServiceDescriptor {
    pub(crate) fn new(registry: Weak<RegistryInner>, parts: ServiceDescriptorParts) -> Arc<Self> {
        Arc::new(ServiceDescriptor {
            registry,
            plugin: parts.plugin,
            service_id: parts.service_id,
            service_type_name: parts.service_type_name,
            default_component_type_name: parts.default_component_type_name,
            traits_handler_factory: parts.traits_handler_factory,
            service_type: OnceCell::new(),
            traits_type: OnceCell::new(),
        })
    }

    pub fn plugin(&self) -> &Arc<PluginDescriptor> {
        &self.plugin
    }

    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    pub fn service_type_name(&self) -> &TypeName {
        &self.service_type_name
    }

    pub fn default_component_type_name(&self) -> Option<&TypeName> {
        self.default_component_type_name.as_ref()
    }

    pub fn traits_handler_factory(&self) -> &Arc<dyn HandlerFactory> {
        &self.traits_handler_factory
    }

    pub(crate) fn belongs_to(&self, registry: &Weak<RegistryInner>) -> bool {
        Weak::ptr_eq(&self.registry, registry)
    }

    pub fn is_disabled(&self) -> bool {
        self.plugin.is_disabled()
    }

    pub fn disabled_reason(&self) -> Option<String> {
        self.plugin.disabled_reason().map(|reason| {
            format!("The plugin that provides this service was disabled.  Reason: {}", reason)
        })
    }

    pub fn resolve_service_type(&self) -> Result<Arc<TypeInfo>> {
        self.service_type
            .get_or_try_init(|| upgrade_registry(&self.registry)?.types.resolve(&self.service_type_name))
            .cloned()
            .map_err(|e| {
                e.into_resolution(
                    &self.service_id,
                    format!("Could not resolve the service type of service '{}'.", self.service_id),
                )
            })
    }

    /// The traits type declared by the contract, or the default traits type.
    pub fn resolve_traits_type(&self) -> Result<Arc<TypeInfo>> {
        self.traits_type
            .get_or_try_init(|| {
                let service_type = self.resolve_service_type()?;
                let traits_name = service_type
                    .traits_type()
                    .cloned()
                    .unwrap_or_else(|| TypeName::new(TRAITS_TYPE));
                upgrade_registry(&self.registry)?.types.resolve(&traits_name)
            })
            .cloned()
            .map_err(|e| {
                e.into_resolution(
                    &self.service_id,
                    format!("Could not resolve the traits type of service '{}'.", self.service_id),
                )
            })
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("service_id", &self.service_id)
            .field("plugin_id", &self.plugin.plugin_id())
            .field("service_type_name", &self.service_type_name)
            .finish()
    }
}

pub struct ComponentDescriptor {
    self_ref: Weak<ComponentDescriptor>,
    registry: Weak<RegistryInner>,
    plugin: Arc<PluginDescriptor>,
    service: Arc<ServiceDescriptor>,
    component_id: String,
    component_type_name: TypeName,
    component_handler_factory: Arc<dyn HandlerFactory>,
    component_properties: PropertySet,
    traits_properties: PropertySet,
    component_type: OnceCell<Arc<TypeInfo>>,
    component_handler: OnceCell<Arc<dyn Handler>>,
    traits_handler: OnceCell<Arc<dyn Handler>>,
}

pub(crate) struct ComponentDescriptorParts {
    pub plugin: Arc<PluginDescriptor>,
    pub service: Arc<ServiceDescriptor>,
    pub component_id: String,
    pub component_type_name: TypeName,
    pub component_handler_factory: Arc<dyn HandlerFactory>,
    pub component_properties: PropertySet,
    pub traits_properties: PropertySet,
}

impl ComponentDescriptor {
    pub(crate) fn new(registry: Weak<RegistryInner>, parts: ComponentDescriptorParts) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| ComponentDescriptor {
            self_ref: self_ref.clone(),
            registry,
            plugin: parts.plugin,
            service: parts.service,
            component_id: parts.component_id,
            component_type_name: parts.component_type_name,
            component_handler_factory: parts.component_handler_factory,
            component_properties: parts.component_properties,
            traits_properties: parts.traits_properties,
            component_type: OnceCell::new(),
            component_handler: OnceCell::new(),
            traits_handler: OnceCell::new(),
        })
    }

    pub fn plugin(&self) -> &Arc<PluginDescriptor> {
        &self.plugin
    }

    pub fn service(&self) -> &Arc<ServiceDescriptor> {
        &self.service
    }

    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    pub fn component_type_name(&self) -> &TypeName {
        &self.component_type_name
    }

    pub fn component_handler_factory(&self) -> &Arc<dyn HandlerFactory> {
        &self.component_handler_factory
    }

    pub fn component_properties(&self) -> &PropertySet {
        &self.component_properties
    }

    pub fn traits_properties(&self) -> &PropertySet {
        &self.traits_properties
    }

    pub fn is_disabled(&self) -> bool {
        self.plugin.is_disabled() || self.service.is_disabled()
    }

    pub fn disabled_reason(&self) -> Option<String> {
        if let Some(reason) = self.plugin.disabled_reason() {
            return Some(format!(
                "The plugin that provides this component was disabled.  Reason: {}",
                reason
            ));
        }
        self.service.disabled_reason().map(|reason| {
            format!("The service implemented by this component was disabled.  Reason: {}", reason)
        })
    }

    pub fn resolve_component_type(&self) -> Result<Arc<TypeInfo>> {
        self.component_type
            .get_or_try_init(|| {
                upgrade_registry(&self.registry)?.types.resolve(&self.component_type_name)
            })
            .cloned()
            .map_err(|e| {
                e.into_resolution(
                    &self.component_id,
                    format!(
                        "Could not resolve the component type of component '{}'.",
                        self.component_id
                    ),
                )
            })
    }

    pub fn resolve_component_handler(&self) -> Result<Arc<dyn Handler>> {
        self.component_handler
            .get_or_try_init(|| {
                let component_type = self.resolve_component_type()?;
                self.component_handler_factory.create_handler(
                    self.dependency_resolver(true),
                    self.service.service_type_name(),
                    component_type,
                    &self.component_properties,
                )
            })
            .cloned()
            .map_err(|e| {
                e.into_resolution(
                    &self.component_id,
                    format!(
                        "Could not resolve the component handler of component '{}'.",
                        self.component_id
                    ),
                )
            })
    }

    /// The component instance, viewed as its service contract.
    pub fn resolve_component(&self) -> Result<Object> {
        self.resolve_component_handler()
            .and_then(|handler| handler.activate())
            .map_err(|e| {
                e.into_construction(format!(
                    "Could not resolve instance of component '{}'.",
                    self.component_id
                ))
            })
    }

    pub fn resolve_traits_handler(&self) -> Result<Arc<dyn Handler>> {
        self.traits_handler
            .get_or_try_init(|| {
                let traits_type = self.service.resolve_traits_type()?;
                let traits_name = traits_type.name().clone();
                self.service.traits_handler_factory().create_handler(
                    self.dependency_resolver(false),
                    &traits_name,
                    traits_type,
                    &self.traits_properties,
                )
            })
            .cloned()
            .map_err(|e| {
                e.into_resolution(
                    &self.component_id,
                    format!(
                        "Could not resolve the traits handler of component '{}'.",
                        self.component_id
                    ),
                )
            })
    }

    pub fn resolve_traits(&self) -> Result<Object> {
        self.resolve_traits_handler()
            .and_then(|handler| handler.activate())
            .map_err(|e| {
                e.into_construction(format!(
                    "Could not resolve traits of component '{}'.",
                    self.component_id
                ))
            })
    }

    fn dependency_resolver(&self, inject_traits: bool) -> Arc<dyn ObjectDependencyResolver> {
        Arc::new(DescriptorDependencyResolver {
            inner: default_resolver(&self.registry, &Arc::downgrade(&self.plugin)),
            scope: Scope::Component(self.self_ref.clone()),
            inject_traits,
        })
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("component_id", &self.component_id)
            .field("service_id", &self.service.service_id())
            .field("component_type_name", &self.component_type_name)
            .field("disabled_reason", &self.disabled_reason())
            .finish()
    }
}

fn default_resolver(
    registry: &Weak<RegistryInner>,
    plugin: &Weak<PluginDescriptor>,
) -> DefaultObjectDependencyResolver {
    DefaultObjectDependencyResolver::new(
        Arc::new(RegistryServiceLocator::new(registry.clone())),
        Arc::new(PluginResourceLocator::new(plugin.clone(), registry.clone())),
    )
}

enum Scope {
    Plugin(Weak<PluginDescriptor>),
    Component(Weak<ComponentDescriptor>),
}

/// Injects the descriptor being activated, and its traits, before falling
/// back to the default resolution rules.
struct DescriptorDependencyResolver {
    inner: DefaultObjectDependencyResolver,
    scope: Scope,
    inject_traits: bool,
}

impl DescriptorDependencyResolver {
    fn plugin(&self) -> Result<Arc<PluginDescriptor>> {
        match &self.scope {
            Scope::Plugin(plugin) => upgrade(plugin),
            Scope::Component(component) => Ok(upgrade(component)?.plugin.clone()),
        }
    }

    fn traits(&self) -> Result<Object> {
        match &self.scope {
            Scope::Plugin(plugin) => upgrade(plugin)?.resolve_traits_object(),
            Scope::Component(component) => upgrade(component)?.resolve_traits(),
        }
    }
}

impl ObjectDependencyResolver for DescriptorDependencyResolver {
    fn resolve_dependency(
        &self,
        name: &str,
        kind: &ValueKind,
        configuration: Option<&str>,
    ) -> Result<DependencyResolution> {
        if configuration.is_none() {
            match (kind, &self.scope) {
                (ValueKind::PluginDescriptor, _) => {
                    return Ok(DependencyResolution::Satisfied(Value::Plugin(self.plugin()?)));
                }
                (ValueKind::ComponentDescriptor, Scope::Component(component)) => {
                    return Ok(DependencyResolution::Satisfied(Value::Component(upgrade(component)?)));
                }
                (ValueKind::Traits, _) if self.inject_traits => {
                    return Ok(DependencyResolution::Satisfied(Value::Object(self.traits()?)));
                }
                _ => {}
            }
        }
        self.inner.resolve_dependency(name, kind, configuration)
    }
}
