use std::path::PathBuf;
use std::sync::{Arc, Weak};

use log::debug;

use crate::extensibility::data_store::{DataBox, RegistryData};
use crate::extensibility::descriptor::{
    ComponentDescriptor, ComponentDescriptorParts, ModuleReference, PluginDescriptor,
    PluginDescriptorParts, ServiceDescriptor, ServiceDescriptorParts,
};
use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::handle::ComponentHandle;
use crate::extensibility::handler::{HandlerFactory, SingletonHandlerFactory};
use crate::extensibility::locator::{
    RegistryResourceLocator, RegistryServiceLocator, ResourceLocator, ServiceLocator,
};
use crate::extensibility::property_set::PropertySet;
use crate::extensibility::types::{TypeName, TypeRegistry};

/// Arguments for [`Registry::register_plugin`].
#[derive(Clone)]
pub struct PluginRegistration {
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

impl PluginRegistration {
    pub fn new(
        plugin_id: impl Into<String>,
        plugin_type_name: impl Into<TypeName>,
        base_directory: impl Into<PathBuf>,
    ) -> Self {
        PluginRegistration {
            plugin_id: plugin_id.into(),
            plugin_type_name: plugin_type_name.into(),
            base_directory: base_directory.into(),
            plugin_properties: PropertySet::new(),
            traits_properties: PropertySet::new(),
            plugin_handler_factory: Arc::new(SingletonHandlerFactory),
            modules: Vec::new(),
            plugin_dependencies: Vec::new(),
            probing_paths: Vec::new(),
        }
    }
}

/// Arguments for [`Registry::register_service`].
#[derive(Clone)]
pub struct ServiceRegistration {
    pub plugin: Arc<PluginDescriptor>,
    pub service_id: String,
    pub service_type_name: TypeName,
    pub default_component_type_name: Option<TypeName>,
    pub traits_handler_factory: Arc<dyn HandlerFactory>,
}

impl ServiceRegistration {
    pub fn new(
        plugin: Arc<PluginDescriptor>,
        service_id: impl Into<String>,
        service_type_name: impl Into<TypeName>,
    ) -> Self {
        ServiceRegistration {
            plugin,
            service_id: service_id.into(),
            service_type_name: service_type_name.into(),
            default_component_type_name: None,
            traits_handler_factory: Arc::new(SingletonHandlerFactory),
        }
    }
}

/// Arguments for [`Registry::register_component`].
#[derive(Clone)]
pub struct ComponentRegistration {
    pub plugin: Arc<PluginDescriptor>,
    pub service: Arc<ServiceDescriptor>,
    pub component_id: String,
    /// Falls back to the service's default component type when absent.
    pub component_type_name: Option<TypeName>,
    pub component_handler_factory: Arc<dyn HandlerFactory>,
    pub component_properties: PropertySet,
    pub traits_properties: PropertySet,
}

impl ComponentRegistration {
    pub fn new(
        plugin: Arc<PluginDescriptor>,
        service: Arc<ServiceDescriptor>,
        component_id: impl Into<String>,
        component_type_name: Option<TypeName>,
    ) -> Self {
        ComponentRegistration {
            plugin,
            service,
            component_id: component_id.into(),
            component_type_name,
            component_handler_factory: Arc::new(SingletonHandlerFactory),
            component_properties: PropertySet::new(),
            traits_properties: PropertySet::new(),
        }
    }
}

pub(crate) struct RegistryInner {
    pub(crate) data: DataBox<RegistryData>,
    pub(crate) types: Arc<TypeRegistry>,
}

impl RegistryInner {
    /// The service registered for `service_type` and its components,
    /// snapshotted under one read transaction.
    fn candidates(
        &self,
        service_type: &TypeName,
    ) -> Option<(Arc<ServiceDescriptor>, Vec<Arc<ComponentDescriptor>>)> {
        self.data.read(|data| {
            data.service_by_type_name(service_type).map(|service| {
                let components = data.components_by_service_id(service.service_id()).to_vec();
                (service.clone(), components)
            })
        })
    }

    pub(crate) fn resolve_handle(&self, service_type: &TypeName) -> Result<ComponentHandle> {
        let (service, candidates) = self.candidates(service_type).ok_or_else(|| {
            ExtensibilityError::resolution(
                service_type.as_str(),
                format!(
                    "Could not resolve component for service type '{}' because there does not appear to be any services registered with that type.",
                    service_type
                ),
            )
        })?;
        let mut enabled: Vec<_> = candidates.iter().filter(|c| !c.is_disabled()).cloned().collect();
        if enabled.len() > 1 {
            return Err(ExtensibilityError::AmbiguousResolution {
                service_type: service_type.to_string(),
                component_ids: enabled.iter().map(|c| c.component_id().to_string()).collect(),
            });
        }
        if let Some(component) = enabled.pop() {
            return Ok(ComponentHandle::new(component));
        }
        match candidates.first() {
            Some(disabled) => Err(ExtensibilityError::DisabledComponent {
                id: disabled.component_id().to_string(),
                reason: disabled.disabled_reason().unwrap_or_default(),
            }),
            None => Err(ExtensibilityError::resolution(
                service.service_id(),
                format!(
                    "Could not resolve component for service type '{}' because there are no components registered for service '{}'.",
                    service_type,
                    service.service_id()
                ),
            )),
        }
    }

    pub(crate) fn resolve_all_handles(&self, service_type: &TypeName) -> Vec<ComponentHandle> {
        self.candidates(service_type)
            .map(|(_, candidates)| {
                candidates
                    .into_iter()
                    .filter(|c| !c.is_disabled())
                    .map(ComponentHandle::new)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn resolve_handle_by_component_id(&self, component_id: &str) -> Result<ComponentHandle> {
        let component = self
            .data
            .read(|data| data.component(component_id).cloned())
            .ok_or_else(|| {
                ExtensibilityError::resolution(
                    component_id,
                    format!("Could not resolve component with id '{}' because it does not appear to be registered.", component_id),
                )
            })?;
        match component.disabled_reason() {
            Some(reason) => Err(ExtensibilityError::DisabledComponent {
                id: component_id.to_string(),
                reason,
            }),
            None => Ok(ComponentHandle::new(component)),
        }
    }

    pub(crate) fn has_service(&self, service_type: &TypeName) -> bool {
        self.data.read(|data| data.service_by_type_name(service_type).is_some())
    }

    pub(crate) fn enabled_component_count(&self, service_type: &TypeName) -> usize {
        self.candidates(service_type)
            .map(|(_, candidates)| candidates.iter().filter(|c| !c.is_disabled()).count())
            .unwrap_or(0)
    }

    pub(crate) fn has_component(&self, component_id: &str) -> bool {
        self.data
            .read(|data| data.component(component_id).cloned())
            .is_some_and(|component| !component.is_disabled())
    }
}

/// The registry of plugins, services and components.
///
/// Cloning a `Registry` yields another handle to the same registry.
/// Registration validates its arguments inside a single write transaction,
/// and resolution snapshots descriptors under a read transaction before
/// activating anything.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<RegistryInner>,
}

impl Registry {
    pub fn new(types: Arc<TypeRegistry>) -> Self {
        Registry {
            inner: Arc::new(RegistryInner {
                data: DataBox::new(RegistryData::default()),
                types,
            }),
        }
    }

    fn weak(&self) -> Weak<RegistryInner> {
        Arc::downgrade(&self.inner)
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.inner.types
    }

    pub fn register_plugin(&self, registration: PluginRegistration) -> Result<Arc<PluginDescriptor>> {
        if registration.plugin_id.trim().is_empty() {
            return Err(ExtensibilityError::Validation("The plugin id must not be empty.".into()));
        }
        let weak = self.weak();
        let plugin = self.inner.data.write(|data| {
            if data.plugins.contains_key(&registration.plugin_id) {
                return Err(ExtensibilityError::DuplicateId {
                    kind: "plugin",
                    id: registration.plugin_id.clone(),
                });
            }
            for dependency in &registration.plugin_dependencies {
                let known = data
                    .plugin(dependency.plugin_id())
                    .is_some_and(|known| Arc::ptr_eq(known, dependency));
                if !known || !dependency.belongs_to(&weak) {
                    return Err(ExtensibilityError::ForeignDescriptor {
                        kind: "plugin",
                        id: dependency.plugin_id().to_string(),
                    });
                }
            }
            let plugin = PluginDescriptor::new(
                weak.clone(),
                PluginDescriptorParts {
                    plugin_id: registration.plugin_id,
                    plugin_type_name: registration.plugin_type_name,
                    base_directory: registration.base_directory,
                    plugin_properties: registration.plugin_properties,
                    traits_properties: registration.traits_properties,
                    plugin_handler_factory: registration.plugin_handler_factory,
                    modules: registration.modules,
                    plugin_dependencies: registration.plugin_dependencies,
                    probing_paths: registration.probing_paths,
                },
            );
            data.add_plugin(plugin.clone());
            Ok(plugin)
        })?;
        debug!("Registered plugin '{}'", plugin.plugin_id());
        Ok(plugin)
    }

    pub fn register_service(&self, registration: ServiceRegistration) -> Result<Arc<ServiceDescriptor>> {
        if registration.service_id.trim().is_empty() {
            return Err(ExtensibilityError::Validation("The service id must not be empty.".into()));
        }
        if registration.service_type_name.as_str().is_empty() {
            return Err(ExtensibilityError::Validation(format!(
                "The service type name of service '{}' must not be empty.",
                registration.service_id
            )));
        }
        let weak = self.weak();
        let service = self.inner.data.write(|data| {
            ensure_plugin_is_ours(data, &weak, &registration.plugin)?;
            if data.services.contains_key(&registration.service_id) {
                return Err(ExtensibilityError::DuplicateId {
                    kind: "service",
                    id: registration.service_id.clone(),
                });
            }
            // Short and full names are two keys for one contract.
            if let Some(existing) = data
                .service_by_type_name(&registration.service_type_name)
                .filter(|existing| existing.service_type_name().matches(&registration.service_type_name))
            {
                return Err(ExtensibilityError::Validation(format!(
                    "There is already a service registered with type '{}': service '{}' of type '{}'.",
                    registration.service_type_name,
                    existing.service_id(),
                    existing.service_type_name()
                )));
            }
            let service = ServiceDescriptor::new(
                weak.clone(),
                ServiceDescriptorParts {
                    plugin: registration.plugin,
                    service_id: registration.service_id,
                    service_type_name: registration.service_type_name,
                    default_component_type_name: registration.default_component_type_name,
                    traits_handler_factory: registration.traits_handler_factory,
                },
            );
            data.add_service(service.clone());
            Ok(service)
        })?;
        debug!(
            "Registered service '{}' of plugin '{}'",
            service.service_id(),
            service.plugin().plugin_id()
        );
        Ok(service)
    }

    pub fn register_component(&self, registration: ComponentRegistration) -> Result<Arc<ComponentDescriptor>> {
        if registration.component_id.trim().is_empty() {
            return Err(ExtensibilityError::Validation("The component id must not be empty.".into()));
        }
        let weak = self.weak();
        let component = self.inner.data.write(|data| {
            ensure_plugin_is_ours(data, &weak, &registration.plugin)?;
            let service = &registration.service;
            let known_service = data
                .service(service.service_id())
                .is_some_and(|known| Arc::ptr_eq(known, service));
            if !known_service || !service.belongs_to(&weak) {
                return Err(ExtensibilityError::ForeignDescriptor {
                    kind: "service",
                    id: service.service_id().to_string(),
                });
            }
            if data.components.contains_key(&registration.component_id) {
                return Err(ExtensibilityError::DuplicateId {
                    kind: "component",
                    id: registration.component_id.clone(),
                });
            }
            let component_type_name = registration
                .component_type_name
                .or_else(|| service.default_component_type_name().cloned())
                .ok_or_else(|| {
                    ExtensibilityError::Validation(format!(
                        "The component type name of component '{}' must be specified because service '{}' does not declare a default component type.",
                        registration.component_id,
                        service.service_id()
                    ))
                })?;
            let plugin = &registration.plugin;
            if !Arc::ptr_eq(service.plugin(), plugin) && !plugin.depends_on(service.plugin()) {
                return Err(ExtensibilityError::Validation(format!(
                    "Component '{}' of plugin '{}' implements service '{}' of plugin '{}' but plugin '{}' does not depend on plugin '{}'.",
                    registration.component_id,
                    plugin.plugin_id(),
                    service.service_id(),
                    service.plugin().plugin_id(),
                    plugin.plugin_id(),
                    service.plugin().plugin_id()
                )));
            }
            let component = ComponentDescriptor::new(
                weak.clone(),
                ComponentDescriptorParts {
                    plugin: registration.plugin.clone(),
                    service: registration.service.clone(),
                    component_id: registration.component_id,
                    component_type_name,
                    component_handler_factory: registration.component_handler_factory,
                    component_properties: registration.component_properties,
                    traits_properties: registration.traits_properties,
                },
            );
            data.add_component(component.clone());
            Ok(component)
        })?;
        debug!(
            "Registered component '{}' of service '{}'",
            component.component_id(),
            component.service().service_id()
        );
        Ok(component)
    }

    pub fn plugins(&self) -> Plugins<'_> {
        Plugins { registry: &self.inner }
    }

    pub fn services(&self) -> Services<'_> {
        Services { registry: &self.inner }
    }

    pub fn components(&self) -> Components<'_> {
        Components { registry: &self.inner }
    }

    pub fn service_locator(&self) -> Arc<dyn ServiceLocator> {
        Arc::new(RegistryServiceLocator::new(self.weak()))
    }

    pub fn resource_locator(&self) -> Arc<dyn ResourceLocator> {
        Arc::new(RegistryResourceLocator::new(self.weak()))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new(Arc::new(TypeRegistry::new()))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.data.read(|data| {
            f.debug_struct("Registry")
                .field("plugins", &data.plugins.len())
                .field("services", &data.services.len())
                .field("components", &data.components.len())
                .finish()
        })
    }
}

fn ensure_plugin_is_ours(
    data: &RegistryData,
    registry: &Weak<RegistryInner>,
    plugin: &Arc<PluginDescriptor>,
) -> Result<()> {
    let known = data
        .plugin(plugin.plugin_id())
        .is_some_and(|known| Arc::ptr_eq(known, plugin));
    if known && plugin.belongs_to(registry) {
        Ok(())
    } else {
        Err(ExtensibilityError::ForeignDescriptor {
            kind: "plugin",
            id: plugin.plugin_id().to_string(),
        })
    }
}

impl ServiceLocator for Registry {
    fn type_registry(&self) -> Result<Arc<TypeRegistry>> {
        Ok(self.inner.types.clone())
    }

    fn resolve_handle_by_type_name(&self, service_type: &TypeName) -> Result<ComponentHandle> {
        self.inner.resolve_handle(service_type)
    }

    fn resolve_all_handles_by_type_name(&self, service_type: &TypeName) -> Result<Vec<ComponentHandle>> {
        Ok(self.inner.resolve_all_handles(service_type))
    }

    fn resolve_handle_by_component_id(&self, component_id: &str) -> Result<ComponentHandle> {
        self.inner.resolve_handle_by_component_id(component_id)
    }

    fn has_service(&self, service_type: &TypeName) -> bool {
        self.inner.has_service(service_type)
    }

    fn can_resolve(&self, service_type: &TypeName) -> bool {
        self.inner.enabled_component_count(service_type) == 1
    }

    fn can_resolve_all(&self, service_type: &TypeName) -> bool {
        self.inner.enabled_component_count(service_type) > 0
    }

    fn has_component(&self, component_id: &str) -> bool {
        self.inner.has_component(component_id)
    }
}

/// Plugin lookup and enumeration.
pub struct Plugins<'a> {
    registry: &'a RegistryInner,
}

impl Plugins<'_> {
    pub fn get(&self, plugin_id: &str) -> Option<Arc<PluginDescriptor>> {
        self.registry.data.read(|data| data.plugin(plugin_id).cloned())
    }

    pub fn all(&self) -> Vec<Arc<PluginDescriptor>> {
        self.registry.data.read(|data| data.plugins.values().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.registry.data.read(|data| data.plugins.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Service lookup and enumeration.
pub struct Services<'a> {
    registry: &'a RegistryInner,
}

impl Services<'_> {
    pub fn get(&self, service_id: &str) -> Option<Arc<ServiceDescriptor>> {
        self.registry.data.read(|data| data.service(service_id).cloned())
    }

    pub fn get_by_service_type_name(&self, service_type: &TypeName) -> Option<Arc<ServiceDescriptor>> {
        self.registry
            .data
            .read(|data| data.service_by_type_name(service_type).cloned())
    }

    /// Looks up the service declared for the registered contract `C`.
    pub fn get_by_service_type<C: ?Sized + 'static>(&self) -> Option<Arc<ServiceDescriptor>> {
        let contract = self.registry.types.contract_name_of::<C>()?;
        self.get_by_service_type_name(&contract)
    }

    pub fn all(&self) -> Vec<Arc<ServiceDescriptor>> {
        self.registry.data.read(|data| data.services.values().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.registry.data.read(|data| data.services.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Component lookup and enumeration.
pub struct Components<'a> {
    registry: &'a RegistryInner,
}

impl Components<'_> {
    pub fn get(&self, component_id: &str) -> Option<Arc<ComponentDescriptor>> {
        self.registry.data.read(|data| data.component(component_id).cloned())
    }

    pub fn find_by_service_id(&self, service_id: &str) -> Vec<Arc<ComponentDescriptor>> {
        self.registry
            .data
            .read(|data| data.components_by_service_id(service_id).to_vec())
    }

    pub fn find_by_service_type_name(&self, service_type: &TypeName) -> Vec<Arc<ComponentDescriptor>> {
        self.registry.data.read(|data| {
            data.service_by_type_name(service_type)
                .map(|service| data.components_by_service_id(service.service_id()).to_vec())
                .unwrap_or_default()
        })
    }

    pub fn find_by_service_type<C: ?Sized + 'static>(&self) -> Vec<Arc<ComponentDescriptor>> {
        match self.registry.types.contract_name_of::<C>() {
            Some(contract) => self.find_by_service_type_name(&contract),
            None => Vec::new(),
        }
    }

    pub fn all(&self) -> Vec<Arc<ComponentDescriptor>> {
        self.registry.data.read(|data| data.components.values().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.registry.data.read(|data| data.components.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
