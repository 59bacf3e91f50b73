//! The registry's lock-guarded index structure.
use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::extensibility::descriptor::{ComponentDescriptor, PluginDescriptor, ServiceDescriptor};
use crate::extensibility::types::TypeName;

/// A value guarded by a reader/writer lock, accessed only through
/// read and write transactions.
#[derive(Debug, Default)]
pub struct DataBox<T> {
    inner: RwLock<T>,
}

impl<T> DataBox<T> {
    pub fn new(value: T) -> Self {
        DataBox {
            inner: RwLock::new(value),
        }
    }

    /// Runs `reader` under a shared lock.
    pub fn read<R>(&self, reader: impl FnOnce(&T) -> R) -> R {
        reader(&self.inner.read())
    }

    /// Runs `writer` under an exclusive lock.
    pub fn write<R>(&self, writer: impl FnOnce(&mut T) -> R) -> R {
        writer(&mut self.inner.write())
    }
}

/// Descriptor indices. Iteration follows registration order.
#[derive(Debug, Default)]
pub struct RegistryData {
    pub(crate) plugins: IndexMap<String, Arc<PluginDescriptor>>,
    pub(crate) services: IndexMap<String, Arc<ServiceDescriptor>>,
    pub(crate) services_by_type_name: HashMap<String, Arc<ServiceDescriptor>>,
    pub(crate) components: IndexMap<String, Arc<ComponentDescriptor>>,
    pub(crate) components_by_service_id: HashMap<String, Vec<Arc<ComponentDescriptor>>>,
}

impl RegistryData {
    pub fn plugin(&self, plugin_id: &str) -> Option<&Arc<PluginDescriptor>> {
        self.plugins.get(plugin_id)
    }

    pub fn service(&self, service_id: &str) -> Option<&Arc<ServiceDescriptor>> {
        self.services.get(service_id)
    }

    pub fn component(&self, component_id: &str) -> Option<&Arc<ComponentDescriptor>> {
        self.components.get(component_id)
    }

    /// Finds a service by its full type identifier, or by its short form.
    pub fn service_by_type_name(&self, type_name: &TypeName) -> Option<&Arc<ServiceDescriptor>> {
        self.services_by_type_name
            .get(type_name.as_str())
            .or_else(|| self.services_by_type_name.get(type_name.short_name()))
    }

    pub fn components_by_service_id(&self, service_id: &str) -> &[Arc<ComponentDescriptor>] {
        self.components_by_service_id
            .get(service_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub(crate) fn add_plugin(&mut self, plugin: Arc<PluginDescriptor>) {
        self.plugins.insert(plugin.plugin_id().to_string(), plugin);
    }

    pub(crate) fn add_service(&mut self, service: Arc<ServiceDescriptor>) {
        let type_name = service.service_type_name().clone();
        self.services_by_type_name
            .insert(type_name.as_str().to_string(), service.clone());
        if type_name.is_qualified() {
            self.services_by_type_name
                .entry(type_name.short_name().to_string())
                .or_insert_with(|| service.clone());
        }
        self.services.insert(service.service_id().to_string(), service);
    }

    pub(crate) fn add_component(&mut self, component: Arc<ComponentDescriptor>) {
        self.components_by_service_id
            .entry(component.service().service_id().to_string())
            .or_default()
            .push(component.clone());
        self.components
            .insert(component.component_id().to_string(), component);
    }
}
