//! Dependency-ordered application of plugin descriptors to a registry.
//!
//! [`PluginCatalog::apply_to`] sorts the collected plugins with Kahn's
//! algorithm and registers them in three passes: every plugin first, then
//! every service, then every component. Problems that only affect one
//! plugin (a missing dependency, a module that cannot be found) disable
//! that plugin instead of failing the whole batch.
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, error, warn};

use crate::extensibility::descriptor::{ComponentDescriptor, ModuleReference, PluginDescriptor, ServiceDescriptor};
use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::manifest::PluginManifest;
use crate::extensibility::registry::{
    ComponentRegistration, PluginRegistration, Registry, ServiceRegistration,
};
use crate::extensibility::search_rules;
use crate::extensibility::traits::DEFAULT_PLUGIN_TYPE;
use crate::extensibility::types::TypeName;

/// The registry operations the catalog relies on.
pub trait Registrar {
    fn find_plugin(&self, plugin_id: &str) -> Option<Arc<PluginDescriptor>>;
    fn find_service(&self, service_id: &str) -> Option<Arc<ServiceDescriptor>>;
    fn register_plugin(&self, registration: PluginRegistration) -> Result<Arc<PluginDescriptor>>;
    fn register_service(&self, registration: ServiceRegistration) -> Result<Arc<ServiceDescriptor>>;
    fn register_component(&self, registration: ComponentRegistration) -> Result<Arc<ComponentDescriptor>>;
}

impl Registrar for Registry {
    fn find_plugin(&self, plugin_id: &str) -> Option<Arc<PluginDescriptor>> {
        self.plugins().get(plugin_id)
    }

    fn find_service(&self, service_id: &str) -> Option<Arc<ServiceDescriptor>> {
        self.services().get(service_id)
    }

    fn register_plugin(&self, registration: PluginRegistration) -> Result<Arc<PluginDescriptor>> {
        Registry::register_plugin(self, registration)
    }

    fn register_service(&self, registration: ServiceRegistration) -> Result<Arc<ServiceDescriptor>> {
        Registry::register_service(self, registration)
    }

    fn register_component(&self, registration: ComponentRegistration) -> Result<Arc<ComponentDescriptor>> {
        Registry::register_component(self, registration)
    }
}

/// A plugin whose registration was refused.
#[derive(Debug)]
pub struct RejectedPlugin {
    pub plugin_id: String,
    pub error: ExtensibilityError,
}

/// Outcome of [`PluginCatalog::apply_to`].
#[derive(Debug, Default)]
pub struct CatalogReport {
    /// Registered plugins in registration order, including disabled ones.
    pub registered: Vec<Arc<PluginDescriptor>>,
    pub rejected: Vec<RejectedPlugin>,
}

impl CatalogReport {
    pub fn disabled(&self) -> impl Iterator<Item = &Arc<PluginDescriptor>> {
        self.registered.iter().filter(|plugin| plugin.is_disabled())
    }
}

#[derive(Debug, Default, Clone)]
pub struct PluginCatalog {
    plugins: Vec<(PluginManifest, PathBuf)>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_plugin(&mut self, plugin: PluginManifest, base_directory: impl Into<PathBuf>) {
        self.plugins.push((plugin, base_directory.into()));
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn plugins(&self) -> impl Iterator<Item = (&PluginManifest, &Path)> {
        self.plugins.iter().map(|(plugin, dir)| (plugin, dir.as_path()))
    }

    pub fn apply_to(&self, registrar: &dyn Registrar) -> Result<CatalogReport> {
        let order = self.topological_order()?;
        let mut report = CatalogReport::default();
        let mut applied: Vec<(&PluginManifest, Arc<PluginDescriptor>)> = Vec::new();

        for index in order {
            let (plugin, base_directory) = &self.plugins[index];
            match register_plugin(registrar, plugin, base_directory) {
                Ok(descriptor) => {
                    report.registered.push(descriptor.clone());
                    applied.push((plugin, descriptor));
                }
                Err(e) => {
                    error!("Could not register plugin '{}': {}", plugin.plugin_id, e);
                    report.rejected.push(RejectedPlugin {
                        plugin_id: plugin.plugin_id.clone(),
                        error: e,
                    });
                }
            }
        }

        for (plugin, descriptor) in &applied {
            for service in &plugin.services {
                let mut registration =
                    ServiceRegistration::new(descriptor.clone(), &service.service_id, service.service_type.as_str());
                registration.default_component_type_name =
                    service.default_component_type.as_deref().map(TypeName::new);
                registrar.register_service(registration).map_err(|e| {
                    ExtensibilityError::registration(
                        format!(
                            "Could not register service '{}' of plugin '{}'.",
                            service.service_id, plugin.plugin_id
                        ),
                        e,
                    )
                })?;
            }
        }

        for (plugin, descriptor) in &applied {
            for component in &plugin.components {
                let service = registrar.find_service(&component.service_id).ok_or_else(|| {
                    ExtensibilityError::Validation(format!(
                        "Could not register component '{}' of plugin '{}' because it implements service '{}' which was not found in the registry.",
                        component.component_id, plugin.plugin_id, component.service_id
                    ))
                })?;
                let mut registration = ComponentRegistration::new(
                    descriptor.clone(),
                    service,
                    &component.component_id,
                    component.component_type.as_deref().map(TypeName::new),
                );
                registration.component_properties = component.parameters.clone();
                registration.traits_properties = component.traits.clone();
                registrar.register_component(registration).map_err(|e| {
                    ExtensibilityError::registration(
                        format!(
                            "Could not register component '{}' of plugin '{}'.",
                            component.component_id, plugin.plugin_id
                        ),
                        e,
                    )
                })?;
            }
        }

        debug!(
            "Applied plugin catalog: {} registered, {} rejected",
            report.registered.len(),
            report.rejected.len()
        );
        Ok(report)
    }

    /// Kahn's algorithm over dependency ids present in this catalog.
    fn topological_order(&self) -> Result<Vec<usize>> {
        let mut index_by_id: HashMap<&str, usize> = HashMap::new();
        for (index, (plugin, _)) in self.plugins.iter().enumerate() {
            index_by_id.entry(plugin.plugin_id.as_str()).or_insert(index);
        }

        let count = self.plugins.len();
        let mut out_degree = vec![0usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (index, (plugin, _)) in self.plugins.iter().enumerate() {
            let mut seen: Vec<usize> = Vec::new();
            for dependency_id in &plugin.dependencies {
                if let Some(&dependency) = index_by_id.get(dependency_id.as_str()) {
                    if !seen.contains(&dependency) {
                        seen.push(dependency);
                        out_degree[index] += 1;
                        dependents[dependency].push(index);
                    }
                }
            }
        }

        let mut queue: VecDeque<usize> = (0..count).filter(|&index| out_degree[index] == 0).collect();
        let mut order = Vec::with_capacity(count);
        while let Some(index) = queue.pop_front() {
            order.push(index);
            for &dependent in &dependents[index] {
                out_degree[dependent] -= 1;
                if out_degree[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        if order.len() < count {
            let plugin_ids = (0..count)
                .filter(|&index| out_degree[index] > 0)
                .map(|index| self.plugins[index].0.plugin_id.clone())
                .collect();
            return Err(ExtensibilityError::CyclicOrMissingDependency { plugin_ids });
        }
        Ok(order)
    }
}

/// Pass 1 for a single plugin: resolve dependencies, probe modules,
/// register, then disable with the first problem found.
fn register_plugin(
    registrar: &dyn Registrar,
    plugin: &PluginManifest,
    base_directory: &Path,
) -> Result<Arc<PluginDescriptor>> {
    let mut reasons: Vec<String> = Vec::new();

    let mut dependencies = Vec::new();
    for dependency_id in &plugin.dependencies {
        match registrar.find_plugin(dependency_id) {
            Some(dependency) => dependencies.push(dependency),
            None => reasons.push(format!(
                "Could not find plugin '{}' upon which this plugin depends.",
                dependency_id
            )),
        }
    }

    let mut modules = Vec::new();
    for module in &plugin.modules {
        let location = match module.location.as_deref() {
            Some(location) => {
                match search_rules::probe(base_directory, &plugin.probing_paths, Path::new(location)) {
                    Ok(found) => Some(found),
                    Err(attempted) => {
                        reasons.push(search_rules::probing_failure_message(&module.name, &attempted));
                        Some(PathBuf::from(location))
                    }
                }
            }
            None => None,
        };
        modules.push(ModuleReference::new(module.name.clone(), location));
    }

    let plugin_type = plugin.plugin_type.as_deref().unwrap_or(DEFAULT_PLUGIN_TYPE);
    let mut registration = PluginRegistration::new(plugin.plugin_id.clone(), plugin_type, base_directory);
    registration.plugin_properties = plugin.parameters.clone();
    registration.traits_properties = plugin.traits.clone();
    registration.modules = modules;
    registration.plugin_dependencies = dependencies;
    registration.probing_paths = plugin.probing_paths.clone();

    let descriptor = registrar.register_plugin(registration)?;
    if let Some(reason) = reasons.into_iter().next() {
        warn!("Disabling plugin '{}': {}", plugin.plugin_id, reason);
        descriptor.disable(reason);
    }
    Ok(descriptor)
}
