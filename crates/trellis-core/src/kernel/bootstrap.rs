use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::extensibility::cache::{default_cache_directory, CachingPluginLoader};
use crate::extensibility::catalog::{CatalogReport, PluginCatalog};
use crate::extensibility::error::Result as ExtensibilityResult;
use crate::extensibility::handler::InstanceHandlerFactory;
use crate::extensibility::loader::{DefaultPluginLoader, PluginLoader};
use crate::extensibility::object::Object;
use crate::extensibility::registry::{
    ComponentRegistration, PluginRegistration, Registry, ServiceRegistration,
};
use crate::extensibility::traits::{DEFAULT_PLUGIN_TYPE, RESOURCE_LOCATOR_TYPE, SERVICE_LOCATOR_TYPE};
use crate::extensibility::types::{TypeName, TypeRegistry};
use crate::kernel::constants;
use crate::kernel::error::{Error, Result, RuntimeLifecyclePhase};
use crate::storage::config::RuntimeSetup;

/// Owns the registry and populates it from the configured plugin directories.
pub struct Runtime {
    setup: RuntimeSetup,
    registry: Registry,
    report: Option<CatalogReport>,
}

impl Runtime {
    pub fn new(setup: RuntimeSetup, types: Arc<TypeRegistry>) -> Self {
        Runtime {
            setup,
            registry: Registry::new(types),
            report: None,
        }
    }

    pub fn setup(&self) -> &RuntimeSetup {
        &self.setup
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The outcome of applying the plugin catalog, once initialized.
    pub fn report(&self) -> Option<&CatalogReport> {
        self.report.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.report.is_some()
    }

    /// Registers the built-in plugin, loads plugin descriptors and applies
    /// them to the registry.
    pub fn initialize(&mut self) -> Result<()> {
        if self.is_initialized() {
            return Err(Error::lifecycle(
                RuntimeLifecyclePhase::Initialize,
                "Runtime already initialized",
            ));
        }
        info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);

        self.register_builtin_plugin()?;

        let mut catalog = PluginCatalog::new();
        self.plugin_loader().populate_catalog(&mut catalog)?;
        debug!("Loaded {} plugin descriptor(s)", catalog.len());

        let report = catalog.apply_to(&self.registry)?;
        for plugin in report.disabled() {
            debug!(
                "Plugin '{}' is disabled: {}",
                plugin.plugin_id(),
                plugin.disabled_reason().unwrap_or_default()
            );
        }
        info!(
            "Registered {} plugin(s), {} disabled, {} rejected",
            report.registered.len(),
            report.disabled().count(),
            report.rejected.len()
        );
        self.report = Some(report);
        Ok(())
    }

    fn plugin_loader(&self) -> Box<dyn PluginLoader> {
        let mut loader: Box<dyn PluginLoader> = if self.setup.cache.enabled {
            let directory = self
                .setup
                .cache
                .directory
                .clone()
                .unwrap_or_else(default_cache_directory);
            debug!("Using plugin metadata cache at {}", directory.display());
            Box::new(CachingPluginLoader::new(DefaultPluginLoader::new(), directory))
        } else {
            Box::new(DefaultPluginLoader::new())
        };
        for directory in &self.setup.plugin_directories {
            loader.add_plugin_path(directory.clone());
        }
        for constant in &self.setup.preprocessor_constants {
            loader.define_preprocessor_constant(constant.clone());
        }
        loader
    }

    fn register_builtin_plugin(&self) -> Result<()> {
        let base_directory = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let plugin = self.registry.register_plugin(PluginRegistration::new(
            constants::BUILTIN_PLUGIN_ID,
            DEFAULT_PLUGIN_TYPE,
            base_directory,
        ))?;

        let builtins = [
            (
                constants::SERVICE_LOCATOR_SERVICE_ID,
                constants::SERVICE_LOCATOR_COMPONENT_ID,
                SERVICE_LOCATOR_TYPE,
                Object::from_instance(SERVICE_LOCATOR_TYPE, self.registry.service_locator()),
            ),
            (
                constants::RESOURCE_LOCATOR_SERVICE_ID,
                constants::RESOURCE_LOCATOR_COMPONENT_ID,
                RESOURCE_LOCATOR_TYPE,
                Object::from_instance(RESOURCE_LOCATOR_TYPE, self.registry.resource_locator()),
            ),
        ];
        for (service_id, component_id, contract, instance) in builtins {
            let service = self
                .registry
                .register_service(ServiceRegistration::new(plugin.clone(), service_id, contract))?;
            let mut registration = ComponentRegistration::new(
                plugin.clone(),
                service,
                component_id,
                Some(TypeName::new(contract)),
            );
            registration.component_handler_factory = Arc::new(InstanceHandlerFactory::new(instance));
            self.registry.register_component(registration)?;
        }
        Ok(())
    }

    /// Resolves the types, handlers and traits of every enabled plugin,
    /// service and component. Each failure is logged; returns `true` when
    /// nothing failed.
    pub fn verify_installation(&self) -> bool {
        if !self.is_initialized() {
            warn!("Verifying an installation that has not been initialized");
        }
        let mut success = true;
        let mut check = |what: String, outcome: ExtensibilityResult<()>| {
            if let Err(e) = outcome {
                error!("Verification of {} failed: {}", what, e);
                success = false;
            }
        };

        for plugin in self.registry.plugins().all() {
            if plugin.is_disabled() {
                continue;
            }
            let what = format!("plugin '{}'", plugin.plugin_id());
            check(what.clone(), plugin.resolve_plugin_type().map(drop));
            check(what.clone(), plugin.resolve_plugin_handler().map(drop));
            check(what, plugin.resolve_traits().map(drop));
        }

        for service in self.registry.services().all() {
            if service.is_disabled() {
                continue;
            }
            let what = format!("service '{}'", service.service_id());
            check(what.clone(), service.resolve_service_type().map(drop));
            check(what, service.resolve_traits_type().map(drop));
        }

        for component in self.registry.components().all() {
            if component.is_disabled() {
                continue;
            }
            let what = format!("component '{}'", component.component_id());
            check(what.clone(), component.resolve_component_type().map(drop));
            check(what.clone(), component.resolve_component_handler().map(drop));
            check(what, component.resolve_traits().map(drop));
        }

        if success {
            info!("Installation verified");
        }
        success
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("setup", &self.setup)
            .field("registry", &self.registry)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
