//! # Trellis Core Extensibility
//!
//! Runtime composition of plugins, services and components.
//!
//! A plugin is a unit of deployment described by a `.plugin` document. It
//! declares services (contracts identified by a type name) and components
//! (implementations of a service). Components are constructed lazily by a
//! dependency-injecting object factory the first time they are resolved.
//!
//! ## Key Submodules and Responsibilities:
//!
//! - **[`registry`]**: The [`Registry`] of plugins, services and components,
//!   and the registration checks that keep it consistent.
//! - **[`descriptor`]**: Per-entry descriptors with lazy type, handler,
//!   instance and traits resolution, and the disabled state.
//! - **[`types`]**: The [`TypeRegistry`] mapping type names to constructors,
//!   settable properties and the contracts a type implements.
//! - **[`object_factory`]** and **[`resolver`]**: Constructor selection and
//!   dependency injection from configured values or the registry.
//! - **[`handler`]**: Activation strategies. The default creates each
//!   component at most once.
//! - **[`catalog`]**: Orders plugin manifests by dependency and applies them
//!   to a registry in three passes.
//! - **[`loader`]** and **[`cache`]**: Discovery and parsing of plugin
//!   documents, optionally memoized on disk.
//! - **[`locator`]**: Service and resource lookup used by components.
pub mod cache;
pub mod catalog;
pub mod data_store;
pub mod descriptor;
pub mod error;
pub mod handle;
pub mod handler;
pub mod loader;
pub mod locator;
pub mod manifest;
pub mod object;
pub mod object_factory;
pub mod preprocessor;
pub mod property_set;
pub mod registry;
pub mod resolver;
pub mod search_rules;
pub mod traits;
pub mod types;

pub use cache::CachingPluginLoader;
pub use catalog::{CatalogReport, PluginCatalog, Registrar, RejectedPlugin};
pub use descriptor::{ComponentDescriptor, PluginDescriptor, ServiceDescriptor};
pub use error::{ExtensibilityError, Result};
pub use handle::ComponentHandle;
pub use handler::{Handler, HandlerFactory, InstanceHandlerFactory, SingletonHandlerFactory};
pub use loader::{DefaultPluginLoader, LoadedPlugin, PluginLoader, PluginSource};
pub use locator::{ResourceLocator, ServiceLocator, ServiceLocatorExt};
pub use manifest::{ComponentManifest, ModuleManifest, PluginManifest, ServiceManifest};
pub use object::{Arguments, Object, Value};
pub use preprocessor::{DirectivePreprocessor, Preprocessor};
pub use property_set::PropertySet;
pub use registry::{ComponentRegistration, PluginRegistration, Registry, ServiceRegistration};
pub use traits::{DefaultPlugin, Plugin, PluginTraits, Traits};
pub use types::{ParamSpec, TypeDefinition, TypeInfo, TypeName, TypeRegistry, ValueKind};

#[cfg(test)]
pub(crate) mod tests;
