//! # Trellis Core
//!
//! A registry of plugins, the services they declare and the components that
//! implement those services. Plugin descriptors are discovered on disk,
//! ordered by their dependencies and applied to a [`Registry`]; components
//! are activated lazily with their dependencies injected from the registry.
pub mod extensibility;
pub mod kernel;
pub mod storage;
pub mod utils;

pub use extensibility::{
    ComponentHandle, ExtensibilityError, PluginCatalog, Registry, ServiceLocator,
    ServiceLocatorExt, TypeDefinition, TypeRegistry,
};
pub use kernel::error::Error as KernelError;
pub use kernel::Runtime;
pub use storage::RuntimeSetup;

#[cfg(test)]
mod tests;
