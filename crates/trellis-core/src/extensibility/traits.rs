//! Built-in plugin and traits types.
use std::any::TypeId;
use std::path::PathBuf;
use std::sync::Arc;

use semver::Version;

use crate::extensibility::locator::{ResourceLocator, ServiceLocator};
use crate::extensibility::types::{
    concrete_type, contract_type, ParamSpec, ResourceKind, TypeDefinition, TypeInfo, ValueKind,
};

pub const PLUGIN_TYPE: &str = "Trellis.Extensibility.Plugin, trellis-core";
pub const DEFAULT_PLUGIN_TYPE: &str = "Trellis.Extensibility.DefaultPlugin, trellis-core";
pub const TRAITS_TYPE: &str = "Trellis.Extensibility.Traits, trellis-core";
pub const PLUGIN_TRAITS_TYPE: &str = "Trellis.Extensibility.PluginTraits, trellis-core";
pub const SERVICE_LOCATOR_TYPE: &str = "Trellis.Extensibility.ServiceLocator, trellis-core";
pub const RESOURCE_LOCATOR_TYPE: &str = "Trellis.Extensibility.ResourceLocator, trellis-core";

/// Marker contract implemented by every plugin object.
pub trait Plugin: Send + Sync {}

/// The plugin type used when a plugin does not name one.
#[derive(Debug, Default)]
pub struct DefaultPlugin;

impl Plugin for DefaultPlugin {}

/// Traits of a component whose service declares no traits type.
#[derive(Debug, Default)]
pub struct Traits;

/// Descriptive traits of a plugin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginTraits {
    pub name: String,
    pub version: Option<Version>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub icon: Option<PathBuf>,
}

impl PluginTraits {
    pub fn new(name: impl Into<String>) -> Self {
        PluginTraits {
            name: name.into(),
            ..Default::default()
        }
    }
}

fn plugin_traits_definition() -> TypeDefinition<PluginTraits> {
    TypeDefinition::<PluginTraits>::new(PLUGIN_TRAITS_TYPE)
        .constructor(
            vec![ParamSpec::required("name", ValueKind::String)],
            |args| Ok(PluginTraits::new(args.string("name")?)),
        )
        .property(ParamSpec::optional("version", ValueKind::Version), |traits, value| {
            traits.version = Some(value.into_version()?);
            Ok(())
        })
        .property(ParamSpec::optional("description", ValueKind::String), |traits, value| {
            traits.description = Some(value.into_string()?);
            Ok(())
        })
        .property(ParamSpec::optional("website", ValueKind::String), |traits, value| {
            traits.website = Some(value.into_string()?);
            Ok(())
        })
        .property(
            ParamSpec::optional("icon", ValueKind::Resource(ResourceKind::Icon)),
            |traits, value| {
                traits.icon = Some(value.into_path()?);
                Ok(())
            },
        )
}

pub(crate) fn builtin_types() -> Vec<(TypeInfo, Option<TypeId>)> {
    vec![
        contract_type(PLUGIN_TYPE, TypeId::of::<dyn Plugin>()),
        contract_type(SERVICE_LOCATOR_TYPE, TypeId::of::<dyn ServiceLocator>()),
        contract_type(RESOURCE_LOCATOR_TYPE, TypeId::of::<dyn ResourceLocator>()),
        concrete_type(
            TypeDefinition::<DefaultPlugin>::new(DEFAULT_PLUGIN_TYPE)
                .constructor(vec![], |_| Ok(DefaultPlugin))
                .implements::<dyn Plugin, _>(PLUGIN_TYPE, |plugin| plugin as Arc<dyn Plugin>),
        ),
        concrete_type(TypeDefinition::<Traits>::new(TRAITS_TYPE).constructor(vec![], |_| Ok(Traits))),
        concrete_type(plugin_traits_definition()),
    ]
}
