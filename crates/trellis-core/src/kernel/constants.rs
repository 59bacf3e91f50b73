/// Application name
pub const APP_NAME: &str = "trellis";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Directory name used under the user's cache directory
pub const APP_DIR_NAME: &str = "trellis";

/// Subdirectory holding plugin metadata snapshots
pub const PLUGIN_METADATA_CACHE_DIR: &str = "plugin-metadata";

/// Extension of plugin descriptor files
pub const PLUGIN_FILE_EXTENSION: &str = "plugin";

/// Default plugins directory
pub const DEFAULT_PLUGINS_DIR: &str = "plugins";

/// Id of the plugin that provides the runtime's own services
pub const BUILTIN_PLUGIN_ID: &str = "BuiltIn";

pub const SERVICE_LOCATOR_SERVICE_ID: &str = "BuiltIn.ServiceLocator";
pub const SERVICE_LOCATOR_COMPONENT_ID: &str = "BuiltIn.ServiceLocator";
pub const RESOURCE_LOCATOR_SERVICE_ID: &str = "BuiltIn.ResourceLocator";
pub const RESOURCE_LOCATOR_COMPONENT_ID: &str = "BuiltIn.ResourceLocator";
