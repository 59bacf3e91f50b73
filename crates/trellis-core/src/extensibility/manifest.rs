//! Plugin descriptor documents.
//!
//! A `.plugin` file is a JSON document describing one plugin:
//!
//! ```json
//! {
//!   "plugin_id": "Acme.Greetings",
//!   "plugin_type": "Acme.GreetingsPlugin, Acme",
//!   "modules": [{ "name": "Acme", "location": "acme.mod" }],
//!   "dependencies": ["BuiltIn"],
//!   "services": [{ "service_id": "Acme.Greeter", "service_type": "Acme.Greeter, Acme" }],
//!   "components": [{
//!     "component_id": "Acme.Hello",
//!     "service_id": "Acme.Greeter",
//!     "component_type": "Acme.Hello, Acme",
//!     "parameters": { "name": "world" }
//!   }]
//! }
//! ```
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::extensibility::error::{ExtensibilityError, Result};
use crate::extensibility::property_set::PropertySet;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PluginManifest {
    pub plugin_id: String,
    /// Defaults to the built-in no-op plugin type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_type: Option<String>,
    #[serde(default)]
    pub parameters: PropertySet,
    #[serde(default)]
    pub traits: PropertySet,
    #[serde(default)]
    pub modules: Vec<ModuleManifest>,
    #[serde(default)]
    pub probing_paths: Vec<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub services: Vec<ServiceManifest>,
    #[serde(default)]
    pub components: Vec<ComponentManifest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceManifest {
    pub service_id: String,
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_component_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentManifest {
    pub component_id: String,
    pub service_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,
    #[serde(default)]
    pub parameters: PropertySet,
    #[serde(default)]
    pub traits: PropertySet,
}

impl PluginManifest {
    pub fn new(plugin_id: impl Into<String>) -> Self {
        PluginManifest {
            plugin_id: plugin_id.into(),
            ..Default::default()
        }
    }

    /// Parses a descriptor document. `path` only labels errors.
    pub fn from_json_str(text: &str, path: Option<&Path>) -> Result<Self> {
        let manifest: PluginManifest =
            serde_json::from_str(text).map_err(|e| ExtensibilityError::Manifest {
                path: path.map(Path::to_path_buf),
                message: format!("Failed to parse plugin descriptor: {}", e),
                source: Some(Box::new(e)),
            })?;
        if manifest.plugin_id.trim().is_empty() {
            return Err(ExtensibilityError::Manifest {
                path: path.map(Path::to_path_buf),
                message: "The plugin id must not be empty.".to_string(),
                source: None,
            });
        }
        Ok(manifest)
    }

    pub fn with_plugin_type(mut self, plugin_type: impl Into<String>) -> Self {
        self.plugin_type = Some(plugin_type.into());
        self
    }

    pub fn with_dependency(mut self, plugin_id: impl Into<String>) -> Self {
        self.dependencies.push(plugin_id.into());
        self
    }

    pub fn with_module(mut self, name: impl Into<String>, location: Option<&str>) -> Self {
        self.modules.push(ModuleManifest {
            name: name.into(),
            location: location.map(str::to_string),
        });
        self
    }

    pub fn with_probing_path(mut self, path: impl Into<String>) -> Self {
        self.probing_paths.push(path.into());
        self
    }

    pub fn with_service(mut self, service_id: impl Into<String>, service_type: impl Into<String>) -> Self {
        self.services.push(ServiceManifest {
            service_id: service_id.into(),
            service_type: service_type.into(),
            default_component_type: None,
        });
        self
    }

    pub fn with_component(
        mut self,
        component_id: impl Into<String>,
        service_id: impl Into<String>,
        component_type: Option<&str>,
    ) -> Self {
        self.components.push(ComponentManifest {
            component_id: component_id.into(),
            service_id: service_id.into(),
            component_type: component_type.map(str::to_string),
            ..Default::default()
        });
        self
    }
}
