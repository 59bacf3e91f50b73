//! # Trellis Core Extensibility Errors
//!
//! Defines [`ExtensibilityError`], the error type shared by the registry,
//! the object factory, the plugin catalog and the plugin loaders.
//!
//! Resolution failures always carry the id of the descriptor that failed so
//! callers can report which plugin, service or component is broken.
use std::path::PathBuf;

pub type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ExtensibilityError {
    #[error("Invalid registration: {0}")]
    Validation(String),

    #[error("There is already a {kind} registered with id '{id}'.")]
    DuplicateId { kind: &'static str, id: String },

    #[error("The {kind} '{id}' does not belong to this registry.")]
    ForeignDescriptor { kind: &'static str, id: String },

    #[error("{message}")]
    Resolution {
        id: String,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("{message}")]
    Construction {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error(
        "Could not topologically sort the following plugins either due to dependency cycles or duplicate dependencies: {}.",
        .plugin_ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(", ")
    )]
    CyclicOrMissingDependency { plugin_ids: Vec<String> },

    #[error("Component '{id}' is disabled: {reason}")]
    DisabledComponent { id: String, reason: String },

    #[error(
        "Could not resolve a single component for service type '{service_type}' because there are {} enabled components: {}.",
        .component_ids.len(),
        .component_ids.iter().map(|id| format!("'{}'", id)).collect::<Vec<_>>().join(", ")
    )]
    AmbiguousResolution {
        service_type: String,
        component_ids: Vec<String>,
    },

    #[error("{message}")]
    Registration {
        message: String,
        #[source]
        source: Box<ExtensibilityError>,
    },

    #[error("Plugin manifest error for '{}': {message}", .path.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "<inline>".into()))]
    Manifest {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Preprocessor error at line {line}: {message}")]
    Preprocessor { line: usize, message: String },

    #[error("I/O error during operation '{operation}' on path '{path}': {source}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("The registry that owns this descriptor has been dropped.")]
    RegistryDropped,
}

pub type Result<T> = std::result::Result<T, ExtensibilityError>;

impl ExtensibilityError {
    pub fn resolution(id: impl Into<String>, message: impl Into<String>) -> Self {
        ExtensibilityError::Resolution {
            id: id.into(),
            message: message.into(),
            source: None,
        }
    }

    pub fn construction(message: impl Into<String>) -> Self {
        ExtensibilityError::Construction {
            message: message.into(),
            source: None,
        }
    }

    /// Wraps `self` as the cause of a construction failure.
    pub fn into_construction(self, message: impl Into<String>) -> Self {
        ExtensibilityError::Construction {
            message: message.into(),
            source: Some(Box::new(self)),
        }
    }

    /// Wraps `self` as the cause of a resolution failure for descriptor `id`.
    pub fn into_resolution(self, id: impl Into<String>, message: impl Into<String>) -> Self {
        ExtensibilityError::Resolution {
            id: id.into(),
            message: message.into(),
            source: Some(Box::new(self)),
        }
    }

    pub fn registration(message: impl Into<String>, source: ExtensibilityError) -> Self {
        ExtensibilityError::Registration {
            message: message.into(),
            source: Box::new(source),
        }
    }

    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        ExtensibilityError::Io {
            source,
            operation: operation.into(),
            path,
        }
    }
}
