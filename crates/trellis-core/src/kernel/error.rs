//! # Trellis Core Kernel Errors
//!
//! Defines [`Error`], the error type returned by the runtime. It wraps the
//! typed errors of the extensibility and storage subsystems and adds
//! lifecycle failures of the runtime itself.
use std::path::PathBuf;
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::extensibility::error::ExtensibilityError;
use crate::storage::error::StorageSystemError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// Specific, typed extensibility error
    #[error("Extensibility error: {0}")]
    Extensibility(#[from] ExtensibilityError),

    /// Specific, typed storage system error
    #[error("Storage system error: {0}")]
    StorageSystem(#[from] StorageSystemError),

    /// Error occurring during a specific runtime lifecycle phase.
    #[error("Runtime lifecycle error during {phase}: {message}")]
    RuntimeLifecycle {
        phase: RuntimeLifecyclePhase,
        message: String,
    },
}

/// Represents a specific phase in the runtime's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum RuntimeLifecyclePhase {
    #[error("Initialize")]
    Initialize,
    #[error("Verify")]
    Verify,
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl Error {
    pub fn io(source: std::io::Error, operation: impl Into<String>, path: PathBuf) -> Self {
        Error::StorageSystem(StorageSystemError::io(source, operation, path))
    }

    pub fn lifecycle(phase: RuntimeLifecyclePhase, message: impl Into<String>) -> Self {
        Error::RuntimeLifecycle {
            phase,
            message: message.into(),
        }
    }
}
