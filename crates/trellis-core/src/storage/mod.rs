//! # Trellis Core Storage
//!
//! Persistence of the runtime setup file in JSON, YAML or TOML.
pub mod config;
pub mod error;

pub use config::{CacheSettings, ConfigFormat, RuntimeSetup};
pub use error::StorageSystemError;
