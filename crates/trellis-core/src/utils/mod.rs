//! # Trellis Core Utilities
//!
//! Filesystem helpers shared by the plugin loaders.
pub mod fs;

pub use fs::{find_files, find_files_with_extension, modified_time};
