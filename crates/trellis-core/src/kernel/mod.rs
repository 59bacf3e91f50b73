//! # Trellis Core Kernel
//!
//! The `kernel` module wires the extensibility core into a runnable whole.
//!
//! ## Key Responsibilities & Components:
//!
//! - **Runtime Bootstrapping**: [`Runtime`](bootstrap::Runtime) registers the
//!   built-in plugin, loads plugin descriptors through the caching loader,
//!   applies them to a [`Registry`](crate::extensibility::Registry) and can
//!   verify the resulting installation.
//! - **Core Constants**: application name, directory names and the ids of
//!   the built-in plugin, services and components live in `constants`.
//! - **Error Handling**: [`Error`](error::Error) aggregates the subsystem
//!   errors, with a `Result` alias in the `error` submodule.
pub mod bootstrap;
pub mod constants;
pub mod error;

pub use bootstrap::Runtime;
pub use error::{Error, Result, RuntimeLifecyclePhase};
