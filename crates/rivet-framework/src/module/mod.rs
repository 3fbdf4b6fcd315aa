//! Capability modules.
//!
//! A module adds one capability to a supervisor: command handling, teleport
//! handling, anything built on top of the session. Modules are declared as
//! static [`ModuleDescriptor`]s and installed into a [`ModuleRegistry`],
//! dependencies first.
//!
//! # Lifecycle
//!
//! | step | when | what happens |
//! |------|------|--------------|
//! | create | supervisor construction | the descriptor's factory runs once |
//! | setup | every time a session goes live | [`Module::setup`] attaches listeners |
//! | stop | the session ends | the context's cancellation token fires |

mod core;
pub mod descriptor;
pub mod registry;

pub use self::core::{BoxedModule, Module, SetupContext};
pub use descriptor::{ModuleDescriptor, ModuleFactory};
pub use registry::ModuleRegistry;
