//! # Rivet Framework
//!
//! Capabilities layered on top of a supervised session.
//!
//! This layer provides:
//! - Capability modules with static descriptors and dependency-first
//!   installation ([`module`])
//! - A chat command registry with per-invocation error reporting
//!   ([`command`])
//! - Ordered chat line matchers ([`chat`])
//! - The built-in `commander` and `teleport` modules ([`builtin`])
//! - Typed command arguments via clap (with the `command` feature)
//!
//! Everything here acts through the [`Host`] trait, which the runtime's
//! supervisor implements. The framework never owns a session.

pub mod builtin;
pub mod chat;
pub mod command;
pub mod error;
pub mod host;
pub mod module;

pub use builtin::{
    COMMANDER, COMMANDER_TAG, CommanderModule, DEFAULT_MODULES, TELEPORT, TELEPORT_TAG,
    TP_ME_COMMAND, TeleportModule,
};
pub use chat::{ChatMatch, classify};
pub use command::{
    CommandContext, CommandHandler, CommandInvocation, CommandRegistry, DispatchOutcome,
    UNKNOWN_COMMAND_REPLY,
};
pub use error::{BoxError, CommandError, CommandResult, ModuleError, ModuleResult};
pub use host::{Host, SharedHost};
pub use module::{BoxedModule, Module, ModuleDescriptor, ModuleRegistry, SetupContext};
