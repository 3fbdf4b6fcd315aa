//! # Rivet
//!
//! Supervision for long-running game bots.
//!
//! ## Overview
//!
//! Rivet keeps one session per account alive, turns private chat messages
//! into commands and gives command handlers a way to wait on the game.
//!
//! ```text
//! ┌───────────┐ events ┌────────────┐ setup ┌──────────────┐ chat ┌──────────────────┐
//! │  Session  │───────▶│ Supervisor │──────▶│   Modules    │─────▶│ CommandRegistry  │──▶ handlers
//! │ (adapter) │◀───────│ (runtime)  │       │ commander …  │      │ help, tpMe, …    │
//! └───────────┘  chat  └────────────┘       └──────────────┘      └──────────────────┘
//! ```
//!
//! - **Session**: an external client reached through the capability traits
//!   in [`core`]
//! - **Supervisor**: logs in, reacts to spawn, end and kick, reconnects
//! - **Modules**: capabilities set up each time a session goes live
//! - **Commands**: `[player -> 您] /name args` messages from allowed players
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rivet::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     init_logging(&config.logging);
//!
//!     let registry = SupervisorRegistry::new(Arc::new(my_connector()));
//!     for bot in config.bots {
//!         let supervisor = registry.get_or_create(bot);
//!         supervisor.commands().unwrap().register("ping", |ctx: CommandContext| async move {
//!             ctx.reply("pong").await
//!         });
//!         supervisor.login().await?;
//!     }
//!
//!     tokio::signal::ctrl_c().await?;
//!     registry.end_all();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `command`: typed command arguments via clap (default)
//! - `loopback`: the in-memory session adapter
//! - `toml-config`: accept `rivet.toml`
//! - `json-log`: JSON log output

pub use rivet_core as core;
pub use rivet_framework as framework;
pub use rivet_runtime as runtime;

#[cfg(feature = "loopback")]
pub use rivet_adapter_loopback as loopback;

/// Commonly used types.
///
/// ```rust,ignore
/// use rivet::prelude::*;
/// ```
pub mod prelude {
    // Runtime
    pub use rivet_runtime::logging::init_from_config as init_logging;
    pub use rivet_runtime::{
        ConfigLoader, RivetConfig, SessionState, Supervisor, SupervisorConfig, SupervisorRegistry,
    };

    // Modules and commands
    pub use rivet_framework::{
        CommandContext, CommandError, CommandResult, Host, Module, ModuleDescriptor,
        ModuleRegistry, SetupContext,
    };

    // Session capability and waiting
    pub use rivet_core::{
        ChatLine, Session, SessionConnector, SessionEvent, WaitError, await_event, poll_until,
        wait::wait,
    };
}
