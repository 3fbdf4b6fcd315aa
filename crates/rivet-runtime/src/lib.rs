//! # Rivet Runtime
//!
//! Supervision for game sessions.
//!
//! This crate provides:
//! - [`Supervisor`]: owns the session of one identity, reacts to spawn, end
//!   and kick notifications, and reconnects when configured to
//! - [`SupervisorRegistry`]: one supervisor per identity, owned by the
//!   caller
//! - Configuration loading and validation ([`config`])
//! - Logging setup ([`logging`])
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rivet_runtime::{SupervisorRegistry, config::load_config, logging};
//!
//! let config = load_config()?;
//! logging::init_from_config(&config.logging);
//!
//! let registry = SupervisorRegistry::new(Arc::new(connector));
//! for bot in config.bots {
//!     registry.get_or_create(bot).login().await?;
//! }
//! ```
//!
//! Sessions are opened through a [`SessionConnector`](rivet_core::SessionConnector);
//! the runtime never talks to a server itself.

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod supervisor;

pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LoggingConfig, RivetConfig, SupervisorConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use registry::{RegistryStats, SupervisorRegistry};
pub use supervisor::{
    MAX_MESSAGE_CHARS, SessionState, Supervisor, SupervisorStats, WINDOW_POLL_INTERVAL,
    truncate_message,
};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for embedding code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
