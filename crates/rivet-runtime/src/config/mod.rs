//! Configuration for the Rivet runtime.
//!
//! A [`RivetConfig`] holds the logging settings and one
//! [`SupervisorConfig`] per supervised account. Documents are JSON by
//! default; see [`loader`] for search paths and environment overrides.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, load_config, load_config_from_file};
pub use schema::{
    DEFAULT_ENDPOINT, DEFAULT_RECONNECT_DELAY_MS, LogFormat, LogLevel, LogOutput, LogRotation,
    LoggingConfig, RivetConfig, SpanEventConfig, SupervisorConfig,
};
pub use validation::{validate_config, validate_supervisor_config};
