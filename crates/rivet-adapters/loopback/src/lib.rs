//! # Rivet Loopback Adapter
//!
//! An in-memory implementation of the Rivet session capability.
//!
//! The loopback connector never touches the network. Every session it opens
//! records outbound chat and lets the caller script inbound notifications,
//! which makes it the session used by the integration tests and by the demo
//! binary.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rivet_adapter_loopback::{LoopbackConfig, LoopbackConnector};
//! use rivet_runtime::SupervisorRegistry;
//!
//! let connector = LoopbackConnector::new(LoopbackConfig::default());
//! let registry = SupervisorRegistry::new(Arc::new(connector.clone()));
//! let bot = registry.get_or_create(config);
//! bot.login().await?;
//!
//! let session = connector.latest().unwrap();
//! session.inject_chat("[alice -> 您] /help");
//! ```

pub mod config;
pub mod connector;
pub mod session;

pub use config::LoopbackConfig;
pub use connector::{LoopbackConnector, OPEN_HISTORY};
pub use session::{CLIENT_CLOSE_REASON, LoopbackSession};
