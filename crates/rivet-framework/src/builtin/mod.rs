//! Modules every supervisor gets.
//!
//! | Module | Tag | Description |
//! |--------|-----|-------------|
//! | [`COMMANDER`] | `"commander"` | Private slash messages become commands; owns the command registry |
//! | [`TELEPORT`] | `"teleport"` | Accepts teleport requests from allowed players, adds `tpMe` |

pub mod commander;
pub mod teleport;

pub use commander::{COMMANDER, COMMANDER_TAG, CommanderModule};
pub use teleport::{TELEPORT, TELEPORT_TAG, TP_ME_COMMAND, TeleportModule};

use crate::module::ModuleDescriptor;

/// Descriptors installed on every supervisor, in order.
pub static DEFAULT_MODULES: [&ModuleDescriptor; 2] = [&COMMANDER, &TELEPORT];
