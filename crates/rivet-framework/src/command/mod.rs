//! Chat commands.
//!
//! Players drive a bot by private-messaging it a slash command, for example
//! `[alice -> 您] /warp home`. The `commander` module recognises the line,
//! checks the allow-list and hands a [`CommandInvocation`] to the
//! [`CommandRegistry`], which runs the matching handler.
//!
//! ```rust,ignore
//! use rivet_framework::{CommandContext, CommandError, CommandRegistry};
//!
//! let commands = CommandRegistry::new();
//! commands.register("pay", |ctx: CommandContext| async move {
//!     let player = ctx.arg(0, "player")?;
//!     let amount: u32 = ctx.parse_arg(1, "amount")?;
//!     if amount == 0 {
//!         return Err(CommandError::user("Amount must be positive"));
//!     }
//!     ctx.host.send_command(&format!("/pay {player} {amount}")).await?;
//!     Ok(())
//! });
//! ```

pub mod context;
pub mod registry;
pub mod split;

pub use context::{CommandContext, CommandInvocation};
pub use registry::{
    BoxedCommandHandler, CommandHandler, CommandRegistry, DispatchOutcome, UNKNOWN_COMMAND_REPLY,
};
pub use split::{parse_invocation, split_args};
