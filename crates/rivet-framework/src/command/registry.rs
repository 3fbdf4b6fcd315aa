use std::future::Future;
use std::sync::{Arc, Weak};

use futures::future::BoxFuture;
use parking_lot::RwLock;
use tracing::{debug, error, warn};

use super::{CommandContext, CommandInvocation};
use crate::error::CommandResult;
use crate::host::SharedHost;

/// Reply sent when a player invokes a command nobody registered.
pub const UNKNOWN_COMMAND_REPLY: &str = "Unknown command. Use /help to list available commands.";

// ─── CommandHandler ───────────────────────────────────────────────────────────

/// An asynchronous chat command.
///
/// Implemented for every `Fn(CommandContext) -> impl Future<Output =
/// CommandResult>`, so plain async closures register directly.
pub trait CommandHandler: Send + Sync + 'static {
    fn call(&self, ctx: CommandContext) -> BoxFuture<'static, CommandResult>;
}

impl<F, Fut> CommandHandler for F
where
    F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CommandResult> + Send + 'static,
{
    fn call(&self, ctx: CommandContext) -> BoxFuture<'static, CommandResult> {
        Box::pin(self(ctx))
    }
}

pub type BoxedCommandHandler = Arc<dyn CommandHandler>;

// ─── DispatchOutcome ──────────────────────────────────────────────────────────

/// What happened to a dispatched invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No handler is registered under the name.
    Unknown,
    /// The handler returned `Ok`.
    Completed,
    /// The handler returned an error.
    Failed,
}

// ─── CommandRegistry ──────────────────────────────────────────────────────────

struct CommandEntry {
    name: String,
    handler: BoxedCommandHandler,
}

/// Command name to handler map, in insertion order.
///
/// Registering a name twice logs a warning and replaces the earlier handler
/// in place.
pub struct CommandRegistry {
    entries: RwLock<Vec<CommandEntry>>,
}

impl CommandRegistry {
    /// Creates a registry with the built-in `help` command.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let registry = Self::empty();
            let this = this.clone();
            registry.register("help", move |ctx: CommandContext| {
                let names = this
                    .upgrade()
                    .map(|registry| registry.names().join(", "))
                    .unwrap_or_default();
                async move { ctx.reply(&names).await }
            });
            registry
        })
    }

    /// Creates a registry with no commands at all.
    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Registers `handler` under `name`.
    ///
    /// Returns `true` if an existing handler was replaced.
    pub fn register<H>(&self, name: impl Into<String>, handler: H) -> bool
    where
        H: CommandHandler,
    {
        let name = name.into();
        let handler: BoxedCommandHandler = Arc::new(handler);
        let mut entries = self.entries.write();

        if let Some(existing) = entries.iter_mut().find(|entry| entry.name == name) {
            warn!(command = %name, "Command registered twice, replacing previous handler");
            existing.handler = handler;
            return true;
        }

        debug!(command = %name, "Registered command");
        entries.push(CommandEntry { name, handler });
        false
    }

    /// Returns the handler registered under `name`.
    pub fn handler(&self, name: &str) -> Option<BoxedCommandHandler> {
        self.entries
            .read()
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.handler.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().iter().any(|entry| entry.name == name)
    }

    /// Registered names, in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|entry| entry.name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Routes `invocation` to its handler and reports failures to the
    /// sender.
    ///
    /// Handler errors never escape this call. User-facing errors are sent
    /// back to the sender; internal errors are only logged.
    pub async fn dispatch(&self, host: SharedHost, invocation: CommandInvocation) -> DispatchOutcome {
        let identity = host.identity();
        let Some(handler) = self.handler(&invocation.name) else {
            debug!(
                identity = %identity,
                command = %invocation.name,
                sender = %invocation.sender,
                "Unknown command"
            );
            if let Err(err) = host.tell(&invocation.sender, UNKNOWN_COMMAND_REPLY, false).await {
                warn!(identity = %identity, error = %err, "Failed to send unknown command reply");
            }
            return DispatchOutcome::Unknown;
        };

        let sender = invocation.sender.clone();
        let command = invocation.name.clone();
        debug!(identity = %identity, command = %command, sender = %sender, "Dispatching command");

        let ctx = CommandContext::new(host.clone(), invocation);
        match handler.call(ctx).await {
            Ok(()) => DispatchOutcome::Completed,
            Err(err) => {
                match err.reply_text() {
                    Some(text) => {
                        debug!(identity = %identity, command = %command, error = %err, "Command rejected");
                        if let Err(send_err) = host.tell(&sender, &text, false).await {
                            warn!(
                                identity = %identity,
                                command = %command,
                                error = %send_err,
                                "Failed to report command error"
                            );
                        }
                    }
                    None => {
                        error!(
                            identity = %identity,
                            command = %command,
                            sender = %sender,
                            error = %err,
                            "Command failed"
                        );
                    }
                }
                DispatchOutcome::Failed
            }
        }
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
