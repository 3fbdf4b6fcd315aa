//! The `teleport` module.
//!
//! Accepts teleport requests from players on the allow-list and adds the
//! `tpMe` command, which sends the bot's own teleport request to the sender.

use std::any::Any;
use std::sync::Arc;

use rivet_core::SessionResult;
use tracing::{debug, info, warn};

use super::commander::{COMMANDER, COMMANDER_TAG, CommanderModule};
use crate::chat::{ChatMatch, match_teleport_request};
use crate::command::CommandContext;
use crate::error::ModuleResult;
use crate::host::Host;
use crate::module::{BoxedModule, Module, ModuleDescriptor, ModuleRegistry, SetupContext};

pub const TELEPORT_TAG: &str = "teleport";

/// Chat command that asks the bot to teleport to the sender.
pub const TP_ME_COMMAND: &str = "tpMe";

pub static TELEPORT: ModuleDescriptor = ModuleDescriptor {
    tag: TELEPORT_TAG,
    depends_on: &[&COMMANDER],
    create,
};

fn create(registry: &ModuleRegistry) -> BoxedModule {
    match registry.get_as::<CommanderModule>(COMMANDER_TAG) {
        Some(commander) => {
            commander
                .commands()
                .register(TP_ME_COMMAND, |ctx: CommandContext| async move {
                    TeleportModule::tpa(ctx.host.as_ref(), &ctx.sender, false).await?;
                    Ok(())
                });
        }
        None => warn!(module = TELEPORT_TAG, "Commander missing, `tpMe` is unavailable"),
    }
    Arc::new(TeleportModule)
}

pub struct TeleportModule;

impl TeleportModule {
    /// Sends a teleport request to `user`.
    ///
    /// With `enforce_allow_list`, players not on the allow-list are skipped.
    pub async fn tpa(host: &dyn Host, user: &str, enforce_allow_list: bool) -> SessionResult<()> {
        if enforce_allow_list && !host.check_allow_list(user) {
            return Ok(());
        }
        host.send_command(&format!("/tpa {user}")).await
    }

    /// Accepts the pending teleport request if `requester` is allowed.
    ///
    /// Returns whether the request was accepted.
    pub async fn tpaccept(host: &dyn Host, requester: &str) -> SessionResult<bool> {
        if !host.check_allow_list(requester) {
            debug!(
                identity = %host.identity(),
                requester = %requester,
                "Ignoring teleport request from player not on allow-list"
            );
            return Ok(false);
        }
        host.send_command("/tpaccept").await?;
        info!(identity = %host.identity(), requester = %requester, "Accepted teleport request");
        Ok(true)
    }
}

impl Module for TeleportModule {
    fn tag(&self) -> &'static str {
        TELEPORT_TAG
    }

    fn setup(&self, ctx: &SetupContext) -> ModuleResult {
        ctx.on_chat(TELEPORT_TAG, |host, line| async move {
            let Some(ChatMatch::TeleportRequest { requester }) = match_teleport_request(&line.text)
            else {
                return;
            };
            if let Err(err) = Self::tpaccept(host.as_ref(), &requester).await {
                warn!(identity = %host.identity(), requester = %requester, error = %err, "Failed to accept teleport");
            }
        });
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
