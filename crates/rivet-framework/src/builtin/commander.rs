//! The `commander` module: turns private slash messages into commands.

use std::any::Any;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::chat::{ChatMatch, classify};
use crate::command::{CommandRegistry, parse_invocation};
use crate::error::ModuleResult;
use crate::host::SharedHost;
use crate::module::{BoxedModule, Module, ModuleDescriptor, ModuleRegistry, SetupContext};

pub const COMMANDER_TAG: &str = "commander";

pub static COMMANDER: ModuleDescriptor = ModuleDescriptor::new(COMMANDER_TAG, create);

fn create(_registry: &ModuleRegistry) -> BoxedModule {
    Arc::new(CommanderModule::new())
}

/// Owns the supervisor's [`CommandRegistry`] and feeds it from chat.
pub struct CommanderModule {
    commands: Arc<CommandRegistry>,
}

impl CommanderModule {
    pub fn new() -> Self {
        Self {
            commands: CommandRegistry::new(),
        }
    }

    pub fn commands(&self) -> &Arc<CommandRegistry> {
        &self.commands
    }

    /// Handles one chat line. Returns the dispatch task if the line was an
    /// allowed command.
    pub fn handle_line(&self, host: SharedHost, line: &str) -> Option<JoinHandle<()>> {
        dispatch_line(&self.commands, host, line)
    }
}

fn dispatch_line(
    commands: &Arc<CommandRegistry>,
    host: SharedHost,
    line: &str,
) -> Option<JoinHandle<()>> {
    let matched = classify(line)?;
    if !matched.is_addressed_to(&host.identity()) {
        return None;
    }
    let ChatMatch::PrivateCommand { sender, body, .. } = matched else {
        return None;
    };
    if !host.check_allow_list(&sender) {
        debug!(
            identity = %host.identity(),
            sender = %sender,
            "Ignoring command from player not on allow-list"
        );
        return None;
    }
    let invocation = parse_invocation(&sender, &body)?;

    let commands = commands.clone();
    Some(tokio::spawn(async move {
        commands.dispatch(host, invocation).await;
    }))
}

impl Default for CommanderModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for CommanderModule {
    fn tag(&self) -> &'static str {
        COMMANDER_TAG
    }

    fn setup(&self, ctx: &SetupContext) -> ModuleResult {
        let commands = self.commands.clone();
        ctx.on_chat(COMMANDER_TAG, move |host, line| {
            dispatch_line(&commands, host, &line.text);
            async {}
        });
        Ok(())
    }

    fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandContext;
    use crate::host::testing::RecordingHost;

    fn with_warp() -> (CommanderModule, Arc<parking_lot::Mutex<Vec<(String, Vec<String>)>>>) {
        let module = CommanderModule::new();
        let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let sink = calls.clone();
        module.commands().register("warp", move |ctx: CommandContext| {
            sink.lock().push((ctx.sender.clone(), ctx.args.clone()));
            async { Ok(()) }
        });
        (module, calls)
    }

    #[tokio::test]
    async fn test_allowed_command_dispatched() {
        let (module, calls) = with_warp();
        let host = RecordingHost::allowing(&["alice"]);

        let task = module
            .handle_line(host.clone(), "[alice -> you] /warp home")
            .unwrap();
        task.await.unwrap();

        assert_eq!(*calls.lock(), vec![("alice".to_string(), vec!["home".to_string()])]);
    }

    #[tokio::test]
    async fn test_disallowed_sender_ignored() {
        let (module, calls) = with_warp();
        let host = RecordingHost::allowing(&["bob"]);

        assert!(module.handle_line(host.clone(), "[alice -> you] /warp home").is_none());
        assert!(calls.lock().is_empty());
        assert!(host.tells().is_empty());
    }

    #[tokio::test]
    async fn test_non_command_lines_ignored() {
        let (module, _calls) = with_warp();
        let host = RecordingHost::allowing(&["alice"]);

        assert!(module.handle_line(host.clone(), "[alice -> you] hello").is_none());
        assert!(module.handle_line(host.clone(), "<alice> /warp home").is_none());
        assert!(module.handle_line(host.clone(), "[alice -> you] /   ").is_none());
    }

    #[tokio::test]
    async fn test_command_to_another_player_ignored() {
        let (module, calls) = with_warp();
        let host = RecordingHost::allowing(&["alice"]);

        assert!(module.handle_line(host.clone(), "[alice -> bob] /warp home").is_none());
        assert!(calls.lock().is_empty());

        let task = module
            .handle_line(host.clone(), "[alice -> scout] /warp home")
            .unwrap();
        task.await.unwrap();
        assert_eq!(calls.lock().len(), 1);
    }

    #[test]
    fn test_help_registered_on_creation() {
        let module = CommanderModule::new();
        assert_eq!(module.commands().names(), vec!["help"]);
    }
}
