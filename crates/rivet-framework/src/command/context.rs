use std::fmt;
use std::str::FromStr;

use crate::error::CommandError;
use crate::host::SharedHost;

/// A parsed chat command, before it is routed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    /// Player who sent the command.
    pub sender: String,
    /// Command name, without the leading slash.
    pub name: String,
    /// Whitespace-separated arguments.
    pub args: Vec<String>,
}

impl fmt::Display for CommandInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Everything a command handler gets when it runs.
#[derive(Clone)]
pub struct CommandContext {
    pub host: SharedHost,
    pub sender: String,
    pub name: String,
    pub args: Vec<String>,
}

impl CommandContext {
    pub fn new(host: SharedHost, invocation: CommandInvocation) -> Self {
        Self {
            host,
            sender: invocation.sender,
            name: invocation.name,
            args: invocation.args,
        }
    }

    /// Returns the argument at `index`, or a user error naming it.
    pub fn arg(&self, index: usize, label: &str) -> Result<&str, CommandError> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CommandError::user(format!("Missing argument: {label}")))
    }

    /// Parses the argument at `index` as `T`.
    pub fn parse_arg<T: FromStr>(&self, index: usize, label: &str) -> Result<T, CommandError> {
        let raw = self.arg(index, label)?;
        raw.parse()
            .map_err(|_| CommandError::user(format!("Invalid {label}: {raw}")))
    }

    /// Parses all arguments with clap. Parse errors and `--help` become user
    /// errors carrying clap's first message line.
    #[cfg(feature = "command")]
    pub fn parse<T: clap::Parser>(&self) -> Result<T, CommandError> {
        let argv = std::iter::once(self.name.as_str()).chain(self.args.iter().map(String::as_str));
        T::try_parse_from(argv).map_err(|err| {
            let rendered = err.to_string();
            let first = rendered.lines().next().unwrap_or_default().trim();
            CommandError::user(first.trim_start_matches("error: ").to_string())
        })
    }

    /// Replies to the sender, ignoring the allow-list.
    pub async fn reply(&self, text: &str) -> Result<(), CommandError> {
        self.host.tell(&self.sender, text, false).await?;
        Ok(())
    }
}

impl fmt::Debug for CommandContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("identity", &self.host.identity())
            .field("sender", &self.sender)
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;

    fn context(args: &[&str]) -> CommandContext {
        CommandContext::new(
            RecordingHost::allowing(&["alice"]),
            CommandInvocation {
                sender: "alice".into(),
                name: "pay".into(),
                args: args.iter().map(|a| a.to_string()).collect(),
            },
        )
    }

    #[test]
    fn test_invocation_display() {
        let invocation = CommandInvocation {
            sender: "alice".into(),
            name: "warp".into(),
            args: vec!["home".into()],
        };
        assert_eq!(invocation.to_string(), "/warp home");
    }

    #[test]
    fn test_arg_missing() {
        let ctx = context(&["bob"]);
        assert_eq!(ctx.arg(0, "player").unwrap(), "bob");
        let err = ctx.arg(1, "amount").unwrap_err();
        assert_eq!(err.to_string(), "Missing argument: amount");
    }

    #[test]
    fn test_parse_arg() {
        let ctx = context(&["bob", "ten"]);
        let err = ctx.parse_arg::<u32>(1, "amount").unwrap_err();
        assert_eq!(err.to_string(), "Invalid amount: ten");

        let ctx = context(&["bob", "10"]);
        assert_eq!(ctx.parse_arg::<u32>(1, "amount").unwrap(), 10);
    }

    #[cfg(feature = "command")]
    #[derive(Debug, clap::Parser)]
    struct PayArgs {
        player: String,
        amount: u32,
    }

    #[cfg(feature = "command")]
    #[test]
    fn test_parse_with_clap() {
        let args: PayArgs = context(&["bob", "10"]).parse().unwrap();
        assert_eq!(args.player, "bob");
        assert_eq!(args.amount, 10);

        let err = context(&["bob", "ten"]).parse::<PayArgs>().unwrap_err();
        let CommandError::User(message) = &err else {
            panic!("expected a user error, got {err:?}");
        };
        assert!(message.starts_with("invalid value 'ten'"), "{message}");
        assert!(!message.contains('\n'));

        let err = context(&["bob"]).parse::<PayArgs>().unwrap_err();
        assert!(matches!(err, CommandError::User(_)));
        assert_eq!(
            err.to_string(),
            "the following required arguments were not provided:"
        );
    }

    #[tokio::test]
    async fn test_reply_goes_to_sender() {
        let host = RecordingHost::allowing(&[]);
        let ctx = CommandContext::new(
            host.clone(),
            CommandInvocation {
                sender: "mallory".into(),
                name: "ping".into(),
                args: vec![],
            },
        );
        ctx.reply("Pong!").await.unwrap();
        assert_eq!(host.tells(), vec![("mallory".into(), "Pong!".into())]);
    }
}
