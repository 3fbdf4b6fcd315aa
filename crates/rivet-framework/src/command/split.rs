use super::CommandInvocation;

/// Splits a command body into whitespace-separated tokens.
///
/// There is no quoting or escaping: chat commands are short and players
/// never quote arguments.
pub fn split_args(body: &str) -> Vec<String> {
    body.split_whitespace().map(str::to_string).collect()
}

/// Parses the body of a private command into an invocation from `sender`.
///
/// The first token is the command name, the rest are its arguments. An empty
/// body yields `None`.
pub fn parse_invocation(sender: &str, body: &str) -> Option<CommandInvocation> {
    let mut tokens = split_args(body).into_iter();
    let name = tokens.next()?;
    Some(CommandInvocation {
        sender: sender.to_string(),
        name,
        args: tokens.collect(),
    })
}
