//! Wasteland Bot
//!
//! Runs every bot in a config file under a supervisor. Sessions are loopback
//! sessions: each line typed on stdin is delivered to every live session as
//! an inbound chat line, and everything the bots send is logged.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package wasteland-bot -- --init config.json
//! cargo run --package wasteland-bot -- --config config.json
//! ```
//!
//! Then try, with `alice` on the allow-list:
//!
//! ```text
//! [alice -> 您] /help
//! [alice -> 您] /echo hello there
//! [alice -> 您] /balance
//! 金錢: 42
//! [系統] alice 想要你傳送到 該玩家 的位置
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use rivet::loopback::{LoopbackConnector, LoopbackSession};
use rivet::prelude::*;
use rivet::runtime::config::validate_config;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

const BALANCE_DEADLINE: Duration = Duration::from_secs(10);

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Config file; searched in the usual places when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a starter config to this path and exit.
    #[arg(long, value_name = "PATH")]
    init: Option<PathBuf>,
}

// ============================================================================
// Commands
// ============================================================================

async fn echo(ctx: CommandContext) -> CommandResult {
    if ctx.args.is_empty() {
        return Err(CommandError::user("Usage: /echo <text>"));
    }
    ctx.reply(&ctx.args.join(" ")).await
}

async fn ping(ctx: CommandContext) -> CommandResult {
    ctx.reply("Pong!").await
}

/// Asks the server for the bot's balance and relays the answer.
async fn balance(ctx: CommandContext) -> CommandResult {
    let session = ctx
        .host
        .session()
        .ok_or_else(|| CommandError::remote("Not connected."))?;
    let replies = session.subscribe();
    session.send_command("/money").await?;

    let event = await_event(
        replies,
        |event| {
            event
                .as_chat()
                .is_some_and(|line| line.text.starts_with("金錢"))
        },
        Some(BALANCE_DEADLINE),
    )
    .await?;
    match event.as_chat() {
        Some(line) => ctx.reply(&line.text).await,
        None => Err(CommandError::remote("Unexpected reply.")),
    }
}

fn register_commands(supervisor: &Supervisor) {
    let Some(commands) = supervisor.commands() else {
        warn!(identity = %supervisor.identity(), "No commander module, skipping commands");
        return;
    };
    commands.register("echo", echo);
    commands.register("ping", ping);
    commands.register("balance", balance);
}

// ============================================================================
// Console
// ============================================================================

fn log_outbound(session: Arc<LoopbackSession>) {
    let mut outbound = session.watch_outbound();
    tokio::spawn(async move {
        while let Ok(line) = outbound.recv().await {
            info!(username = %session.username(), "> {line}");
        }
    });
}

async fn forward_stdin(connector: LoopbackConnector) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut delivered = 0;
        for session in connector.sessions().iter().filter(|s| !s.is_closed()) {
            session.inject_chat(line);
            delivered += 1;
        }
        if delivered == 0 {
            warn!("No live session to deliver to");
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(path) = args.init {
        let template = RivetConfig {
            bots: vec![SupervisorConfig::new("wanderer", "change-me").with_allow_list(["alice"])],
            ..Default::default()
        };
        ConfigLoader::save_json(&path, &template)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let loader = match &args.config {
        Some(path) => ConfigLoader::new().file(path),
        None => ConfigLoader::new(),
    };
    let config = loader.load().context("loading configuration")?;
    validate_config(&config).context("validating configuration")?;
    init_logging(&config.logging);

    if config.bots.is_empty() {
        warn!("No bots configured, run with --init to create a config");
        return Ok(());
    }

    let connector = LoopbackConnector::default();
    let mut opened = connector.watch_opened();
    tokio::spawn(async move {
        while let Ok(session) = opened.recv().await {
            log_outbound(session);
        }
    });

    let registry = SupervisorRegistry::new(Arc::new(connector.clone()));
    for bot in config.bots {
        let supervisor = registry.get_or_create(bot);
        register_commands(&supervisor);
        if let Err(err) = supervisor.login().await {
            error!(identity = %supervisor.identity(), error = %err, "Login failed");
        }
    }
    info!("{}", registry.stats());

    tokio::select! {
        result = forward_stdin(connector) => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Interrupted");
        }
    }

    registry.end_all();
    info!("{}", registry.stats());
    Ok(())
}
