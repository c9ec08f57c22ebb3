//! Demo bot
//!
//! Run with:
//! ```bash
//! DISCORD_TOKEN=... cargo run -p discord-client --bin discord-bot
//! ```
//!
//! Answers `!ping` messages and the `/ping` slash command.

use std::sync::Arc;

use discord_client::events::{MessageCreateEvent, ReadyEvent};
use discord_client::{
    Activity, ApplicationCommand, ClientBuilder, ClientConfig, CommandContext, Context,
};
use discord_common::{try_init_tracing_with_config, TracingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Load configuration first; it decides the log format
    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "Bot stopped");
        std::process::exit(1);
    }
}

async fn run(config: ClientConfig) -> anyhow::Result<()> {
    info!(
        app = %config.app.name,
        env = ?config.app.env,
        intents = %config.gateway.intents,
        "Configuration loaded"
    );

    let client = ClientBuilder::from_config(&config)
        .activity(Activity::listening("!ping"))
        .on(|_ctx: Context, ready: Arc<ReadyEvent>| async move {
            info!(
                user = %ready.user.username,
                guilds = ready.guilds.len(),
                "Logged in"
            );
            anyhow::Ok(())
        })
        .on(|ctx: Context, msg: Arc<MessageCreateEvent>| async move {
            if msg.is_from_bot() || msg.content.trim() != "!ping" {
                return Ok(());
            }
            let latency = ctx
                .latency()
                .map_or_else(|| "unknown".to_string(), |l| format!("{}ms", l.as_millis()));
            ctx.reply(&msg, format!("Pong! ({latency})")).await?;
            anyhow::Ok(())
        })
        .command(
            ApplicationCommand::new("ping", "Check that the bot is alive"),
            |cmd: CommandContext| async move {
                cmd.respond("Pong!").await?;
                anyhow::Ok(())
            },
        )
        .build()?;

    let runner = client.connect().await?;
    let handle = runner.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutting down");
            handle.close();
        }
    });

    runner.run().await?;
    info!("Bot stopped cleanly");
    Ok(())
}
