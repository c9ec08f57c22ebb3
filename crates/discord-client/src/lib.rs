//! # discord-client
//!
//! High-level bot client: builds the REST client and a gateway shard from one
//! builder, and routes events and slash commands to handlers.
//!
//! ```ignore
//! let client = Client::builder(Token::bot(token))
//!     .intents(Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT)
//!     .on(|ctx: Context, msg: Arc<MessageCreateEvent>| async move {
//!         if msg.content == "!ping" {
//!             ctx.reply(&msg, "Pong!").await?;
//!         }
//!         anyhow::Ok(())
//!     })
//!     .build()?;
//! client.start().await?;
//! ```

mod builder;
mod client;
pub mod commands;
mod context;
mod error;

pub use builder::ClientBuilder;
pub use client::{Client, ClientRunner};
pub use commands::{CommandContext, CommandRegistry};
pub use context::Context;
pub use error::ClientError;

// Re-export the layers underneath
pub use discord_common::{ClientConfig, Token, TokenKind};
pub use discord_core::{
    Activity, ActivityType, ApplicationCommand, CommandOption, CommandOptionType, Intents,
    Message, Snowflake, Status,
};
pub use discord_gateway::events;
pub use discord_gateway::{ShardHandle, SessionState};
pub use discord_http::Http;
