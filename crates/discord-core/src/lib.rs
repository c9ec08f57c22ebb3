//! # discord-core
//!
//! Domain types shared by every layer of the SDK: snowflake IDs, gateway intents,
//! and the API models carried by gateway events and REST responses.
//! This crate has no networking or runtime dependencies.

pub mod entities;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    Activity, ActivityType, Application, ApplicationCommand, Channel, CommandDataOption,
    CommandOption, CommandOptionType, Guild, Interaction, InteractionData, InteractionType,
    Member, Message, MessageReference, Status, UnavailableGuild, User,
};
pub use value_objects::{Intents, Snowflake, SnowflakeParseError};
