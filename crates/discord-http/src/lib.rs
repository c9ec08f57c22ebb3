//! # discord-http
//!
//! Minimal REST client: gateway bootstrap plus the calls the session engine
//! and command handlers need (messages, interaction responses, command sync).

mod client;
mod error;
mod models;

pub use client::{Http, DEFAULT_API_BASE_URL};
pub use error::{HttpError, HttpResult};
pub use models::{
    CreateMessage, GatewayBotInfo, GatewayInfo, InteractionCallbackData, InteractionResponse,
    InteractionResponseType, SessionStartLimit,
};
