//! # discord-common
//!
//! Shared utilities including configuration, the auth token, and telemetry.

pub mod auth;
pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use auth::{Token, TokenKind};
pub use config::{
    AppSettings, AuthConfig, ClientConfig, ConfigError, Environment, GatewaySettings,
    HttpSettings, ReconnectSettings,
};
pub use telemetry::{try_init_tracing, try_init_tracing_with_config, TracingConfig, TracingError};
