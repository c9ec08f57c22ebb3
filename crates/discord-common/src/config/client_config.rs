//! Client configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use std::env;
use std::str::FromStr;
use std::time::Duration;

use discord_core::Intents;

/// Main client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub app: AppSettings,
    pub auth: AuthConfig,
    pub gateway: GatewaySettings,
    pub http: HttpSettings,
    pub reconnect: ReconnectSettings,
}

/// General application settings
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub name: String,
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Credentials
#[derive(Clone)]
pub struct AuthConfig {
    pub token: String,
    /// Whether the token belongs to a bot account
    pub bot: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &"<redacted>")
            .field("bot", &self.bot)
            .finish()
    }
}

/// Gateway session settings
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub intents: Intents,
    /// `[shard_id, shard_count]`; `None` lets the bootstrap response decide
    pub shard: Option<[u32; 2]>,
    pub heartbeat_timeout: Duration,
}

/// REST client settings
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub api_base_url: String,
    pub timeout: Duration,
}

/// Reconnect backoff settings
#[derive(Debug, Clone)]
pub struct ReconnectSettings {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

// Default value functions
fn default_app_name() -> String {
    "discord-bot".to_string()
}

fn default_api_base_url() -> String {
    "https://discord.com/api/v10".to_string()
}

fn default_http_timeout_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    60_000
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_max_delay_ms() -> u64 {
    60_000
}

fn default_reconnect_max_attempts() -> u32 {
    10
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if `DISCORD_TOKEN` is missing or a variable has an invalid value
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// # Errors
    /// Same as [`ClientConfig::from_env`]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = lookup("DISCORD_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingVar("DISCORD_TOKEN"))?;

        let intents = match lookup("DISCORD_INTENTS") {
            Some(raw) => Intents::parse(&raw)
                .map_err(|_| ConfigError::InvalidValue("DISCORD_INTENTS", raw))?,
            None => Intents::default(),
        };

        let shard_id: Option<u32> = parse_opt(&lookup, "DISCORD_SHARD_ID")?;
        let shard_count: Option<u32> = parse_opt(&lookup, "DISCORD_SHARD_COUNT")?;
        let shard = match (shard_id, shard_count) {
            (None, None) => None,
            (Some(id), Some(count)) if count > 0 && id < count => Some([id, count]),
            (Some(id), Some(count)) => {
                return Err(ConfigError::InvalidValue(
                    "DISCORD_SHARD_ID",
                    format!("shard {id} out of range for {count} shards"),
                ))
            }
            (None, Some(_)) => return Err(ConfigError::MissingVar("DISCORD_SHARD_ID")),
            (Some(_), None) => return Err(ConfigError::MissingVar("DISCORD_SHARD_COUNT")),
        };

        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            auth: AuthConfig {
                token,
                bot: parse_or(&lookup, "DISCORD_BOT", true)?,
            },
            gateway: GatewaySettings {
                intents,
                shard,
                heartbeat_timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "DISCORD_HEARTBEAT_TIMEOUT_MS",
                    default_heartbeat_timeout_ms(),
                )?),
            },
            http: HttpSettings {
                api_base_url: lookup("DISCORD_API_BASE_URL")
                    .map(|s| s.trim_end_matches('/').to_string())
                    .unwrap_or_else(default_api_base_url),
                timeout: Duration::from_millis(parse_or(
                    &lookup,
                    "DISCORD_HTTP_TIMEOUT_MS",
                    default_http_timeout_ms(),
                )?),
            },
            reconnect: ReconnectSettings {
                base_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "DISCORD_RECONNECT_BASE_DELAY_MS",
                    default_reconnect_base_delay_ms(),
                )?),
                max_delay: Duration::from_millis(parse_or(
                    &lookup,
                    "DISCORD_RECONNECT_MAX_DELAY_MS",
                    default_reconnect_max_delay_ms(),
                )?),
                max_attempts: parse_or(
                    &lookup,
                    "DISCORD_RECONNECT_MAX_ATTEMPTS",
                    default_reconnect_max_attempts(),
                )?,
            },
        })
    }
}

fn parse_opt<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::InvalidValue(key, raw.clone()))
        })
        .transpose()
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
