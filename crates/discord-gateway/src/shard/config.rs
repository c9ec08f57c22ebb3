//! Shard configuration

use std::time::Duration;

use rand::Rng;

use discord_common::{ReconnectSettings, Token};
use discord_core::Intents;

use crate::protocol::{IdentifyProperties, PresenceUpdatePayload};

/// Gateway protocol version
pub const GATEWAY_VERSION: u8 = 10;

/// Gateway URL used when none is supplied
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";

/// Discord allows 120 frames per minute; heartbeats bypass the limiter
const DEFAULT_COMMANDS_PER_MINUTE: u32 = 115;

/// Append the version and encoding query to a gateway URL
#[must_use]
pub fn gateway_endpoint(url: &str) -> String {
    if url.contains('?') {
        return url.to_string();
    }
    format!(
        "{}?v={GATEWAY_VERSION}&encoding=json",
        url.trim_end_matches('/')
    )
}

/// Reconnect backoff: exponential, capped, with full jitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Reconnects allowed after a failure before giving up
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Upper bound of the delay before reconnect `attempt` (1-based)
    #[must_use]
    pub fn backoff_cap(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1_u32 << exponent)
            .min(self.max_delay)
    }

    /// Delay before reconnect `attempt`, uniform in `[0, backoff_cap(attempt)]`
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let cap = self.backoff_cap(attempt);
        cap.mul_f64(rand::thread_rng().gen::<f64>())
    }
}

impl From<&ReconnectSettings> for ReconnectPolicy {
    fn from(settings: &ReconnectSettings) -> Self {
        Self {
            base_delay: settings.base_delay,
            max_delay: settings.max_delay,
            max_attempts: settings.max_attempts,
        }
    }
}

/// Everything a shard needs to identify and stay connected
#[derive(Debug, Clone)]
pub struct ShardConfig {
    pub token: Token,
    pub intents: Intents,
    pub properties: IdentifyProperties,
    /// `[shard_id, num_shards]`
    pub shard: Option<[u32; 2]>,
    /// Bootstrap gateway URL, without query
    pub gateway_url: String,
    /// How long to wait for a heartbeat ACK (and for Hello)
    pub heartbeat_timeout: Duration,
    /// Presence sent with Identify; updated by presence changes at runtime
    pub presence: Option<PresenceUpdatePayload>,
    pub reconnect: ReconnectPolicy,
    /// Non-heartbeat frames allowed per minute
    pub commands_per_minute: u32,
    pub large_threshold: Option<u8>,
}

impl ShardConfig {
    /// Default heartbeat ACK timeout
    pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(60);

    #[must_use]
    pub fn new(token: Token, intents: Intents) -> Self {
        Self {
            token,
            intents,
            properties: IdentifyProperties::default(),
            shard: None,
            gateway_url: DEFAULT_GATEWAY_URL.to_string(),
            heartbeat_timeout: Self::DEFAULT_HEARTBEAT_TIMEOUT,
            presence: None,
            reconnect: ReconnectPolicy::default(),
            commands_per_minute: DEFAULT_COMMANDS_PER_MINUTE,
            large_threshold: None,
        }
    }

    #[must_use]
    pub fn with_gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = url.into();
        self
    }

    #[must_use]
    pub fn with_shard(mut self, shard_id: u32, shard_count: u32) -> Self {
        self.shard = Some([shard_id, shard_count]);
        self
    }

    #[must_use]
    pub fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_presence(mut self, presence: PresenceUpdatePayload) -> Self {
        self.presence = Some(presence);
        self
    }

    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    #[must_use]
    pub fn with_properties(mut self, properties: IdentifyProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Shard id used in logs
    #[must_use]
    pub fn shard_id(&self) -> u32 {
        self.shard.map_or(0, |[id, _]| id)
    }
}
