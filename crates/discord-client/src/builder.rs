//! Client builder

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use discord_common::{ClientConfig, Token, TokenKind};
use discord_core::{Activity, ApplicationCommand, Intents, Snowflake, Status};
use discord_gateway::events::{InteractionCreateEvent, ReadyEvent};
use discord_gateway::{
    Connector, DispatchEvent, EventRegistry, Executor, PresenceUpdatePayload, ReconnectPolicy,
    ShardConfig, TokioExecutor, TungsteniteConnector,
};
use discord_http::{Http, DEFAULT_API_BASE_URL};

use crate::commands::{CommandContext, CommandRegistry};
use crate::{Client, ClientError, Context};

/// Configures and builds a [`Client`]
pub struct ClientBuilder {
    token: Token,
    intents: Intents,
    shard: Option<[u32; 2]>,
    heartbeat_timeout: Duration,
    reconnect: ReconnectPolicy,
    api_base_url: String,
    http_timeout: Duration,
    gateway_url: Option<String>,
    presence: Option<PresenceUpdatePayload>,
    registry: EventRegistry<Context>,
    commands: CommandRegistry,
    connector: Arc<dyn Connector>,
    executor: Arc<dyn Executor>,
}

impl ClientBuilder {
    #[must_use]
    pub fn new(token: Token) -> Self {
        Self {
            token,
            intents: Intents::DEFAULT,
            shard: None,
            heartbeat_timeout: ShardConfig::DEFAULT_HEARTBEAT_TIMEOUT,
            reconnect: ReconnectPolicy::default(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(30),
            gateway_url: None,
            presence: None,
            registry: EventRegistry::new(),
            commands: CommandRegistry::new(),
            connector: Arc::new(TungsteniteConnector::new()),
            executor: Arc::new(TokioExecutor),
        }
    }

    /// Start from environment configuration
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        let kind = if config.auth.bot {
            TokenKind::Bot
        } else {
            TokenKind::Bearer
        };
        let mut builder = Self::new(Token::new(config.auth.token.clone(), kind))
            .intents(config.gateway.intents)
            .heartbeat_timeout(config.gateway.heartbeat_timeout)
            .reconnect(ReconnectPolicy::from(&config.reconnect))
            .api_base_url(config.http.api_base_url.clone())
            .http_timeout(config.http.timeout);
        builder.shard = config.gateway.shard;
        builder
    }

    #[must_use]
    pub fn intents(mut self, intents: Intents) -> Self {
        self.intents = intents;
        self
    }

    /// Run as shard `shard_id` of `shard_count`
    ///
    /// Without this, the recommended count from `GET /gateway/bot` is used.
    #[must_use]
    pub fn shard(mut self, shard_id: u32, shard_count: u32) -> Self {
        self.shard = Some([shard_id, shard_count]);
        self
    }

    #[must_use]
    pub fn heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    #[must_use]
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    #[must_use]
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Connect to this URL instead of asking REST for one
    #[must_use]
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.gateway_url = Some(url.into());
        self
    }

    /// Initial status sent with Identify
    #[must_use]
    pub fn status(mut self, status: Status) -> Self {
        self.presence.get_or_insert_with(PresenceUpdatePayload::default).status = status;
        self
    }

    /// Add an activity to the initial presence
    #[must_use]
    pub fn activity(mut self, activity: Activity) -> Self {
        self.presence
            .get_or_insert_with(PresenceUpdatePayload::default)
            .activities
            .push(activity);
        self
    }

    /// Register an event handler
    #[must_use]
    pub fn on<E, F, Fut>(mut self, handler: F) -> Self
    where
        E: DispatchEvent,
        F: Fn(Context, Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.registry.on(handler);
        self
    }

    /// Register a global slash command
    #[must_use]
    pub fn command<F, Fut>(mut self, definition: ApplicationCommand, handler: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.commands.register(None, definition, handler);
        self
    }

    /// Register a slash command for one guild
    #[must_use]
    pub fn guild_command<F, Fut>(
        mut self,
        guild_id: Snowflake,
        definition: ApplicationCommand,
        handler: F,
    ) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.commands.register(Some(guild_id), definition, handler);
        self
    }

    /// Replace the WebSocket transport
    #[must_use]
    pub fn connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }

    /// Replace the executor that runs handlers
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    /// Build the client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn build(mut self) -> Result<Client, ClientError> {
        let http = Arc::new(Http::with_base_url(
            self.token.clone(),
            &self.api_base_url,
            self.http_timeout,
        )?);

        if !self.commands.is_empty() {
            register_command_handlers(&mut self.registry, self.commands);
        }

        let mut shard_config = ShardConfig::new(self.token, self.intents)
            .with_heartbeat_timeout(self.heartbeat_timeout)
            .with_reconnect(self.reconnect);
        shard_config.shard = self.shard;
        shard_config.presence = self.presence;

        Ok(Client::new(
            http,
            shard_config,
            self.gateway_url,
            Arc::new(self.registry),
            self.connector,
            self.executor,
        ))
    }
}

/// Route INTERACTION_CREATE to commands and push definitions on the first READY
fn register_command_handlers(registry: &mut EventRegistry<Context>, commands: CommandRegistry) {
    let commands = Arc::new(commands);
    let synced = Arc::new(AtomicBool::new(false));

    let on_ready = Arc::clone(&commands);
    registry.on(move |ctx: Context, ready: Arc<ReadyEvent>| {
        let commands = Arc::clone(&on_ready);
        let synced = Arc::clone(&synced);
        async move {
            if synced.swap(true, Ordering::SeqCst) {
                return Ok(());
            }
            let Some(application) = &ready.application else {
                tracing::warn!("READY has no application; commands not registered");
                return Ok(());
            };
            if let Err(e) = commands.sync(ctx.http(), application.id).await {
                synced.store(false, Ordering::SeqCst);
                return Err(anyhow::Error::from(e));
            }
            anyhow::Ok(())
        }
    });

    registry.on(move |ctx: Context, event: Arc<InteractionCreateEvent>| {
        let commands = Arc::clone(&commands);
        async move { commands.handle_interaction(ctx, &event).await }
    });
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("intents", &self.intents)
            .field("shard", &self.shard)
            .field("registry", &self.registry)
            .field("commands", &self.commands)
            .finish_non_exhaustive()
    }
}
