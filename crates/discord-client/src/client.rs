//! Client: REST bootstrap plus one gateway shard

use std::sync::Arc;

use discord_common::Token;
use discord_gateway::{
    Connector, DispatchRouter, EventRegistry, Executor, Shard, ShardConfig, ShardHandle,
};
use discord_http::Http;

use crate::{ClientBuilder, ClientError, Context};

/// A configured client, not yet connected
pub struct Client {
    http: Arc<Http>,
    shard_config: ShardConfig,
    gateway_url: Option<String>,
    registry: Arc<EventRegistry<Context>>,
    connector: Arc<dyn Connector>,
    executor: Arc<dyn Executor>,
}

impl Client {
    #[must_use]
    pub fn builder(token: Token) -> ClientBuilder {
        ClientBuilder::new(token)
    }

    pub(crate) fn new(
        http: Arc<Http>,
        shard_config: ShardConfig,
        gateway_url: Option<String>,
        registry: Arc<EventRegistry<Context>>,
        connector: Arc<dyn Connector>,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            http,
            shard_config,
            gateway_url,
            registry,
            connector,
            executor,
        }
    }

    pub fn http(&self) -> &Arc<Http> {
        &self.http
    }

    pub fn registry(&self) -> &EventRegistry<Context> {
        &self.registry
    }

    /// Resolve the gateway URL and prepare the shard
    ///
    /// Bot tokens use `GET /gateway/bot`, whose recommended shard count applies
    /// when none was configured; other tokens use `GET /gateway`.
    ///
    /// # Errors
    /// `AuthenticationFailed` on HTTP 401, `GatewayNotFound` on any other bootstrap failure
    pub async fn connect(self) -> Result<ClientRunner, ClientError> {
        let mut shard_config = self.shard_config;

        match self.gateway_url {
            Some(url) => shard_config.gateway_url = url,
            None if self.http.token().is_bot() => {
                let info = self
                    .http
                    .get_gateway_bot()
                    .await
                    .map_err(ClientError::bootstrap)?;
                let limit = &info.session_start_limit;
                tracing::info!(
                    url = %info.url,
                    shards = info.shards,
                    remaining = limit.remaining,
                    total = limit.total,
                    reset_after_ms = limit.reset_after,
                    "Fetched gateway"
                );
                if limit.remaining == 0 {
                    tracing::warn!(
                        reset_after_ms = limit.reset_after,
                        "No session starts left; Identify will be rejected until the limit resets"
                    );
                }
                if shard_config.shard.is_none() && info.shards > 0 {
                    shard_config.shard = Some([0, info.shards]);
                }
                shard_config.gateway_url = info.url;
            }
            None => {
                let info = self
                    .http
                    .get_gateway()
                    .await
                    .map_err(ClientError::bootstrap)?;
                tracing::info!(url = %info.url, "Fetched gateway");
                shard_config.gateway_url = info.url;
            }
        }

        let shard = Shard::new(shard_config, self.connector);
        let context = Context::new(self.http, shard.handle());
        let router = DispatchRouter::new(self.registry, context.clone(), self.executor);

        Ok(ClientRunner {
            shard,
            router: Arc::new(router),
            context,
        })
    }

    /// Connect and run until closed
    ///
    /// # Errors
    /// Bootstrap failures and fatal gateway errors
    pub async fn start(self) -> Result<(), ClientError> {
        self.connect().await?.run().await
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("http", &self.http)
            .field("gateway_url", &self.gateway_url)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// A client with its shard built, ready to run
pub struct ClientRunner {
    shard: Shard,
    router: Arc<DispatchRouter<Context>>,
    context: Context,
}

impl ClientRunner {
    /// Handle for closing the shard or changing presence while it runs
    pub fn handle(&self) -> ShardHandle {
        self.shard.handle()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn shard_config(&self) -> &ShardConfig {
        self.shard.config()
    }

    /// Run the shard until it is closed or fails
    ///
    /// # Errors
    /// Fatal gateway errors, including exhausted reconnects
    pub async fn run(self) -> Result<(), ClientError> {
        self.shard.run(self.router).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ClientRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRunner")
            .field("shard", &self.shard)
            .finish_non_exhaustive()
    }
}
