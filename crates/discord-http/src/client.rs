//! REST client

use std::time::Duration;

use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use discord_common::Token;
use discord_core::{ApplicationCommand, Message, Snowflake};

use crate::error::{HttpError, HttpResult};
use crate::models::{CreateMessage, GatewayBotInfo, GatewayInfo, InteractionResponse};

/// Versioned REST API root
pub const DEFAULT_API_BASE_URL: &str = "https://discord.com/api/v10";

const USER_AGENT: &str = concat!(
    "DiscordBot (",
    env!("CARGO_PKG_NAME"),
    ", ",
    env!("CARGO_PKG_VERSION"),
    ")"
);

/// REST client
///
/// Cheap to clone; all clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Http {
    client: Client,
    base_url: String,
    token: Token,
}

impl Http {
    /// Create a client against the public API
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialized
    pub fn new(token: Token) -> HttpResult<Self> {
        Self::with_base_url(token, DEFAULT_API_BASE_URL, Duration::from_secs(30))
    }

    /// Create a client against a custom API root (proxies, tests)
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialized
    pub fn with_base_url(token: Token, base_url: &str, timeout: Duration) -> HttpResult<Self> {
        if !token.is_bot() {
            warn!("Using a non-bot token; automating user accounts violates Discord's terms");
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    #[must_use]
    pub fn token(&self) -> &Token {
        &self.token
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ----------------------------------------------------------------------------
    // Gateway bootstrap
    // ----------------------------------------------------------------------------

    /// `GET /gateway` - gateway URL, no authentication needed
    pub async fn get_gateway(&self) -> HttpResult<GatewayInfo> {
        let request = self.client.get(self.url("/gateway"));
        self.send(request).await
    }

    /// `GET /gateway/bot` - gateway URL, recommended shards and session start limit
    pub async fn get_gateway_bot(&self) -> HttpResult<GatewayBotInfo> {
        self.request(Method::GET, "/gateway/bot", None::<&()>).await
    }

    // ----------------------------------------------------------------------------
    // Messages
    // ----------------------------------------------------------------------------

    /// `POST /channels/{channel_id}/messages`
    pub async fn create_message(
        &self,
        channel_id: Snowflake,
        message: &CreateMessage,
    ) -> HttpResult<Message> {
        let path = format!("/channels/{channel_id}/messages");
        self.request(Method::POST, &path, Some(message)).await
    }

    // ----------------------------------------------------------------------------
    // Interactions
    // ----------------------------------------------------------------------------

    /// `POST /interactions/{id}/{token}/callback`
    ///
    /// Interaction tokens authenticate themselves; no Authorization header is sent.
    pub async fn create_interaction_response(
        &self,
        interaction_id: Snowflake,
        interaction_token: &str,
        response: &InteractionResponse,
    ) -> HttpResult<()> {
        let path = format!("/interactions/{interaction_id}/{interaction_token}/callback");
        let request = self.client.post(self.url(&path)).json(response);
        self.send_empty(request).await
    }

    // ----------------------------------------------------------------------------
    // Application commands
    // ----------------------------------------------------------------------------

    /// `PUT /applications/{application_id}/commands`
    pub async fn bulk_overwrite_global_commands(
        &self,
        application_id: Snowflake,
        commands: &[ApplicationCommand],
    ) -> HttpResult<Vec<ApplicationCommand>> {
        let path = format!("/applications/{application_id}/commands");
        self.request(Method::PUT, &path, Some(commands)).await
    }

    /// `PUT /applications/{application_id}/guilds/{guild_id}/commands`
    pub async fn bulk_overwrite_guild_commands(
        &self,
        application_id: Snowflake,
        guild_id: Snowflake,
        commands: &[ApplicationCommand],
    ) -> HttpResult<Vec<ApplicationCommand>> {
        let path = format!("/applications/{application_id}/guilds/{guild_id}/commands");
        self.request(Method::PUT, &path, Some(commands)).await
    }

    // ----------------------------------------------------------------------------
    // Helpers
    // ----------------------------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn request<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> HttpResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self
            .client
            .request(method, self.url(path))
            .header(header::AUTHORIZATION, self.token.auth_header());
        if let Some(body) = body {
            request = request.json(body);
        }
        self.send(request).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> HttpResult<T> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url().path(), "REST response");

        let body = response.text().await?;
        if status.is_success() {
            Ok(serde_json::from_str(&body)?)
        } else {
            Err(HttpError::from_response(status.as_u16(), &body))
        }
    }

    async fn send_empty(&self, request: RequestBuilder) -> HttpResult<()> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url().path(), "REST response");

        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await?;
            Err(HttpError::from_response(status.as_u16(), &body))
        }
    }
}
