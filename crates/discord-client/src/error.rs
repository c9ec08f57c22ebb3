//! Client errors

use discord_common::ConfigError;
use discord_gateway::{GatewayError, GatewayErrorKind};
use discord_http::HttpError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The token was rejected, either by REST or by the gateway
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The gateway URL could not be fetched
    #[error("gateway not found: {0}")]
    GatewayNotFound(#[source] HttpError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Gateway(GatewayError),
}

impl ClientError {
    /// Map a failed `GET /gateway[/bot]`
    pub(crate) fn bootstrap(error: HttpError) -> Self {
        if error.is_unauthorized() {
            Self::AuthenticationFailed(error.to_string())
        } else {
            Self::GatewayNotFound(error)
        }
    }

    pub fn is_authentication_failure(&self) -> bool {
        match self {
            Self::AuthenticationFailed(_) => true,
            Self::Gateway(error) => error.kind() == GatewayErrorKind::AuthenticationFailure,
            _ => false,
        }
    }
}

impl From<GatewayError> for ClientError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::AuthenticationFailed { reason } => Self::AuthenticationFailed(reason),
            other => Self::Gateway(other),
        }
    }
}
