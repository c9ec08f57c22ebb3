//! REST error types

use thiserror::Error;

/// Result type for REST operations
pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// Errors returned by [`crate::Http`]
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request could not be sent or the body could not be read
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The token was rejected (401)
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Rate limited (429)
    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: f64, global: bool },

    /// Any other non-success response
    #[error("api error ({status}, code {code}): {message}")]
    Api {
        status: u16,
        code: u64,
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl HttpError {
    /// Build an error from a non-success status and its raw body
    pub(crate) fn from_response(status: u16, body: &str) -> Self {
        #[derive(serde::Deserialize)]
        struct ApiErrorBody {
            #[serde(default)]
            code: u64,
            #[serde(default)]
            message: String,
            #[serde(default)]
            retry_after: Option<f64>,
            #[serde(default)]
            global: bool,
        }

        let parsed: Option<ApiErrorBody> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .map(|b| b.message.clone())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {status}"));

        match status {
            401 => Self::Unauthorized { message },
            429 => Self::RateLimited {
                retry_after: parsed.as_ref().and_then(|b| b.retry_after).unwrap_or(1.0),
                global: parsed.as_ref().is_some_and(|b| b.global),
            },
            _ => Self::Api {
                status,
                code: parsed.map_or(0, |b| b.code),
                message,
            },
        }
    }

    /// Check if the error means the credentials are bad
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}
