//! Gateway errors

use std::time::Duration;

use thiserror::Error;

use crate::protocol::{CodecError, OpCode};
use crate::transport::TransportError;

/// Coarse classification of a [`GatewayError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayErrorKind {
    /// The server broke the protocol; fatal
    ProtocolViolation,
    /// The token was rejected; fatal
    AuthenticationFailure,
    /// The connection ended; retried
    TransportClosed,
    /// No heartbeat ACK in time; retried
    HeartbeatTimeout,
    /// Closed with a code that a reconnect cannot fix; fatal
    FatalClose,
    /// Reconnect budget used up; terminal
    RetriesExhausted,
}

/// Errors that end a connection or the whole session
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A frame arrived that is not valid in the current state
    #[error("unexpected frame: expected {expected}, got {actual}")]
    UnexpectedFrame { expected: OpCode, actual: OpCode },

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The envelope was fine but the payload had the wrong shape
    #[error("invalid {op} payload: {source}")]
    InvalidPayload {
        op: OpCode,
        #[source]
        source: serde_json::Error,
    },

    #[error("authentication failed: {reason}")]
    AuthenticationFailed { reason: String },

    #[error("connection closed (code {code:?}): {reason}")]
    TransportClosed { code: Option<u16>, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("no Hello within {timeout:?}")]
    HelloTimeout { timeout: Duration },

    #[error("no heartbeat ACK within {timeout:?}")]
    HeartbeatTimeout { timeout: Duration },

    #[error("server requested a reconnect")]
    ReconnectRequested,

    #[error("session invalidated (resumable: {resumable})")]
    InvalidSession { resumable: bool },

    #[error("closed with fatal code {code}: {reason}")]
    FatalClose { code: u16, reason: String },

    #[error("gave up after {attempts} connection attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<GatewayError>,
    },
}

impl GatewayError {
    /// Classify the error
    #[must_use]
    pub fn kind(&self) -> GatewayErrorKind {
        match self {
            Self::UnexpectedFrame { .. } | Self::Codec(_) | Self::InvalidPayload { .. } => {
                GatewayErrorKind::ProtocolViolation
            }
            Self::AuthenticationFailed { .. } => GatewayErrorKind::AuthenticationFailure,
            Self::TransportClosed { .. }
            | Self::Transport(_)
            | Self::HelloTimeout { .. }
            | Self::ReconnectRequested
            | Self::InvalidSession { .. } => GatewayErrorKind::TransportClosed,
            Self::HeartbeatTimeout { .. } => GatewayErrorKind::HeartbeatTimeout,
            Self::FatalClose { .. } => GatewayErrorKind::FatalClose,
            Self::RetriesExhausted { .. } => GatewayErrorKind::RetriesExhausted,
        }
    }

    /// Check if the shard reconnects after this error
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            GatewayErrorKind::TransportClosed | GatewayErrorKind::HeartbeatTimeout
        )
    }
}
