//! WebSocket transport
//!
//! The session engine only sees a boxed sink of [`Outbound`] messages and a boxed
//! stream of [`Inbound`] messages, produced by a [`Connector`].

mod tungstenite;

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, Stream};

pub use self::tungstenite::TungsteniteConnector;

/// WebSocket close frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseFrame {
    pub code: u16,
    pub reason: String,
}

impl CloseFrame {
    /// Normal closure (1000)
    pub const NORMAL: u16 = 1000;

    #[must_use]
    pub fn new(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn normal() -> Self {
        Self::new(Self::NORMAL, "")
    }
}

/// Message received from the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    Text(String),
    /// Peer closed; `None` when the close frame carried no code
    Close(Option<CloseFrame>),
}

/// Message sent over the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Text(String),
    Close(CloseFrame),
}

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect: {0}")]
    Connect(String),

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("connection closed")]
    Closed,
}

pub type BoxedSink = Pin<Box<dyn Sink<Outbound, Error = TransportError> + Send>>;
pub type BoxedStream = Pin<Box<dyn Stream<Item = Result<Inbound, TransportError>> + Send>>;

/// An open duplex connection
pub struct Connection {
    pub sink: BoxedSink,
    pub stream: BoxedStream,
}

impl Connection {
    #[must_use]
    pub fn new(sink: BoxedSink, stream: BoxedStream) -> Self {
        Self { sink, stream }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens gateway connections
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Connect to `url` (already carrying the version and encoding query)
    async fn connect(&self, url: &str) -> Result<Connection, TransportError>;
}
