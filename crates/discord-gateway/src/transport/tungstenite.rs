//! `tokio-tungstenite` connector

use async_trait::async_trait;
use futures::future;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame as WsCloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};

use super::{CloseFrame, Connection, Connector, Inbound, Outbound, TransportError};

/// Connects over TLS WebSockets with `tokio-tungstenite`
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector;

impl TungsteniteConnector {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        let (sink, stream) = ws.split();

        let sink = sink
            .sink_map_err(|e| TransportError::WebSocket(e.to_string()))
            .with(|outbound: Outbound| future::ready(Ok::<_, TransportError>(into_message(outbound))));

        let stream = stream.filter_map(|message| future::ready(from_message(message)));

        Ok(Connection::new(Box::pin(sink), Box::pin(stream)))
    }
}

fn into_message(outbound: Outbound) -> Message {
    match outbound {
        Outbound::Text(text) => Message::Text(text),
        Outbound::Close(frame) => Message::Close(Some(WsCloseFrame {
            code: WsCloseCode::from(frame.code),
            reason: frame.reason.into(),
        })),
    }
}

/// Map a raw message; control frames are dropped
fn from_message(message: Result<Message, WsError>) -> Option<Result<Inbound, TransportError>> {
    match message {
        Ok(Message::Text(text)) => Some(Ok(Inbound::Text(text))),
        Ok(Message::Binary(bytes)) => Some(
            String::from_utf8(bytes)
                .map(Inbound::Text)
                .map_err(|_| TransportError::WebSocket("non UTF-8 binary frame".to_string())),
        ),
        Ok(Message::Close(frame)) => Some(Ok(Inbound::Close(frame.map(|f| {
            CloseFrame::new(u16::from(f.code), f.reason.into_owned())
        })))),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
        Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
            Some(Err(TransportError::Closed))
        }
        Err(e) => Some(Err(TransportError::WebSocket(e.to_string()))),
    }
}
