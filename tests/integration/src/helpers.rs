//! Test helpers for integration tests
//!
//! Provides an in-memory gateway transport whose server side is driven by the
//! test, an event sink that records dispatches, and a fake REST API.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use discord_gateway::protocol::{GatewayFrame, OpCode};
use discord_gateway::transport::{CloseFrame, Inbound, Outbound};
use discord_gateway::{Connection, Connector, EventSink, TransportError};
use futures::channel::mpsc as fmpsc;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// How long a test waits for something to happen before failing
pub const WAIT: Duration = Duration::from_secs(120);

// ============================================================================
// Fake gateway transport
// ============================================================================

/// Connector that hands the server side of every connection to the test
#[derive(Clone)]
pub struct FakeConnector {
    servers: mpsc::UnboundedSender<FakeServer>,
    urls: Arc<Mutex<Vec<String>>>,
    refuse: Arc<AtomicBool>,
    stall: Arc<AtomicBool>,
}

impl FakeConnector {
    /// Create a connector and the receiver of its server ends
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeServer>) {
        let (servers, rx) = mpsc::unbounded_channel();
        let connector = Self {
            servers,
            urls: Arc::new(Mutex::new(Vec::new())),
            refuse: Arc::new(AtomicBool::new(false)),
            stall: Arc::new(AtomicBool::new(false)),
        };
        (Arc::new(connector), rx)
    }

    /// Make every connection attempt fail
    pub fn refuse_connections(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Make every connection attempt hang forever
    pub fn stall_connections(&self, stall: bool) {
        self.stall.store(stall, Ordering::SeqCst);
    }

    /// Every URL a connection was attempted to
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
        self.urls.lock().push(url.to_string());
        if self.refuse.load(Ordering::SeqCst) {
            return Err(TransportError::Connect("connection refused".to_string()));
        }
        if self.stall.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }

        let (inbound_tx, inbound_rx) = fmpsc::unbounded::<Result<Inbound, TransportError>>();
        let (outbound_tx, outbound_rx) = fmpsc::unbounded::<Outbound>();

        let server = FakeServer {
            url: url.to_string(),
            inbound: inbound_tx,
            outbound: outbound_rx,
        };
        self.servers
            .send(server)
            .map_err(|_| TransportError::Connect("test stopped listening".to_string()))?;

        let sink = outbound_tx.sink_map_err(|_| TransportError::Closed);
        Ok(Connection::new(Box::pin(sink), Box::pin(inbound_rx)))
    }
}

/// Server end of one fake connection
pub struct FakeServer {
    pub url: String,
    inbound: fmpsc::UnboundedSender<Result<Inbound, TransportError>>,
    outbound: fmpsc::UnboundedReceiver<Outbound>,
}

impl FakeServer {
    /// Send a frame to the client
    pub fn send(&self, frame: &GatewayFrame) {
        self.send_text(&frame.encode());
    }

    /// Send raw text, valid JSON or not
    pub fn send_text(&self, text: &str) {
        let _ = self
            .inbound
            .unbounded_send(Ok(Inbound::Text(text.to_string())));
    }

    /// Close the connection with `code`
    pub fn close(&self, code: u16) {
        let _ = self
            .inbound
            .unbounded_send(Ok(Inbound::Close(Some(CloseFrame::new(code, "")))));
    }

    /// Next message the client sent; `None` once the client dropped the connection
    pub async fn recv(&mut self) -> Option<Outbound> {
        tokio::time::timeout(WAIT, self.outbound.next())
            .await
            .expect("timed out waiting for the client")
    }

    /// Next frame with `op`, skipping heartbeats (unless `op` is Heartbeat)
    pub async fn expect(&mut self, op: OpCode) -> GatewayFrame {
        loop {
            match self.recv().await {
                Some(Outbound::Text(text)) => {
                    let frame = GatewayFrame::decode(&text).expect("client sent a malformed frame");
                    if frame.op == op {
                        return frame;
                    }
                    assert_eq!(frame.op, OpCode::Heartbeat, "unexpected frame {frame}");
                }
                other => panic!("expected {op}, got {other:?}"),
            }
        }
    }

    /// Next close frame, skipping any text frames before it
    pub async fn expect_close(&mut self) -> CloseFrame {
        loop {
            match self.recv().await {
                Some(Outbound::Text(_)) => {}
                Some(Outbound::Close(frame)) => return frame,
                None => panic!("connection dropped without a close frame"),
            }
        }
    }

    /// Drain everything the client sent until it dropped the connection
    pub async fn drain(&mut self) -> Vec<Outbound> {
        let mut sent = Vec::new();
        while let Some(message) = self.recv().await {
            sent.push(message);
        }
        sent
    }
}

/// Wait for the next connection attempt that reached the server side
pub async fn next_server(servers: &mut mpsc::UnboundedReceiver<FakeServer>) -> FakeServer {
    tokio::time::timeout(WAIT, servers.recv())
        .await
        .expect("timed out waiting for a connection")
        .expect("connector dropped")
}

// ============================================================================
// Event sink
// ============================================================================

/// Dispatched event as seen by the sink
pub type Dispatched = (String, Option<Value>);

/// Sink that forwards every dispatch to the test
pub struct EventLog {
    tx: mpsc::UnboundedSender<Dispatched>,
}

impl EventLog {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Dispatched>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { tx }), rx)
    }
}

impl EventSink for EventLog {
    fn dispatch(&self, event_name: &str, payload: Option<Value>) {
        let _ = self.tx.send((event_name.to_string(), payload));
    }
}

/// Next dispatched event name
pub async fn next_event(events: &mut mpsc::UnboundedReceiver<Dispatched>) -> Dispatched {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for a dispatch")
        .expect("event log dropped")
}

// ============================================================================
// Fake REST API
// ============================================================================

/// Token the fake API accepts
pub const GOOD_TOKEN: &str = "good-token";

/// A request the fake API received
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Clone)]
struct ApiState {
    gateway_url: String,
    shards: u32,
    calls: mpsc::UnboundedSender<RecordedCall>,
}

/// Discord REST API stand-in served on a local port
pub struct FakeApi {
    pub addr: SocketAddr,
    calls: mpsc::UnboundedReceiver<RecordedCall>,
    _handle: JoinHandle<()>,
}

impl FakeApi {
    /// Start serving; `GET /gateway/bot` recommends `shards` shards at `gateway_url`
    pub async fn start(gateway_url: &str, shards: u32) -> Result<Self> {
        let (tx, calls) = mpsc::unbounded_channel();
        let state = ApiState {
            gateway_url: gateway_url.to_string(),
            shards,
            calls: tx,
        };

        let app = Router::new()
            .route("/gateway", get(gateway))
            .route("/gateway/bot", get(gateway_bot))
            .route("/applications/:app_id/commands", put(overwrite_global))
            .route(
                "/applications/:app_id/guilds/:guild_id/commands",
                put(overwrite_guild),
            )
            .route(
                "/interactions/:interaction_id/:token/callback",
                post(interaction_callback),
            )
            .with_state(state);

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Ok(Self {
            addr,
            calls,
            _handle: handle,
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Next request served, in arrival order
    pub async fn next_call(&mut self) -> RecordedCall {
        tokio::time::timeout(WAIT, self.calls.recv())
            .await
            .expect("timed out waiting for a REST call")
            .expect("fake API stopped")
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == format!("Bot {GOOD_TOKEN}"))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"message": "401: Unauthorized", "code": 0})),
    )
        .into_response()
}

async fn gateway(State(state): State<ApiState>) -> Json<Value> {
    let _ = state.calls.send(RecordedCall {
        method: "GET",
        path: "/gateway".to_string(),
        body: None,
    });
    Json(json!({ "url": state.gateway_url }))
}

async fn gateway_bot(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let _ = state.calls.send(RecordedCall {
        method: "GET",
        path: "/gateway/bot".to_string(),
        body: None,
    });
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "url": state.gateway_url,
        "shards": state.shards,
        "session_start_limit": {
            "total": 1000,
            "remaining": 999,
            "reset_after": 14_400_000,
            "max_concurrency": 1
        }
    }))
    .into_response()
}

async fn overwrite_global(
    State(state): State<ApiState>,
    Path(app_id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let _ = state.calls.send(RecordedCall {
        method: "PUT",
        path: format!("/applications/{app_id}/commands"),
        body: Some(body.clone()),
    });
    Json(body).into_response()
}

async fn overwrite_guild(
    State(state): State<ApiState>,
    Path((app_id, guild_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let _ = state.calls.send(RecordedCall {
        method: "PUT",
        path: format!("/applications/{app_id}/guilds/{guild_id}/commands"),
        body: Some(body.clone()),
    });
    Json(body).into_response()
}

async fn interaction_callback(
    State(state): State<ApiState>,
    Path((interaction_id, token)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> StatusCode {
    let _ = state.calls.send(RecordedCall {
        method: "POST",
        path: format!("/interactions/{interaction_id}/{token}/callback"),
        body: Some(body),
    });
    StatusCode::NO_CONTENT
}
