//! Shard connection loop

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{mpsc, Notify};
use tokio::time::{sleep_until, timeout, timeout_at, Instant};

use super::config::{gateway_endpoint, ShardConfig};
use super::handle::{ShardCommand, ShardHandle};
use super::writer::{run_writer, Outbox};
use crate::dispatch::EventSink;
use crate::error::GatewayError;
use crate::heartbeat::{HeartbeatExit, HeartbeatMonitor};
use crate::protocol::{
    CloseAction, CloseCode, GatewayFrame, HelloPayload, IdentifyPayload, OpCode, ResumePayload,
};
use crate::session::{Session, SessionState, SharedSession};
use crate::transport::{
    CloseFrame, Connection, Connector, Inbound, Outbound, TransportError, TungsteniteConnector,
};

/// How long teardown waits for the writer to flush and close
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Close code for dropping a connection we intend to resume
///
/// Closing with 1000 or 1001 would invalidate the session.
const RESUME_CLOSE_CODE: u16 = 4000;

/// How a single connection ended
#[derive(Debug)]
enum Exit {
    /// Local close requested
    Closed,
    /// Connect again, resuming if the session still allows it
    Reconnect(GatewayError),
    Fatal(GatewayError),
}

/// The part of READY the shard itself needs
#[derive(Deserialize)]
struct ReadySession {
    session_id: String,
    #[serde(default)]
    resume_gateway_url: Option<String>,
}

/// One gateway session and the loop that keeps it connected
pub struct Shard {
    config: ShardConfig,
    connector: Arc<dyn Connector>,
    session: SharedSession,
    limiter: Arc<DefaultDirectRateLimiter>,
    commands_tx: mpsc::UnboundedSender<ShardCommand>,
    commands: mpsc::UnboundedReceiver<ShardCommand>,
}

impl Shard {
    #[must_use]
    pub fn new(config: ShardConfig, connector: Arc<dyn Connector>) -> Self {
        let session = Session::new(config.gateway_url.clone(), config.shard).shared();
        let per_minute = NonZeroU32::new(config.commands_per_minute).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));
        let (commands_tx, commands) = mpsc::unbounded_channel();

        Self {
            config,
            connector,
            session,
            limiter,
            commands_tx,
            commands,
        }
    }

    /// Shard that connects over TLS WebSockets
    #[must_use]
    pub fn with_tungstenite(config: ShardConfig) -> Self {
        Self::new(config, Arc::new(TungsteniteConnector::new()))
    }

    pub fn id(&self) -> u32 {
        self.config.shard_id()
    }

    pub fn config(&self) -> &ShardConfig {
        &self.config
    }

    pub fn session(&self) -> SharedSession {
        Arc::clone(&self.session)
    }

    pub fn handle(&self) -> ShardHandle {
        ShardHandle::new(self.id(), self.commands_tx.clone(), self.session())
    }

    /// Run until closed through a [`ShardHandle`] or until a fatal error
    ///
    /// Retryable failures reconnect with backoff; the failure count resets
    /// whenever a connection reaches READY or RESUMED.
    pub async fn run(mut self, sink: Arc<dyn EventSink>) -> Result<(), GatewayError> {
        let shard_id = self.id();
        let mut failures: u32 = 0;

        loop {
            let (exit, reached_ready) = self.run_connection(sink.as_ref()).await;

            let error = match exit {
                Exit::Closed => {
                    self.session.lock().set_state(SessionState::Closed);
                    tracing::info!(shard_id, "Shard closed");
                    return Ok(());
                }
                Exit::Fatal(error) => {
                    self.session.lock().set_state(SessionState::Closed);
                    tracing::error!(shard_id, error = %error, "Shard stopped on fatal error");
                    return Err(error);
                }
                Exit::Reconnect(error) => error,
            };

            if reached_ready {
                failures = 0;
            }
            failures += 1;

            if failures > self.config.reconnect.max_attempts {
                self.session.lock().set_state(SessionState::Closed);
                tracing::error!(shard_id, attempts = failures, error = %error, "Giving up reconnecting");
                return Err(GatewayError::RetriesExhausted {
                    attempts: failures,
                    last: Box::new(error),
                });
            }

            let delay = self.config.reconnect.delay(failures);
            let resume = {
                let mut session = self.session.lock();
                session.set_state(SessionState::Disconnected);
                session.resume_info().is_some()
            };
            tracing::info!(
                shard_id,
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                resume,
                error = %error,
                "Reconnecting"
            );

            if !self.wait_backoff(delay).await {
                self.session.lock().set_state(SessionState::Closed);
                tracing::info!(shard_id, "Shard closed during backoff");
                return Ok(());
            }
        }
    }

    /// Sleep before reconnecting; false if a close was requested meanwhile
    async fn wait_backoff(&mut self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        loop {
            tokio::select! {
                () = sleep_until(deadline) => return true,
                Some(command) = self.commands.recv() => match command {
                    ShardCommand::Close => return false,
                    ShardCommand::UpdatePresence(presence) => self.config.presence = Some(presence),
                },
            }
        }
    }

    /// Drive one connection from connect to teardown
    ///
    /// Also reports whether READY or RESUMED arrived on it.
    async fn run_connection(&mut self, sink: &dyn EventSink) -> (Exit, bool) {
        let shard_id = self.id();
        let (url, resume) = {
            let mut session = self.session.lock();
            session.set_state(SessionState::Connecting);
            (gateway_endpoint(session.connect_url()), session.resume_info())
        };
        tracing::info!(shard_id, url = %url, resume = resume.is_some(), "Connecting to gateway");

        let connector = Arc::clone(&self.connector);
        let connect = connector.connect(&url);
        tokio::pin!(connect);
        let connected = loop {
            tokio::select! {
                biased;
                Some(command) = self.commands.recv() => {
                    if self.before_handshake(command) {
                        tracing::info!(shard_id, "Close requested while connecting");
                        return (Exit::Closed, false);
                    }
                }
                result = &mut connect => break result,
            }
        };
        let Connection {
            sink: mut ws_sink,
            stream: mut ws_stream,
        } = match connected {
            Ok(connection) => connection,
            Err(error) => {
                tracing::warn!(shard_id, error = %error, "Failed to connect");
                return (Exit::Reconnect(error.into()), false);
            }
        };
        self.session.lock().set_state(SessionState::AwaitingHello);

        // Nothing is sent before Hello, and a close requested meanwhile sends nothing but the close frame
        let hello_wait = self.config.heartbeat_timeout;
        let hello_deadline = Instant::now() + hello_wait;
        let first = loop {
            tokio::select! {
                biased;
                Some(command) = self.commands.recv() => {
                    if self.before_handshake(command) {
                        tracing::info!(shard_id, "Close requested before Hello");
                        self.session.lock().set_state(SessionState::Closing);
                        let _ = timeout(CLOSE_TIMEOUT, async {
                            ws_sink.send(Outbound::Close(CloseFrame::normal())).await?;
                            ws_sink.close().await
                        })
                        .await;
                        return (Exit::Closed, false);
                    }
                }
                next = timeout_at(hello_deadline, ws_stream.next()) => {
                    break next.map_err(|_| Exit::Reconnect(GatewayError::HelloTimeout { timeout: hello_wait }));
                }
            }
        };
        let hello = match first.and_then(|next| self.read_hello(next)) {
            Ok(hello) => hello,
            Err(exit) => return (exit, false),
        };
        let interval = Duration::from_millis(hello.heartbeat_interval);
        self.session.lock().start_heartbeat(interval);
        tracing::debug!(shard_id, interval_ms = hello.heartbeat_interval, "Received Hello");

        let (outbox, queues) = Outbox::channel();
        let mut writer = tokio::spawn(run_writer(
            ws_sink,
            queues,
            Arc::clone(&self.limiter),
            shard_id,
        ));

        let handshake = match resume {
            Some(info) => {
                self.session.lock().set_state(SessionState::Resuming);
                tracing::info!(
                    shard_id,
                    session_id = %info.session_id,
                    sequence = info.sequence,
                    "Resuming session"
                );
                GatewayFrame::resume(&ResumePayload {
                    token: self.config.token.expose().to_string(),
                    session_id: info.session_id,
                    seq: info.sequence,
                })
            }
            None => {
                self.session.lock().set_state(SessionState::Identifying);
                tracing::info!(shard_id, intents = %self.config.intents, "Identifying");
                GatewayFrame::identify(&self.identify_payload())
            }
        };
        // A dead writer surfaces in the select loop below
        let _ = outbox.send(&handshake).await;
        self.session.lock().record_identify_sent(Instant::now());

        let ack = Arc::new(Notify::new());
        let monitor = HeartbeatMonitor::new(
            self.session(),
            outbox.clone(),
            Arc::clone(&ack),
            self.config.heartbeat_timeout,
            shard_id,
        );
        let mut heartbeat = tokio::spawn(monitor.run());

        let mut reached_ready = false;
        let mut writer_done = false;
        let exit = loop {
            tokio::select! {
                result = &mut heartbeat => {
                    break match result {
                        Ok(HeartbeatExit::Timeout) => Exit::Reconnect(GatewayError::HeartbeatTimeout {
                            timeout: self.config.heartbeat_timeout,
                        }),
                        Ok(HeartbeatExit::ChannelClosed) | Err(_) => {
                            Exit::Reconnect(TransportError::Closed.into())
                        }
                    };
                }
                result = &mut writer => {
                    writer_done = true;
                    let error = match result {
                        Ok(Err(error)) => error,
                        _ => TransportError::Closed,
                    };
                    tracing::warn!(shard_id, error = %error, "Writer stopped");
                    break Exit::Reconnect(error.into());
                }
                Some(command) = self.commands.recv() => match command {
                    ShardCommand::Close => break Exit::Closed,
                    ShardCommand::UpdatePresence(presence) => {
                        tracing::debug!(shard_id, status = %presence.status, "Updating presence");
                        if !outbox.try_send(&GatewayFrame::presence_update(&presence)) {
                            tracing::warn!(shard_id, "Outbound queue full; presence update kept for the next Identify");
                        }
                        self.config.presence = Some(presence);
                    }
                },
                item = ws_stream.next() => {
                    let step = match item {
                        Some(Ok(Inbound::Text(text))) => {
                            self.handle_text(&text, &outbox, &ack, sink, &mut reached_ready).await
                        }
                        Some(Ok(Inbound::Close(frame))) => Some(self.on_close(frame)),
                        Some(Err(error)) => Some(Exit::Reconnect(error.into())),
                        None => Some(Exit::Reconnect(GatewayError::TransportClosed {
                            code: None,
                            reason: "stream ended".to_string(),
                        })),
                    };
                    if let Some(exit) = step {
                        break exit;
                    }
                }
            }
        };

        heartbeat.abort();

        if !writer_done {
            let frame = match &exit {
                Exit::Reconnect(_) if self.session.lock().resume_info().is_some() => {
                    CloseFrame::new(RESUME_CLOSE_CODE, "reconnecting")
                }
                _ => CloseFrame::normal(),
            };
            self.session.lock().set_state(SessionState::Closing);

            let flushed = timeout(CLOSE_TIMEOUT, async {
                outbox.close(frame).await;
                drop(outbox);
                (&mut writer).await
            })
            .await;
            if flushed.is_err() {
                tracing::warn!(shard_id, "Writer did not finish closing in time");
                writer.abort();
            }
        }

        (exit, reached_ready)
    }

    /// Apply a command that arrived before the handshake; true if it asks to close
    fn before_handshake(&mut self, command: ShardCommand) -> bool {
        match command {
            ShardCommand::Close => true,
            ShardCommand::UpdatePresence(presence) => {
                self.config.presence = Some(presence);
                false
            }
        }
    }

    /// The first frame on a connection must be Hello
    fn read_hello(
        &self,
        next: Option<Result<Inbound, TransportError>>,
    ) -> Result<HelloPayload, Exit> {
        let text = match next {
            Some(Ok(Inbound::Text(text))) => text,
            Some(Ok(Inbound::Close(frame))) => return Err(self.on_close(frame)),
            Some(Err(error)) => return Err(Exit::Reconnect(error.into())),
            None => {
                return Err(Exit::Reconnect(GatewayError::TransportClosed {
                    code: None,
                    reason: "stream ended before Hello".to_string(),
                }))
            }
        };

        let frame = GatewayFrame::decode(&text).map_err(|e| Exit::Fatal(e.into()))?;
        if frame.op != OpCode::Hello {
            tracing::error!(shard_id = self.id(), op = %frame.op, "Expected Hello as the first frame");
            return Err(Exit::Fatal(GatewayError::UnexpectedFrame {
                expected: OpCode::Hello,
                actual: frame.op,
            }));
        }
        frame.payload::<HelloPayload>().map_err(|source| {
            Exit::Fatal(GatewayError::InvalidPayload {
                op: OpCode::Hello,
                source,
            })
        })
    }

    /// Process one inbound text frame; `Some` ends the connection
    async fn handle_text(
        &self,
        text: &str,
        outbox: &Outbox,
        ack: &Notify,
        sink: &dyn EventSink,
        reached_ready: &mut bool,
    ) -> Option<Exit> {
        let shard_id = self.id();
        let frame = match GatewayFrame::decode(text) {
            Ok(frame) => frame,
            Err(error) => return Some(Exit::Fatal(error.into())),
        };
        self.session.lock().observe_sequence(frame.s);

        match frame.op {
            OpCode::Dispatch => {
                let Some(event) = frame.t else {
                    tracing::warn!(shard_id, "Dispatch frame without an event name");
                    return None;
                };
                match event.as_str() {
                    "READY" => {
                        let data = frame.d.as_ref().unwrap_or(&Value::Null);
                        let ready = match ReadySession::deserialize(data) {
                            Ok(ready) => ready,
                            Err(source) => {
                                return Some(Exit::Fatal(GatewayError::InvalidPayload {
                                    op: OpCode::Dispatch,
                                    source,
                                }))
                            }
                        };
                        tracing::info!(shard_id, session_id = %ready.session_id, "Session ready");
                        self.session.lock().mark_ready(
                            ready.session_id,
                            ready.resume_gateway_url,
                            Instant::now(),
                        );
                        *reached_ready = true;
                    }
                    "RESUMED" => {
                        tracing::info!(shard_id, "Session resumed");
                        self.session.lock().mark_resumed(Instant::now());
                        *reached_ready = true;
                    }
                    _ => {}
                }
                sink.dispatch(&event, frame.d);
            }
            OpCode::HeartbeatAck => {
                let latency = self.session.lock().record_heartbeat_ack(Instant::now());
                if let Some(latency) = latency {
                    tracing::trace!(shard_id, latency_ms = latency.as_millis() as u64, "Heartbeat ACK");
                    ack.notify_one();
                }
            }
            OpCode::Heartbeat => {
                let sequence = self.session.lock().record_heartbeat_sent(Instant::now());
                tracing::debug!(shard_id, "Gateway requested a heartbeat");
                let _ = outbox
                    .send_priority(&GatewayFrame::heartbeat(sequence))
                    .await;
            }
            OpCode::Reconnect => {
                tracing::info!(shard_id, "Gateway requested a reconnect");
                return Some(Exit::Reconnect(GatewayError::ReconnectRequested));
            }
            OpCode::InvalidSession => {
                let resumable = frame.d.as_ref().and_then(Value::as_bool).unwrap_or(false);
                if !resumable {
                    self.session.lock().invalidate();
                }
                tracing::warn!(shard_id, resumable, "Session invalidated");
                return Some(Exit::Reconnect(GatewayError::InvalidSession { resumable }));
            }
            op => {
                tracing::debug!(shard_id, op = %op, "Ignoring frame");
            }
        }
        None
    }

    fn on_close(&self, frame: Option<CloseFrame>) -> Exit {
        let (code, mut reason) = match frame {
            Some(frame) => (Some(frame.code), frame.reason),
            None => (None, String::new()),
        };
        if reason.is_empty() {
            if let Some(known) = code.and_then(CloseCode::from_u16) {
                reason = known.description().to_string();
            }
        }

        let action = CloseAction::classify(code);
        tracing::warn!(
            shard_id = self.id(),
            code = ?code,
            reason = %reason,
            action = ?action,
            "Gateway closed the connection"
        );

        match action {
            CloseAction::Resume => Exit::Reconnect(GatewayError::TransportClosed { code, reason }),
            CloseAction::Reidentify => {
                self.session.lock().invalidate();
                Exit::Reconnect(GatewayError::TransportClosed { code, reason })
            }
            CloseAction::AuthenticationFailed => {
                Exit::Fatal(GatewayError::AuthenticationFailed { reason })
            }
            CloseAction::Fatal | CloseAction::Shutdown => Exit::Fatal(GatewayError::FatalClose {
                code: code.unwrap_or(CloseFrame::NORMAL),
                reason,
            }),
        }
    }

    fn identify_payload(&self) -> IdentifyPayload {
        let mut payload = IdentifyPayload::new(
            self.config.token.expose(),
            self.config.intents,
            self.config.properties.clone(),
        )
        .with_shard(self.config.shard)
        .with_presence(self.config.presence.clone());
        payload.large_threshold = self.config.large_threshold;
        payload
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("id", &self.id())
            .field("state", &self.session.lock().state())
            .finish_non_exhaustive()
    }
}
