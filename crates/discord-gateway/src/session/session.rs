//! Gateway session
//!
//! The only state shared between the receive loop and the heartbeat task.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use super::SessionState;
use crate::heartbeat::HeartbeatTracker;

/// Session shared between the shard task, its heartbeat task and handles
pub type SharedSession = Arc<Mutex<Session>>;

/// Credentials needed to resume a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeInfo {
    pub session_id: String,
    pub sequence: u64,
}

/// A single gateway session
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    session_id: Option<String>,
    sequence: Option<u64>,
    gateway_url: String,
    resume_gateway_url: Option<String>,
    heartbeat: HeartbeatTracker,
    latency: Option<Duration>,
    shard: Option<[u32; 2]>,
    identify_sent_at: Option<Instant>,
}

impl Session {
    /// Create a fresh session for `gateway_url`
    #[must_use]
    pub fn new(gateway_url: impl Into<String>, shard: Option<[u32; 2]>) -> Self {
        Self {
            state: SessionState::Disconnected,
            session_id: None,
            sequence: None,
            gateway_url: gateway_url.into(),
            resume_gateway_url: None,
            heartbeat: HeartbeatTracker::default(),
            latency: None,
            shard,
            identify_sent_at: None,
        }
    }

    /// Wrap in the shared form used by the shard
    #[must_use]
    pub fn shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    pub fn shard(&self) -> Option<[u32; 2]> {
        self.shard
    }

    pub fn latency(&self) -> Option<Duration> {
        self.latency
    }

    pub fn heartbeat(&self) -> &HeartbeatTracker {
        &self.heartbeat
    }

    pub fn gateway_url(&self) -> &str {
        &self.gateway_url
    }

    pub fn resume_gateway_url(&self) -> Option<&str> {
        self.resume_gateway_url.as_deref()
    }

    /// Record the `s` field of an inbound frame
    ///
    /// The sequence never moves backwards; `None` leaves it unchanged.
    pub fn observe_sequence(&mut self, seq: Option<u64>) {
        if let Some(seq) = seq {
            self.sequence = Some(self.sequence.map_or(seq, |current| current.max(seq)));
        }
    }

    /// Credentials for Resume, only when both the session id and a sequence exist
    pub fn resume_info(&self) -> Option<ResumeInfo> {
        match (&self.session_id, self.sequence) {
            (Some(session_id), Some(sequence)) => Some(ResumeInfo {
                session_id: session_id.clone(),
                sequence,
            }),
            _ => None,
        }
    }

    /// URL for the next connection: the resume URL when resuming, otherwise the bootstrap URL
    pub fn connect_url(&self) -> &str {
        match (&self.resume_gateway_url, self.resume_info()) {
            (Some(url), Some(_)) => url,
            _ => &self.gateway_url,
        }
    }

    /// Forget the session so the next connection identifies from scratch
    pub fn invalidate(&mut self) {
        self.session_id = None;
        self.sequence = None;
        self.resume_gateway_url = None;
    }

    /// Start heartbeat tracking for a new connection
    pub fn start_heartbeat(&mut self, interval: Duration) {
        self.heartbeat = HeartbeatTracker::new(interval);
    }

    pub fn record_identify_sent(&mut self, now: Instant) {
        self.identify_sent_at = Some(now);
        self.state = SessionState::AwaitingReady;
    }

    /// READY received: capture the session and the handshake latency
    pub fn mark_ready(
        &mut self,
        session_id: String,
        resume_gateway_url: Option<String>,
        now: Instant,
    ) {
        self.session_id = Some(session_id);
        if resume_gateway_url.is_some() {
            self.resume_gateway_url = resume_gateway_url;
        }
        if let Some(sent_at) = self.identify_sent_at.take() {
            self.latency = Some(now.saturating_duration_since(sent_at));
        }
        self.state = SessionState::Ready;
    }

    /// RESUMED received: the handshake latency is measured from the Resume send
    pub fn mark_resumed(&mut self, now: Instant) {
        if let Some(sent_at) = self.identify_sent_at.take() {
            self.latency = Some(now.saturating_duration_since(sent_at));
        }
        self.state = SessionState::Ready;
    }

    /// Mark a heartbeat as sent and return the sequence it must carry
    pub fn record_heartbeat_sent(&mut self, now: Instant) -> Option<u64> {
        self.heartbeat.mark_sent(now);
        self.sequence
    }

    /// Record a heartbeat ACK; returns the new latency if a heartbeat was pending
    pub fn record_heartbeat_ack(&mut self, now: Instant) -> Option<Duration> {
        let latency = self.heartbeat.mark_acked(now)?;
        self.latency = Some(latency);
        Some(latency)
    }
}
