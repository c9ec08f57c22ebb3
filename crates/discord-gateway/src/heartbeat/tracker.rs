//! Heartbeat bookkeeping

use std::time::Duration;

use tokio::time::Instant;

/// Heartbeat send/ACK tracking for the current connection
///
/// At most one heartbeat is awaiting acknowledgement at a time.
#[derive(Debug, Clone, Default)]
pub struct HeartbeatTracker {
    interval: Duration,
    last_sent_at: Option<Instant>,
    last_ack_at: Option<Instant>,
    ack_pending: bool,
}

impl HeartbeatTracker {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_sent_at(&self) -> Option<Instant> {
        self.last_sent_at
    }

    pub fn last_ack_at(&self) -> Option<Instant> {
        self.last_ack_at
    }

    pub fn is_ack_pending(&self) -> bool {
        self.ack_pending
    }

    /// Record a heartbeat send
    ///
    /// While an earlier heartbeat is unacknowledged its send time is kept, so
    /// the next ACK measures from the oldest outstanding heartbeat.
    pub fn mark_sent(&mut self, now: Instant) {
        if !self.ack_pending {
            self.last_sent_at = Some(now);
        }
        self.ack_pending = true;
    }

    /// Record an ACK; returns the round trip if a heartbeat was pending
    pub fn mark_acked(&mut self, now: Instant) -> Option<Duration> {
        if !self.ack_pending {
            return None;
        }
        self.ack_pending = false;
        self.last_ack_at = Some(now);
        self.last_sent_at
            .map(|sent| now.saturating_duration_since(sent))
    }
}
