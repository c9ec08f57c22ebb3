//! Per-connection heartbeat task

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;
use tokio::time::{sleep, sleep_until, timeout_at, Instant};

use crate::protocol::GatewayFrame;
use crate::session::SharedSession;
use crate::shard::writer::Outbox;

/// Why the heartbeat task stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatExit {
    /// A heartbeat went unacknowledged for longer than the timeout
    Timeout,
    /// The writer is gone
    ChannelClosed,
}

/// Random delay before the first heartbeat, in `[0, interval)`
#[must_use]
pub fn initial_delay(interval: Duration) -> Duration {
    if interval.is_zero() {
        return Duration::ZERO;
    }
    interval.mul_f64(rand::thread_rng().gen::<f64>())
}

/// Sends heartbeats every interval and watches for the matching ACK
///
/// The receive loop records ACKs in the session and pokes `ack`.
pub(crate) struct HeartbeatMonitor {
    session: SharedSession,
    outbox: Outbox,
    ack: Arc<Notify>,
    timeout: Duration,
    shard_id: u32,
}

impl HeartbeatMonitor {
    pub fn new(
        session: SharedSession,
        outbox: Outbox,
        ack: Arc<Notify>,
        timeout: Duration,
        shard_id: u32,
    ) -> Self {
        Self {
            session,
            outbox,
            ack,
            timeout,
            shard_id,
        }
    }

    pub async fn run(self) -> HeartbeatExit {
        let interval = self.session.lock().heartbeat().interval();
        let jitter = initial_delay(interval);
        tracing::debug!(
            shard_id = self.shard_id,
            interval_ms = interval.as_millis() as u64,
            jitter_ms = jitter.as_millis() as u64,
            "Heartbeat started"
        );
        sleep(jitter).await;

        loop {
            let sent_at = Instant::now();
            let sequence = self.session.lock().record_heartbeat_sent(sent_at);
            if !self
                .outbox
                .send_priority(&GatewayFrame::heartbeat(sequence))
                .await
            {
                return HeartbeatExit::ChannelClosed;
            }
            tracing::trace!(shard_id = self.shard_id, sequence = ?sequence, "Heartbeat sent");

            if timeout_at(sent_at + self.timeout, self.wait_for_ack())
                .await
                .is_err()
            {
                tracing::warn!(
                    shard_id = self.shard_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Heartbeat not acknowledged, connection zombied"
                );
                return HeartbeatExit::Timeout;
            }

            sleep_until(sent_at + interval).await;
        }
    }

    async fn wait_for_ack(&self) {
        loop {
            self.ack.notified().await;
            // A stored permit may predate the current heartbeat
            if !self.session.lock().heartbeat().is_ack_pending() {
                return;
            }
        }
    }
}
