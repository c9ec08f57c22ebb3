//! Handle for talking to a running shard

use std::time::Duration;

use tokio::sync::mpsc;

use crate::protocol::PresenceUpdatePayload;
use crate::session::{SessionState, SharedSession};

#[derive(Debug)]
pub(crate) enum ShardCommand {
    UpdatePresence(PresenceUpdatePayload),
    Close,
}

/// Cloneable handle to a [`Shard`](super::Shard)
///
/// Commands return `false` once the shard has stopped.
#[derive(Debug, Clone)]
pub struct ShardHandle {
    shard_id: u32,
    commands: mpsc::UnboundedSender<ShardCommand>,
    session: SharedSession,
}

impl ShardHandle {
    pub(crate) fn new(
        shard_id: u32,
        commands: mpsc::UnboundedSender<ShardCommand>,
        session: SharedSession,
    ) -> Self {
        Self {
            shard_id,
            commands,
            session,
        }
    }

    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    /// Close the connection with code 1000 and stop the shard
    pub fn close(&self) -> bool {
        self.commands.send(ShardCommand::Close).is_ok()
    }

    /// Send a presence update (op 3)
    ///
    /// The presence is also kept for the next Identify.
    pub fn update_presence(&self, presence: PresenceUpdatePayload) -> bool {
        self.commands
            .send(ShardCommand::UpdatePresence(presence))
            .is_ok()
    }

    /// Latest heartbeat round trip, or the Identify-to-READY time before the first ACK
    pub fn latency(&self) -> Option<Duration> {
        self.session.lock().latency()
    }

    pub fn state(&self) -> SessionState {
        self.session.lock().state()
    }

    pub fn session_id(&self) -> Option<String> {
        self.session.lock().session_id().map(str::to_string)
    }

    pub fn sequence(&self) -> Option<u64> {
        self.session.lock().sequence()
    }
}
