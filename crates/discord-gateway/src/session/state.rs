//! Session lifecycle states

use std::fmt;

/// Lifecycle of a gateway session
///
/// `Disconnected -> Connecting -> AwaitingHello -> Identifying | Resuming ->
/// AwaitingReady -> Ready -> Closing -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    /// No connection; also the state between reconnect attempts
    #[default]
    Disconnected,
    /// Opening the transport
    Connecting,
    /// Transport open, waiting for Hello
    AwaitingHello,
    /// Identify queued
    Identifying,
    /// Resume queued
    Resuming,
    /// Handshake sent, waiting for READY or RESUMED
    AwaitingReady,
    /// Receiving dispatches
    Ready,
    /// Close requested or in progress
    Closing,
    /// Session ended for good
    Closed,
}

impl SessionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::AwaitingHello => "awaiting_hello",
            Self::Identifying => "identifying",
            Self::Resuming => "resuming",
            Self::AwaitingReady => "awaiting_ready",
            Self::Ready => "ready",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }

    /// Check if a transport is open in this state
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(
            self,
            Self::AwaitingHello
                | Self::Identifying
                | Self::Resuming
                | Self::AwaitingReady
                | Self::Ready
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
