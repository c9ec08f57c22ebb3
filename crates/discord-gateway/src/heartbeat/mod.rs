//! Heartbeating
//!
//! The tracker records send/ACK times inside the session; the monitor is the
//! per-connection task that sends heartbeats and detects missing ACKs.

mod monitor;
mod tracker;

pub(crate) use monitor::HeartbeatMonitor;
pub use monitor::{initial_delay, HeartbeatExit};
pub use tracker::HeartbeatTracker;
