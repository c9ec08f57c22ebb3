//! # discord-gateway
//!
//! Gateway session engine: connects a shard, performs the Hello/Identify/Resume
//! handshake, keeps it alive with heartbeats, reconnects with backoff and routes
//! dispatch events to registered handlers.

pub mod dispatch;
pub mod error;
pub mod events;
pub mod heartbeat;
pub mod protocol;
pub mod session;
pub mod shard;
pub mod transport;

pub use dispatch::{DispatchRouter, EventRegistry, EventSink, Executor, RouteOutcome, TokioExecutor};
pub use error::{GatewayError, GatewayErrorKind};
pub use events::{DispatchEvent, EventType};
pub use protocol::{GatewayFrame, OpCode, PresenceUpdatePayload};
pub use session::{SessionState, SharedSession};
pub use shard::{ReconnectPolicy, Shard, ShardConfig, ShardHandle};
pub use transport::{Connection, Connector, TransportError, TungsteniteConnector};
