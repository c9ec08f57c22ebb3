//! Shards
//!
//! A shard owns one gateway session and reconnects it until told to stop or
//! until a fatal error.

mod config;
mod handle;
mod shard;
pub(crate) mod writer;

pub use config::{gateway_endpoint, ReconnectPolicy, ShardConfig, DEFAULT_GATEWAY_URL, GATEWAY_VERSION};
pub use handle::ShardHandle;
pub use shard::Shard;
