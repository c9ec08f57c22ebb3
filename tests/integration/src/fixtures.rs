//! Test fixtures: gateway frames and payloads

use discord_gateway::protocol::{GatewayFrame, OpCode};
use serde_json::{json, Value};

/// Bot token used by the gateway scenarios
pub const TOKEN: &str = "secret";

/// Bootstrap URL the scenarios connect to
pub const GATEWAY_URL: &str = "wss://gateway.test";

/// Resume URL handed out in READY
pub const RESUME_URL: &str = "wss://resume.test";

/// URL the shard dials for `base`
pub fn endpoint(base: &str) -> String {
    format!("{base}?v=10&encoding=json")
}

pub fn hello(interval_ms: u64) -> GatewayFrame {
    GatewayFrame::new(
        OpCode::Hello,
        Some(json!({ "heartbeat_interval": interval_ms })),
    )
}

pub fn heartbeat_ack() -> GatewayFrame {
    GatewayFrame::new(OpCode::HeartbeatAck, None)
}

/// Server asking for an immediate heartbeat
pub fn heartbeat_request() -> GatewayFrame {
    GatewayFrame::new(OpCode::Heartbeat, None)
}

pub fn reconnect() -> GatewayFrame {
    GatewayFrame::new(OpCode::Reconnect, None)
}

pub fn invalid_session(resumable: bool) -> GatewayFrame {
    GatewayFrame::new(OpCode::InvalidSession, Some(Value::Bool(resumable)))
}

pub fn user(id: u64, name: &str) -> Value {
    json!({
        "id": id.to_string(),
        "username": name,
        "discriminator": "0",
        "bot": true
    })
}

pub fn ready(sequence: u64, session_id: &str, application_id: u64) -> GatewayFrame {
    GatewayFrame::dispatch(
        "READY",
        sequence,
        json!({
            "v": 10,
            "user": user(1, "test-bot"),
            "guilds": [{ "id": "100", "unavailable": true }],
            "session_id": session_id,
            "resume_gateway_url": RESUME_URL,
            "application": { "id": application_id.to_string(), "flags": 0 }
        }),
    )
}

pub fn resumed(sequence: u64) -> GatewayFrame {
    GatewayFrame::dispatch("RESUMED", sequence, json!({}))
}

pub fn message_create(sequence: u64, content: &str) -> GatewayFrame {
    GatewayFrame::dispatch(
        "MESSAGE_CREATE",
        sequence,
        json!({
            "id": "200",
            "channel_id": "300",
            "guild_id": "100",
            "author": { "id": "2", "username": "someone" },
            "content": content,
            "timestamp": "2024-01-01T00:00:00+00:00",
            "tts": false,
            "mention_everyone": false,
            "mentions": []
        }),
    )
}

/// Slash command invocation of `name` in guild 100
pub fn command_interaction(sequence: u64, name: &str) -> GatewayFrame {
    GatewayFrame::dispatch(
        "INTERACTION_CREATE",
        sequence,
        json!({
            "id": "400",
            "application_id": "99",
            "type": 2,
            "data": { "id": "500", "name": name, "type": 1 },
            "guild_id": "100",
            "channel_id": "300",
            "member": { "user": { "id": "2", "username": "someone" }, "roles": [] },
            "token": "interaction-token",
            "version": 1
        }),
    )
}
