//! Gateway session scenarios
//!
//! A shard runs against the in-memory transport; the test plays the server.
//! Timers run on paused tokio time so heartbeat timeouts and backoff resolve
//! instantly.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use discord_common::Token;
use discord_core::Intents;
use discord_gateway::protocol::{GatewayFrame, OpCode};
use discord_gateway::transport::{CloseFrame, Outbound};
use discord_gateway::{GatewayError, GatewayErrorKind, ReconnectPolicy, SessionState, Shard, ShardConfig};
use integration_tests::*;
use serde_json::json;

fn config() -> ShardConfig {
    ShardConfig::new(Token::bot(TOKEN), Intents::DEFAULT)
        .with_gateway_url(GATEWAY_URL)
        .with_heartbeat_timeout(Duration::from_secs(5))
        .with_reconnect(ReconnectPolicy {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
            max_attempts: 3,
        })
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_identify_ready_and_close() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut server = next_server(&mut servers).await;
    assert_eq!(server.url, endpoint(GATEWAY_URL));

    server.send(&hello(45_000));
    let identify = server.expect(OpCode::Identify).await;
    let d = identify.d.unwrap();
    assert_eq!(d["token"], TOKEN);
    assert_eq!(d["intents"], 513);
    assert_eq!(d["properties"]["browser"], "discord-gateway");

    server.send(&ready(1, "abc", 99));
    let (name, payload) = next_event(&mut events).await;
    assert_eq!(name, "READY");
    assert_eq!(payload.unwrap()["session_id"], "abc");
    assert_eq!(handle.state(), SessionState::Ready);
    assert_eq!(handle.session_id().as_deref(), Some("abc"));
    assert_eq!(handle.sequence(), Some(1));

    assert!(handle.close());
    let close = server.expect_close().await;
    assert_eq!(close.code, 1000);

    task.await.unwrap().unwrap();
    assert_eq!(handle.state(), SessionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_close_before_hello_sends_no_handshake() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, _events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut server = next_server(&mut servers).await;
    assert!(handle.close());
    server.send(&hello(45_000));

    task.await.unwrap().unwrap();
    assert_eq!(server.drain().await, vec![Outbound::Close(CloseFrame::normal())]);
    assert_eq!(handle.state(), SessionState::Closed);
    assert_eq!(connector.urls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_close_while_connecting() {
    let (connector, _servers) = FakeConnector::new();
    connector.stall_connections(true);
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, _events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    while connector.urls().is_empty() {
        tokio::task::yield_now().await;
    }
    assert!(handle.close());
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .expect("close ignored while connecting")
        .unwrap()
        .unwrap();
    assert_eq!(handle.state(), SessionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_first_frame_must_be_hello() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let (sink, _events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut server = next_server(&mut servers).await;
    server.send(&ready(1, "abc", 99));

    let error = task.await.unwrap().unwrap_err();
    assert_eq!(error.kind(), GatewayErrorKind::ProtocolViolation);
    assert!(matches!(
        error,
        GatewayError::UnexpectedFrame {
            expected: OpCode::Hello,
            actual: OpCode::Dispatch
        }
    ));

    // Nothing was sent, not even a close frame
    assert!(server.drain().await.is_empty());
    assert_eq!(connector.urls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frame_is_fatal() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let (sink, _events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let server = next_server(&mut servers).await;
    server.send_text("{not json");

    let error = task.await.unwrap().unwrap_err();
    assert_eq!(error.kind(), GatewayErrorKind::ProtocolViolation);
}

// ============================================================================
// Sequence tracking and heartbeats
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_sequence_updated_before_dispatch_and_echoed_in_heartbeat() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut server = next_server(&mut servers).await;
    server.send(&hello(45_000));
    server.expect(OpCode::Identify).await;
    server.send(&ready(1, "abc", 99));
    next_event(&mut events).await;

    server.send(&message_create(7, "hi"));
    let (name, _) = next_event(&mut events).await;
    assert_eq!(name, "MESSAGE_CREATE");
    assert_eq!(handle.sequence(), Some(7));

    // Frames without a sequence (ACK, heartbeat request) leave it unchanged
    server.send(&heartbeat_ack());
    server.send(&heartbeat_request());
    let heartbeat = server.expect(OpCode::Heartbeat).await;
    assert_eq!(heartbeat.d, Some(json!(7)));

    handle.close();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_acked_heartbeats_keep_connection() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut server = next_server(&mut servers).await;
    server.send(&hello(1_000));
    server.expect(OpCode::Identify).await;
    server.send(&ready(3, "abc", 99));
    next_event(&mut events).await;

    for _ in 0..5 {
        let heartbeat = server.expect(OpCode::Heartbeat).await;
        assert_eq!(heartbeat.d, Some(json!(3)));
        server.send(&heartbeat_ack());
    }

    assert!(handle.latency().is_some());
    assert_eq!(handle.state(), SessionState::Ready);
    assert_eq!(connector.urls().len(), 1);

    handle.close();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_missing_acks_trigger_resume() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut first = next_server(&mut servers).await;
    first.send(&hello(1_000));
    first.expect(OpCode::Identify).await;
    first.send(&ready(4, "abc", 99));
    next_event(&mut events).await;

    // Never ACK; the heartbeat timeout tears the connection down
    first.expect(OpCode::Heartbeat).await;
    let close = first.expect_close().await;
    assert_eq!(close.code, 4000);

    let mut second = next_server(&mut servers).await;
    assert_eq!(second.url, endpoint(RESUME_URL));
    second.send(&hello(45_000));
    let resume = second.expect(OpCode::Resume).await;
    assert_eq!(
        resume.d,
        Some(json!({ "token": TOKEN, "session_id": "abc", "seq": 4 }))
    );

    handle.close();
    task.await.unwrap().unwrap();
}

// ============================================================================
// Resume and re-identify
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_resume_after_retryable_close() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut first = next_server(&mut servers).await;
    first.send(&hello(45_000));
    first.expect(OpCode::Identify).await;
    first.send(&ready(1, "abc", 99));
    first.send(&message_create(42, "hello"));
    next_event(&mut events).await;
    next_event(&mut events).await;

    first.close(4000);

    let mut second = next_server(&mut servers).await;
    assert_eq!(second.url, endpoint(RESUME_URL));
    second.send(&hello(45_000));
    let resume = second.expect(OpCode::Resume).await;
    assert_eq!(
        resume.d,
        Some(json!({ "token": TOKEN, "session_id": "abc", "seq": 42 }))
    );

    second.send(&resumed(43));
    let (name, _) = next_event(&mut events).await;
    assert_eq!(name, "RESUMED");
    assert_eq!(handle.state(), SessionState::Ready);
    assert_eq!(handle.sequence(), Some(43));

    handle.close();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_request_resumes() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut first = next_server(&mut servers).await;
    first.send(&hello(45_000));
    first.expect(OpCode::Identify).await;
    first.send(&ready(5, "abc", 99));
    next_event(&mut events).await;

    first.send(&reconnect());
    assert_eq!(first.expect_close().await.code, 4000);

    let mut second = next_server(&mut servers).await;
    second.send(&hello(45_000));
    let resume = second.expect(OpCode::Resume).await;
    assert_eq!(resume.d.unwrap()["seq"], 5);

    handle.close();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_invalid_session_reidentifies() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut first = next_server(&mut servers).await;
    first.send(&hello(45_000));
    first.expect(OpCode::Identify).await;
    first.send(&ready(1, "abc", 99));
    next_event(&mut events).await;

    first.send(&invalid_session(false));

    let mut second = next_server(&mut servers).await;
    assert_eq!(second.url, endpoint(GATEWAY_URL));
    assert_eq!(handle.session_id(), None);
    second.send(&hello(45_000));
    second.expect(OpCode::Identify).await;

    second.send(&ready(1, "def", 99));
    next_event(&mut events).await;
    assert_eq!(handle.session_id().as_deref(), Some("def"));

    handle.close();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_reidentify_close_code_drops_session() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut first = next_server(&mut servers).await;
    first.send(&hello(45_000));
    first.expect(OpCode::Identify).await;
    first.send(&ready(1, "abc", 99));
    next_event(&mut events).await;

    // Session timed out
    first.close(4009);

    let mut second = next_server(&mut servers).await;
    assert_eq!(second.url, endpoint(GATEWAY_URL));
    second.send(&hello(45_000));
    second.expect(OpCode::Identify).await;

    handle.close();
    task.await.unwrap().unwrap();
}

// ============================================================================
// Fatal outcomes
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_authentication_failure_is_fatal() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let (sink, _events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut server = next_server(&mut servers).await;
    server.send(&hello(45_000));
    server.expect(OpCode::Identify).await;
    server.close(4004);

    let error = task.await.unwrap().unwrap_err();
    assert_eq!(error.kind(), GatewayErrorKind::AuthenticationFailure);
    assert_eq!(connector.urls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_remote_normal_close_ends_session() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut server = next_server(&mut servers).await;
    server.send(&hello(45_000));
    server.expect(OpCode::Identify).await;
    server.send(&ready(1, "abc", 99));
    next_event(&mut events).await;
    server.close(1000);

    let error = task.await.unwrap().unwrap_err();
    assert!(matches!(error, GatewayError::FatalClose { code: 1000, .. }), "{error}");
    assert_eq!(error.kind(), GatewayErrorKind::FatalClose);
    assert_eq!(connector.urls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disallowed_intents_is_fatal() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let (sink, _events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut server = next_server(&mut servers).await;
    server.send(&hello(45_000));
    server.expect(OpCode::Identify).await;
    server.close(4014);

    let error = task.await.unwrap().unwrap_err();
    assert_eq!(error.kind(), GatewayErrorKind::FatalClose);
    assert!(matches!(error, GatewayError::FatalClose { code: 4014, .. }));
}

#[tokio::test(start_paused = true)]
async fn test_retries_exhausted() {
    let (connector, _servers) = FakeConnector::new();
    connector.refuse_connections(true);
    let shard = Shard::new(config(), connector.clone());
    let (sink, _events) = EventLog::new();

    let error = shard.run(sink).await.unwrap_err();
    assert_eq!(error.kind(), GatewayErrorKind::RetriesExhausted);
    match error {
        GatewayError::RetriesExhausted { attempts, last } => {
            assert_eq!(attempts, 4);
            assert_eq!(last.kind(), GatewayErrorKind::TransportClosed);
        }
        other => panic!("unexpected error {other:?}"),
    }

    // The first attempt plus three reconnects
    assert_eq!(connector.urls().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_ready_resets_attempt_counter() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    // More drops than max_attempts, each after a successful READY
    for round in 0..5 {
        let mut server = next_server(&mut servers).await;
        server.send(&hello(45_000));
        if round == 0 {
            server.expect(OpCode::Identify).await;
            server.send(&ready(1, "abc", 99));
        } else {
            server.expect(OpCode::Resume).await;
            server.send(&resumed(1));
        }
        next_event(&mut events).await;
        server.close(4000);
    }

    let mut server = next_server(&mut servers).await;
    server.send(&hello(45_000));
    server.expect(OpCode::Resume).await;

    handle.close();
    task.await.unwrap().unwrap();
}

// ============================================================================
// Presence
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_presence_update_sent_and_remembered() {
    use discord_core::{Activity, Status};
    use discord_gateway::PresenceUpdatePayload;

    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut first = next_server(&mut servers).await;
    first.send(&hello(45_000));
    first.expect(OpCode::Identify).await;
    first.send(&ready(1, "abc", 99));
    next_event(&mut events).await;

    let presence = PresenceUpdatePayload::new(Status::DoNotDisturb)
        .with_activity(Activity::playing("chess"));
    assert!(handle.update_presence(presence));
    let update = first.expect(OpCode::PresenceUpdate).await;
    let d = update.d.unwrap();
    assert_eq!(d["status"], "dnd");
    assert_eq!(d["activities"][0]["name"], "chess");

    // A fresh Identify carries the new presence
    first.send(&invalid_session(false));
    let mut second = next_server(&mut servers).await;
    second.send(&hello(45_000));
    let identify = second.expect(OpCode::Identify).await;
    assert_eq!(identify.d.unwrap()["presence"]["status"], "dnd");

    handle.close();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_close_during_backoff() {
    let (connector, _servers) = FakeConnector::new();
    connector.refuse_connections(true);
    let config = config().with_reconnect(ReconnectPolicy {
        base_delay: Duration::from_secs(30),
        max_delay: Duration::from_secs(60),
        max_attempts: 10,
    });
    let shard = Shard::new(config, connector.clone());
    let handle = shard.handle();
    let (sink, _events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    tokio::task::yield_now().await;
    assert!(handle.close());
    task.await.unwrap().unwrap();
    assert_eq!(handle.state(), SessionState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_old_connection_ends_with_close_frame() {
    let (connector, mut servers) = FakeConnector::new();
    let shard = Shard::new(config(), connector.clone());
    let handle = shard.handle();
    let (sink, mut events) = EventLog::new();
    let task = tokio::spawn(shard.run(sink));

    let mut first = next_server(&mut servers).await;
    first.send(&hello(1_000));
    first.expect(OpCode::Identify).await;
    first.send(&ready(1, "abc", 99));
    next_event(&mut events).await;
    first.close(4000);

    // Only heartbeats may precede the close frame, and nothing follows it
    let leftovers = first.drain().await;
    let (last, rest) = leftovers.split_last().expect("no close frame");
    assert_eq!(last, &Outbound::Close(CloseFrame::new(4000, "reconnecting")));
    for message in rest {
        let Outbound::Text(text) = message else {
            panic!("unexpected {message:?}");
        };
        assert_eq!(GatewayFrame::decode(text).unwrap().op, OpCode::Heartbeat);
    }

    // The new connection starts with Resume
    let mut second = next_server(&mut servers).await;
    second.send(&hello(45_000));
    match second.recv().await {
        Some(Outbound::Text(text)) => {
            assert_eq!(GatewayFrame::decode(&text).unwrap().op, OpCode::Resume);
        }
        other => panic!("expected Resume, got {other:?}"),
    }

    handle.close();
    task.await.unwrap().unwrap();
}
