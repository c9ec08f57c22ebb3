//! Client scenarios
//!
//! The high-level client against the fake gateway transport and a fake REST API
//! on a local port. These run in real time because they do real HTTP.
//!
//! Run with: cargo test -p integration-tests --test client_tests

use std::sync::Arc;

use discord_client::events::{MessageCreateEvent, ReadyEvent};
use discord_client::{ApplicationCommand, Client, Context, Intents, Token};
use discord_gateway::protocol::OpCode;
use integration_tests::*;
use tokio::sync::mpsc;

// ============================================================================
// Event handlers
// ============================================================================

#[tokio::test]
async fn test_handlers_run_once_in_registration_order() {
    let (connector, mut servers) = FakeConnector::new();
    let (tx, mut calls) = mpsc::unbounded_channel::<&'static str>();
    let first = tx.clone();
    let second = tx;

    let client = Client::builder(Token::bot(TOKEN))
        .gateway_url(GATEWAY_URL)
        .connector(connector.clone())
        .on(move |_ctx: Context, _msg: Arc<MessageCreateEvent>| {
            let calls = first.clone();
            async move {
                let _ = calls.send("h1");
                anyhow::bail!("h1 failed")
            }
        })
        .on(move |_ctx: Context, msg: Arc<MessageCreateEvent>| {
            let calls = second.clone();
            async move {
                assert_eq!(msg.content, "hello");
                let _ = calls.send("h2");
                anyhow::Ok(())
            }
        })
        .build()
        .unwrap();

    let runner = client.connect().await.unwrap();
    let handle = runner.handle();
    let task = tokio::spawn(runner.run());

    let mut server = next_server(&mut servers).await;
    assert_eq!(server.url, endpoint(GATEWAY_URL));
    server.send(&hello(45_000));
    server.expect(OpCode::Identify).await;
    server.send(&ready(1, "abc", 99));
    server.send(&message_create(2, "hello"));

    let mut seen = Vec::new();
    for _ in 0..2 {
        let call = tokio::time::timeout(WAIT, calls.recv()).await.unwrap().unwrap();
        seen.push(call);
    }
    assert_eq!(seen, vec!["h1", "h2"]);

    // A failing handler does not end the session
    server.send(&message_create(3, "hello"));
    let call = tokio::time::timeout(WAIT, calls.recv()).await.unwrap().unwrap();
    assert_eq!(call, "h1");

    handle.close();
    task.await.unwrap().unwrap();
    assert_eq!(connector.urls().len(), 1);
}

#[tokio::test]
async fn test_ready_handler_sees_session() {
    let (connector, mut servers) = FakeConnector::new();
    let (tx, mut sessions) = mpsc::unbounded_channel::<String>();

    let client = Client::builder(Token::bot(TOKEN))
        .gateway_url(GATEWAY_URL)
        .connector(connector.clone())
        .on(move |ctx: Context, ready: Arc<ReadyEvent>| {
            let sessions = tx.clone();
            async move {
                assert_eq!(ctx.shard().session_id().as_deref(), Some("abc"));
                let _ = sessions.send(ready.user.username.clone());
                anyhow::Ok(())
            }
        })
        .build()
        .unwrap();

    let runner = client.connect().await.unwrap();
    let handle = runner.handle();
    let task = tokio::spawn(runner.run());

    let mut server = next_server(&mut servers).await;
    server.send(&hello(45_000));
    server.expect(OpCode::Identify).await;
    server.send(&ready(1, "abc", 99));

    let username = tokio::time::timeout(WAIT, sessions.recv()).await.unwrap().unwrap();
    assert_eq!(username, "test-bot");

    handle.close();
    task.await.unwrap().unwrap();
}

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn test_bootstrap_from_gateway_bot() {
    let mut api = FakeApi::start(GATEWAY_URL, 2).await.unwrap();
    let (connector, mut servers) = FakeConnector::new();

    let client = Client::builder(Token::bot(GOOD_TOKEN))
        .api_base_url(api.base_url())
        .connector(connector.clone())
        .build()
        .unwrap();

    let runner = client.connect().await.unwrap();
    assert_eq!(api.next_call().await.path, "/gateway/bot");
    assert_eq!(runner.shard_config().gateway_url, GATEWAY_URL);
    assert_eq!(runner.shard_config().shard, Some([0, 2]));

    let handle = runner.handle();
    let task = tokio::spawn(runner.run());

    let mut server = next_server(&mut servers).await;
    assert_eq!(server.url, endpoint(GATEWAY_URL));
    server.send(&hello(45_000));
    let identify = server.expect(OpCode::Identify).await;
    let d = identify.d.unwrap();
    assert_eq!(d["token"], GOOD_TOKEN);
    assert_eq!(d["shard"], serde_json::json!([0, 2]));

    handle.close();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_configured_shard_not_overridden() {
    let mut api = FakeApi::start(GATEWAY_URL, 4).await.unwrap();
    let (connector, _servers) = FakeConnector::new();

    let runner = Client::builder(Token::bot(GOOD_TOKEN))
        .api_base_url(api.base_url())
        .shard(1, 3)
        .connector(connector)
        .build()
        .unwrap()
        .connect()
        .await
        .unwrap();

    api.next_call().await;
    assert_eq!(runner.shard_config().shard, Some([1, 3]));
}

#[tokio::test]
async fn test_bootstrap_rejects_bad_token() {
    let mut api = FakeApi::start(GATEWAY_URL, 1).await.unwrap();
    let (connector, _servers) = FakeConnector::new();

    let error = Client::builder(Token::bot("wrong"))
        .api_base_url(api.base_url())
        .connector(connector.clone())
        .build()
        .unwrap()
        .connect()
        .await
        .unwrap_err();

    assert!(error.is_authentication_failure(), "{error}");
    assert_eq!(api.next_call().await.path, "/gateway/bot");
    assert!(connector.urls().is_empty());
}

#[tokio::test]
async fn test_gateway_close_4004_surfaces_as_authentication_failure() {
    let (connector, mut servers) = FakeConnector::new();

    let runner = Client::builder(Token::bot(TOKEN))
        .gateway_url(GATEWAY_URL)
        .intents(Intents::GUILDS)
        .connector(connector)
        .build()
        .unwrap()
        .connect()
        .await
        .unwrap();
    let task = tokio::spawn(runner.run());

    let mut server = next_server(&mut servers).await;
    server.send(&hello(45_000));
    let identify = server.expect(OpCode::Identify).await;
    assert_eq!(identify.d.unwrap()["intents"], 1);
    server.close(4004);

    let error = task.await.unwrap().unwrap_err();
    assert!(error.is_authentication_failure());
}

// ============================================================================
// Slash commands
// ============================================================================

#[tokio::test]
async fn test_slash_command_round_trip() {
    let mut api = FakeApi::start(GATEWAY_URL, 1).await.unwrap();
    let (connector, mut servers) = FakeConnector::new();

    let client = Client::builder(Token::bot(GOOD_TOKEN))
        .api_base_url(api.base_url())
        .gateway_url(GATEWAY_URL)
        .connector(connector)
        .command(ApplicationCommand::new("ping", "Check the bot"), |cmd| async move {
            cmd.respond("Pong!").await?;
            Ok(())
        })
        .build()
        .unwrap();

    let runner = client.connect().await.unwrap();
    let handle = runner.handle();
    let task = tokio::spawn(runner.run());

    let mut server = next_server(&mut servers).await;
    server.send(&hello(45_000));
    server.expect(OpCode::Identify).await;
    server.send(&ready(1, "abc", 99));

    // Definitions are pushed once READY names the application
    let sync = api.next_call().await;
    assert_eq!(sync.method, "PUT");
    assert_eq!(sync.path, "/applications/99/commands");
    let body = sync.body.unwrap();
    assert_eq!(body[0]["name"], "ping");
    assert_eq!(body[0]["description"], "Check the bot");

    server.send(&command_interaction(2, "ping"));
    let callback = api.next_call().await;
    assert_eq!(callback.method, "POST");
    assert_eq!(callback.path, "/interactions/400/interaction-token/callback");
    let body = callback.body.unwrap();
    assert_eq!(body["type"], 4);
    assert_eq!(body["data"]["content"], "Pong!");

    // A command nobody registered is ignored
    server.send(&command_interaction(3, "unknown"));
    server.send(&command_interaction(4, "ping"));
    let callback = api.next_call().await;
    assert_eq!(callback.method, "POST");

    handle.close();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_commands_synced_once_across_resumes() {
    let mut api = FakeApi::start(GATEWAY_URL, 1).await.unwrap();
    let (connector, mut servers) = FakeConnector::new();

    let client = Client::builder(Token::bot(GOOD_TOKEN))
        .api_base_url(api.base_url())
        .gateway_url(GATEWAY_URL)
        .connector(connector)
        .command(ApplicationCommand::new("ping", "Check the bot"), |cmd| async move {
            cmd.respond("Pong!").await?;
            Ok(())
        })
        .build()
        .unwrap();

    let runner = client.connect().await.unwrap();
    let handle = runner.handle();
    let task = tokio::spawn(runner.run());

    let mut first = next_server(&mut servers).await;
    first.send(&hello(45_000));
    first.expect(OpCode::Identify).await;
    first.send(&ready(1, "abc", 99));
    assert_eq!(api.next_call().await.path, "/applications/99/commands");

    // A fresh session delivers READY again; nothing is re-synced
    first.send(&invalid_session(false));
    let mut second = next_server(&mut servers).await;
    second.send(&hello(45_000));
    second.expect(OpCode::Identify).await;
    second.send(&ready(1, "def", 99));
    second.send(&command_interaction(2, "ping"));

    let next = api.next_call().await;
    assert_eq!(next.method, "POST");

    handle.close();
    task.await.unwrap().unwrap();
}
