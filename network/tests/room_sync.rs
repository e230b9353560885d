// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end checks over real sockets: join, broadcast, debounce and
//! disconnect

use anyhow::Result;
use goboard_network::{Event, ServerConfig};
use serde_json::json;
use std::time::Duration;

mod common;
use common::{quiet_config, registry, start_server, TestClient};

fn stone(x: u8, y: u8, color: u8) -> Event {
    Event::new("add_stone", json!({"coords": [x, y], "color": color}))
}

#[tokio::test]
async fn join_sends_full_frame_then_users() -> Result<()> {
    let addr = start_server(registry(quiet_config())).await?;
    let mut alice = TestClient::join(addr, "lobby").await?;

    let first = alice.recv().await?;
    assert_eq!(first.event, "frame");
    assert_eq!(first.value["type"], json!(1));

    let users = alice.recv_named("connected_users").await?;
    assert_eq!(users.value.as_object().map(|m| m.len()), Some(1));
    Ok(())
}

#[tokio::test]
async fn moves_reach_every_client() -> Result<()> {
    let addr = start_server(registry(quiet_config())).await?;
    let mut alice = TestClient::join(addr, "game").await?;
    alice.recv_named("connected_users").await?;
    let mut bob = TestClient::join(addr, "game").await?;
    bob.recv_named("connected_users").await?;
    let users = alice.recv_named("connected_users").await?;
    assert_eq!(users.value.as_object().map(|m| m.len()), Some(2));

    alice.send(stone(2, 2, 1)).await?;
    for client in [&mut alice, &mut bob] {
        let frame = client.recv_named("frame").await?;
        assert_eq!(frame.value["type"], json!(0));
        assert!(!frame.value["diff"].is_null());
    }
    Ok(())
}

#[tokio::test]
async fn rooms_are_isolated() -> Result<()> {
    let addr = start_server(registry(quiet_config())).await?;
    let mut alice = TestClient::join(addr, "one").await?;
    alice.recv_named("connected_users").await?;
    let mut carol = TestClient::join(addr, "two").await?;
    carol.recv_named("connected_users").await?;

    alice.send(stone(4, 4, 1)).await?;
    alice.recv_named("frame").await?;
    assert!(carol.is_silent(Duration::from_millis(200)).await);
    Ok(())
}

#[tokio::test]
async fn errors_only_reach_the_sender() -> Result<()> {
    let addr = start_server(registry(quiet_config())).await?;
    let mut alice = TestClient::join(addr, "errs").await?;
    alice.recv_named("connected_users").await?;
    let mut bob = TestClient::join(addr, "errs").await?;
    bob.recv_named("connected_users").await?;
    alice.recv_named("connected_users").await?;

    bob.send(Event::new("goto_grid", json!("nope"))).await?;
    let err = bob.recv_named("error").await?;
    assert!(err.value.is_string());
    assert!(alice.is_silent(Duration::from_millis(200)).await);
    Ok(())
}

#[tokio::test]
async fn other_users_wait_out_the_input_buffer() -> Result<()> {
    let config = ServerConfig {
        input_buffer_ms: 60_000,
        user_buffer_ms: 0,
        ..ServerConfig::default()
    };
    let addr = start_server(registry(config)).await?;
    let mut alice = TestClient::join(addr, "busy").await?;
    alice.recv_named("connected_users").await?;
    let mut bob = TestClient::join(addr, "busy").await?;
    bob.recv_named("connected_users").await?;
    alice.recv_named("connected_users").await?;

    // bob joined last, so bob holds the board
    bob.send(stone(0, 0, 1)).await?;
    bob.recv_named("frame").await?;
    alice.recv_named("frame").await?;

    alice.send(stone(1, 1, 2)).await?;
    assert!(alice.is_silent(Duration::from_millis(200)).await);
    assert!(bob.is_silent(Duration::from_millis(50)).await);

    bob.send(stone(1, 1, 2)).await?;
    bob.recv_named("frame").await?;
    Ok(())
}

#[tokio::test]
async fn leaving_updates_the_user_list() -> Result<()> {
    let addr = start_server(registry(quiet_config())).await?;
    let mut alice = TestClient::join(addr, "bye").await?;
    alice.recv_named("connected_users").await?;
    let mut bob = TestClient::join(addr, "bye").await?;
    bob.recv_named("connected_users").await?;
    alice.recv_named("connected_users").await?;

    drop(bob);
    let users = alice.recv_named("connected_users").await?;
    assert_eq!(users.value.as_object().map(|m| m.len()), Some(1));
    Ok(())
}

#[tokio::test]
async fn first_frame_must_be_join() -> Result<()> {
    let addr = start_server(registry(quiet_config())).await?;
    let stream = tokio::net::TcpStream::connect(addr).await?;
    let (mut reader, mut writer) = stream.into_split();
    goboard_network::codec::write_event(&mut writer, &Event::new("ping", json!(null))).await?;
    let reply = tokio::time::timeout(
        Duration::from_secs(2),
        goboard_network::codec::read_event(&mut reader, 1024),
    )
    .await?;
    assert!(matches!(reply, Ok(None) | Err(_)));
    Ok(())
}

#[tokio::test]
async fn nicknames_are_shared() -> Result<()> {
    let addr = start_server(registry(quiet_config())).await?;
    let mut alice = TestClient::join(addr, "names").await?;
    alice.recv_named("connected_users").await?;

    alice.send(Event::new("update_nickname", json!("alice"))).await?;
    let users = alice.recv_named("connected_users").await?;
    let names: Vec<_> = users
        .value
        .as_object()
        .map(|m| m.values().cloned().collect())
        .unwrap_or_default();
    assert_eq!(names, vec![json!("alice")]);
    Ok(())
}
