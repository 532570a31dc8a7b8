//! Channel behaviour over the in-memory transport, on a paused clock.

mod common;

use std::time::Duration;

use anyhow::Result;
use resilient_ws::{Channel, ChannelConfig, ConnectionState, TransportEvent};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep, timeout};

use common::{MemoryTransport, NoTransport, init_tracing};

const INTERVAL: Duration = Duration::from_millis(2000);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_millis(2000);
const DELAY: Duration = Duration::from_millis(2000);
const MS: Duration = Duration::from_millis(1);

// ============================================================================
// Helpers
// ============================================================================

fn open_channel(transport: &MemoryTransport) -> Channel {
    init_tracing();
    Channel::new(ChannelConfig::new().with_url("ws://x"), transport.clone())
        .expect("valid config")
}

async fn wait_state(channel: &Channel, state: ConnectionState) {
    channel
        .watch_state()
        .wait_for(|current| *current == state)
        .await
        .expect("connection task alive");
}

/// Lets the connection task drain everything already sent to it.
async fn settle(channel: &Channel) {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
    let _ = channel.queued().await;
}

async fn connect_and_open(channel: &Channel, transport: &MemoryTransport) {
    let before = transport.open_count();
    channel.init(None);
    wait_state(channel, ConnectionState::Connecting).await;
    settle(channel).await;
    assert_eq!(transport.open_count(), before + 1);
    transport.open_latest();
    channel.wait_until_open().await.expect("opens");
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_send_while_open_is_written_directly() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);

    channel.init(Some("ws://x"));
    wait_state(&channel, ConnectionState::Connecting).await;
    transport.open_latest();
    channel.wait_until_open().await?;
    assert!(channel.ready());

    channel.send_message("hello");
    settle(&channel).await;

    assert_eq!(transport.sent(), ["hello"]);
    assert_eq!(channel.queued().await, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_queued_messages_flush_before_first_probe() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);

    channel.send_message("a");
    channel.send_message("b");
    assert_eq!(channel.queued().await, 2);
    assert!(!channel.ready());

    connect_and_open(&channel, &transport).await;
    channel.send_message("c");
    settle(&channel).await;
    assert_eq!(transport.sent(), ["a", "b", "c"]);

    sleep(INTERVAL + MS).await;
    assert_eq!(transport.sent(), ["a", "b", "c", "ping"]);
    Ok(())
}

// ============================================================================
// Reconnection
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_error_while_open_reconnects_once_after_delay() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);
    connect_and_open(&channel, &transport).await;

    let lost_at = Instant::now();
    transport.emit(TransportEvent::Error("connection reset".into()));
    wait_state(&channel, ConnectionState::Reconnecting).await;
    assert!(!channel.ready());

    wait_state(&channel, ConnectionState::Connecting).await;
    let elapsed = lost_at.elapsed();
    assert!(elapsed >= DELAY, "reconnected too early: {elapsed:?}");
    assert!(elapsed < DELAY + 10 * MS, "reconnected too late: {elapsed:?}");
    assert_eq!(transport.open_count(), 2);
    assert!(transport.closed().is_empty());

    sleep(DELAY * 3).await;
    assert_eq!(transport.open_count(), 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_failures_from_one_handle_reconnects_once() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);
    connect_and_open(&channel, &transport).await;

    transport.emit(TransportEvent::Error("a".into()));
    transport.emit(TransportEvent::Close(None));
    transport.emit(TransportEvent::Error("b".into()));
    wait_state(&channel, ConnectionState::Reconnecting).await;

    sleep(DELAY * 3).await;
    assert_eq!(transport.open_count(), 2);
    assert_eq!(channel.state(), ConnectionState::Connecting);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_messages_sent_during_outage_flush_on_reconnect() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);
    connect_and_open(&channel, &transport).await;

    transport.emit(TransportEvent::Close(Some("going away".into())));
    wait_state(&channel, ConnectionState::Reconnecting).await;
    channel.send_message("m1");
    channel.send_message("m2");
    assert_eq!(channel.queued().await, 2);

    wait_state(&channel, ConnectionState::Connecting).await;
    transport.open_latest();
    channel.wait_until_open().await?;
    channel.send_message("m3");
    settle(&channel).await;

    assert_eq!(transport.sent(), ["m1", "m2", "m3"]);
    Ok(())
}

// ============================================================================
// Heartbeat
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_missed_heartbeat_forces_reconnect() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);
    connect_and_open(&channel, &transport).await;

    sleep(INTERVAL + HEARTBEAT_TIMEOUT + MS).await;
    assert_eq!(channel.state(), ConnectionState::Reconnecting);
    assert_eq!(transport.sent(), ["ping"]);
    assert_eq!(transport.closed().len(), 1);

    sleep(DELAY).await;
    assert_eq!(transport.open_count(), 2);
    assert_eq!(channel.state(), ConnectionState::Connecting);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pong_keeps_connection_alive() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);
    connect_and_open(&channel, &transport).await;

    for round in 1..=5 {
        sleep(INTERVAL + 100 * MS).await;
        assert_eq!(transport.sent().len(), round);
        transport.emit(TransportEvent::Message("pong".into()));
        settle(&channel).await;
        assert_eq!(channel.state(), ConnectionState::Open);
    }

    assert_eq!(transport.open_count(), 1);
    assert!(transport.sent().iter().all(|p| p == "ping"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_timeout_can_be_disabled() -> Result<()> {
    init_tracing();
    let transport = MemoryTransport::new();
    let config = ChannelConfig::new()
        .with_url("ws://x")
        .without_heartbeat_timeout();
    let channel = Channel::new(config, transport.clone())?;
    connect_and_open(&channel, &transport).await;

    sleep(INTERVAL * 10).await;
    assert_eq!(channel.state(), ConnectionState::Open);
    assert_eq!(transport.sent(), ["ping"]);
    Ok(())
}

// ============================================================================
// Application Data
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_application_payloads_reach_handler() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();
    channel.set_message_handler(move |value| {
        let _ = tx.send(value);
    });
    connect_and_open(&channel, &transport).await;

    transport.emit(TransportEvent::Message("definitely not json".into()));
    transport.emit(TransportEvent::Message(r#"{"event":"tick","seq":7}"#.into()));

    let value = timeout(Duration::from_secs(1), rx.recv()).await?;
    assert_eq!(value, Some(json!({"event": "tick", "seq": 7})));
    assert_eq!(channel.state(), ConnectionState::Open);

    channel.clear_message_handler();
    transport.emit(TransportEvent::Message(r#"{"event":"tock"}"#.into()));
    settle(&channel).await;
    assert!(rx.try_recv().is_err());
    Ok(())
}

// ============================================================================
// Close & Shutdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_close_does_not_reconnect() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);
    connect_and_open(&channel, &transport).await;

    channel.close();
    wait_state(&channel, ConnectionState::Idle).await;
    assert_eq!(transport.closed().len(), 1);

    sleep(DELAY * 3).await;
    assert_eq!(transport.open_count(), 1);
    assert_eq!(channel.state(), ConnectionState::Idle);

    channel.send_message("later");
    assert_eq!(channel.queued().await, 1);
    connect_and_open(&channel, &transport).await;
    settle(&channel).await;
    assert_eq!(transport.sent(), ["later"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_pending_reconnect() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);
    connect_and_open(&channel, &transport).await;

    transport.emit(TransportEvent::Error("gone".into()));
    wait_state(&channel, ConnectionState::Reconnecting).await;
    channel.close();
    wait_state(&channel, ConnectionState::Idle).await;

    sleep(DELAY * 3).await;
    assert_eq!(transport.open_count(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_transport_and_stops_task() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);
    connect_and_open(&channel, &transport).await;

    channel.shutdown();
    assert!(channel.wait_until_open().await.is_err());
    assert_eq!(transport.closed().len(), 1);

    channel.send_message("dropped");
    assert_eq!(channel.queued().await, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dropping_last_handle_closes_transport() -> Result<()> {
    let transport = MemoryTransport::new();
    let channel = open_channel(&transport);
    connect_and_open(&channel, &transport).await;

    let clone = channel.clone();
    drop(channel);
    settle(&clone).await;
    assert!(transport.closed().is_empty());

    drop(clone);
    sleep(MS).await;
    assert_eq!(transport.closed().len(), 1);
    Ok(())
}

// ============================================================================
// Capability
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_unsupported_platform_init_is_noop() -> Result<()> {
    init_tracing();
    let channel = Channel::new(ChannelConfig::new().with_url("ws://x"), NoTransport)?;

    channel.init(None);
    channel.init(Some("ws://y"));
    channel.send_message("kept");
    settle(&channel).await;

    assert_eq!(channel.state(), ConnectionState::Idle);
    assert_eq!(channel.queued().await, 1);

    sleep(DELAY * 3).await;
    assert_eq!(channel.state(), ConnectionState::Idle);
    Ok(())
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = ChannelConfig::new().with_reconnect_delay(Duration::ZERO);
    assert!(Channel::new(config, MemoryTransport::new()).is_err());

    let config = ChannelConfig::new().with_url("ftp://x");
    assert!(Channel::websocket(config).is_err());
}
