// crates/xornet-client/tests/driver_tests.rs

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;
use xornet_client::{MemoryTokenHolder, SyncDriver};
use xornet_core::{ConnectionState, EntityId, EventKind, SharedStore};
use xornet_protocol::ServerEvent;

use common::{settings, settle, FakeConnector, Harness};

#[tokio::test(start_paused = true)]
async fn login_heartbeat_and_telemetry_end_to_end() {
    let mut h = Harness::start(Some("tok-123"));

    h.handle.connect();
    let mut socket = h.next_socket().await;
    socket.open();
    settle().await;

    assert_eq!(socket.sent(), vec![json!({ "e": "login", "d": { "auth_token": "tok-123" } })]);
    assert_eq!(h.handle.status().state, ConnectionState::Authenticating);
    assert!(h.handle.status().last_heartbeat.is_none());

    socket.frame(r#"{"e":"heartbeat"}"#);
    socket.frame(r#"{"e":"machineData","d":{"uuid":"A","cpu":10}}"#);
    socket.frame(r#"{"e":"machineData","d":{"uuid":"A","cpu":20}}"#);
    settle().await;

    let status = h.handle.status();
    assert_eq!(status.state, ConnectionState::Live);
    assert!(status.last_heartbeat.is_some());
    assert_eq!(status.buffered, 2);
    // Nothing applied before the drain cycle.
    assert!(h.machines.get(&EntityId::from("A")).is_none());

    sleep(Duration::from_millis(1001)).await;
    settle().await;

    let machine = h.machines.get(&EntityId::from("A")).expect("machine A applied");
    let data = machine.dynamic_data.expect("telemetry applied");
    assert_eq!(data.field("cpu"), Some(&json!(20)));
    assert!(machine.updated_at.is_some());
    assert_eq!(h.handle.status().buffered, 0);
}

#[tokio::test(start_paused = true)]
async fn repeated_connect_opens_one_transport() {
    let mut h = Harness::start(Some("tok"));

    h.handle.connect();
    h.handle.connect();
    settle().await;
    h.handle.connect();
    settle().await;

    assert_eq!(h.connector.opened(), 1);
    assert_eq!(h.handle.status().state, ConnectionState::Connecting);

    let socket = h.next_socket().await;
    socket.open();
    settle().await;
    h.handle.connect();
    settle().await;

    assert_eq!(h.connector.opened(), 1);
    assert_eq!(h.handle.status().state, ConnectionState::Authenticating);
}

#[tokio::test(start_paused = true)]
async fn watchdog_reconnects_once_per_silence_window() {
    let mut h = Harness::start(Some("tok"));
    let _first = h.go_live().await;
    assert_eq!(h.handle.status().state, ConnectionState::Live);

    // Poll at 5 s sees exactly the threshold: still healthy.
    sleep(Duration::from_millis(5500)).await;
    settle().await;
    assert_eq!(h.connector.opened(), 1);

    // Poll at 10 s: expired, one reconnect.
    sleep(Duration::from_millis(5000)).await;
    settle().await;
    assert_eq!(h.connector.opened(), 2);
    assert_eq!(h.handle.status().reconnects, 1);
    assert_eq!(h.handle.status().state, ConnectionState::Connecting);

    // Poll at 15 s is inside the new window.
    sleep(Duration::from_millis(5000)).await;
    settle().await;
    assert_eq!(h.connector.opened(), 2);

    // Poll at 20 s: the retry never answered either.
    sleep(Duration::from_millis(5000)).await;
    settle().await;
    assert_eq!(h.connector.opened(), 3);
    assert_eq!(h.handle.status().reconnects, 2);
}

#[tokio::test(start_paused = true)]
async fn heartbeats_keep_the_session() {
    let mut h = Harness::start(Some("tok"));
    let socket = h.go_live().await;

    for _ in 0..6 {
        sleep(Duration::from_millis(3000)).await;
        socket.frame(r#"{"e":"heartbeat"}"#);
        settle().await;
    }

    assert_eq!(h.connector.opened(), 1);
    assert_eq!(h.handle.status().state, ConnectionState::Live);
}

#[tokio::test(start_paused = true)]
async fn superseded_transport_is_ignored() {
    let mut h = Harness::start(Some("tok"));
    let old = h.go_live().await;

    sleep(Duration::from_millis(10_500)).await;
    let new = h.next_socket().await;
    assert!(new.generation > old.generation);

    // Late traffic from the abandoned socket.
    old.frame(r#"{"e":"machineData","d":{"uuid":"ghost","cau":99}}"#);
    old.close("gone");
    settle().await;

    assert_eq!(h.handle.status().state, ConnectionState::Connecting);
    assert_eq!(h.handle.status().buffered, 0);

    sleep(Duration::from_millis(1000)).await;
    settle().await;
    assert!(h.machines.get(&EntityId::from("ghost")).is_none());

    // The new socket works normally.
    new.open();
    new.frame(r#"{"e":"heartbeat"}"#);
    settle().await;
    assert_eq!(h.handle.status().state, ConnectionState::Live);
}

#[tokio::test(start_paused = true)]
async fn malformed_frames_are_dropped_without_killing_the_session() {
    let mut h = Harness::start(Some("tok"));
    h.handle.connect();
    let socket = h.next_socket().await;
    socket.open();

    socket.frame("not json at all");
    socket.frame(r#"{"d":{"uuid":"A"}}"#);
    socket.frame(r#"{"e":"machineData","d":{"cau":1}}"#);
    settle().await;

    assert_eq!(h.handle.status().state, ConnectionState::Authenticating);
    assert_eq!(h.handle.status().buffered, 0);

    socket.frame(r#"{"e":"machineData","d":{"uuid":"A","cau":12.5}}"#);
    settle().await;
    assert_eq!(h.handle.status().state, ConnectionState::Live);
    assert_eq!(h.handle.status().buffered, 1);

    sleep(Duration::from_millis(1000)).await;
    settle().await;
    let machine = h.machines.get(&EntityId::from("A")).expect("machine A applied");
    assert_eq!(machine.dynamic_data.and_then(|d| d.cau), Some(12.5));
}

#[tokio::test(start_paused = true)]
async fn unknown_events_are_not_dispatched() {
    let mut h = Harness::start(Some("tok"));
    let socket = h.go_live().await;

    socket.frame(r#"{"e":"presence","d":{"uuid":"A"}}"#);
    settle().await;

    assert_eq!(h.handle.status().state, ConnectionState::Live);
    assert_eq!(h.handle.status().buffered, 0);
}

#[tokio::test(start_paused = true)]
async fn missing_token_suppresses_login_and_watchdog_recycles() {
    let mut h = Harness::start(None);

    h.handle.connect();
    let mut socket = h.next_socket().await;
    socket.open();
    settle().await;

    assert!(socket.sent().is_empty());
    assert_eq!(h.handle.status().state, ConnectionState::Authenticating);

    sleep(Duration::from_millis(10_500)).await;
    settle().await;
    assert_eq!(h.connector.opened(), 2);
}

#[tokio::test(start_paused = true)]
async fn closed_transport_waits_for_the_watchdog() {
    let mut h = Harness::start(Some("tok"));
    let socket = h.go_live().await;

    socket.close("connection reset");
    settle().await;
    assert_eq!(h.handle.status().state, ConnectionState::Disconnected);
    assert_eq!(h.connector.opened(), 1);

    sleep(Duration::from_millis(10_500)).await;
    settle().await;
    assert_eq!(h.connector.opened(), 2);
    assert_eq!(h.handle.status().state, ConnectionState::Connecting);
}

#[tokio::test(start_paused = true)]
async fn logout_clears_state_and_stops_timers() {
    let mut h = Harness::start(Some("tok"));
    let socket = h.go_live().await;

    socket.frame(r#"{"e":"machineData","d":{"uuid":"A","cau":5}}"#);
    sleep(Duration::from_millis(1000)).await;
    settle().await;
    assert_eq!(h.machines.len(), 1);

    // Queued but never drained.
    socket.frame(r#"{"e":"machineData","d":{"uuid":"B","cau":5}}"#);
    settle().await;
    h.handle.logout();
    settle().await;

    let status = h.handle.status();
    assert_eq!(status.state, ConnectionState::Disconnected);
    assert_eq!(status.buffered, 0);
    assert!(status.last_heartbeat.is_none());
    assert!(h.machines.is_empty());

    // No watchdog while logged out.
    sleep(Duration::from_millis(30_000)).await;
    settle().await;
    assert_eq!(h.connector.opened(), 1);
    assert!(h.machines.is_empty());

    // Connecting again starts from scratch.
    h.handle.connect();
    let _socket = h.next_socket().await;
    assert_eq!(h.connector.opened(), 2);
}

#[tokio::test(start_paused = true)]
async fn extra_handlers_run_after_the_builtin_ones() {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);

    let mut h = Harness::start_with(Some("tok"), move |driver| {
        driver.on(EventKind::MachineData, move |state, event| {
            assert!(matches!(event, ServerEvent::MachineData(_)));
            // The buffer handler already ran for this event.
            counter.fetch_add(state.buffer.len(), Ordering::SeqCst);
        });
    });
    let socket = h.go_live().await;

    socket.frame(r#"{"e":"machineData","d":{"uuid":"A","cau":1}}"#);
    socket.frame(r#"{"e":"machineData","d":{"uuid":"A","cau":2}}"#);
    settle().await;

    // Buffer length seen was 1, then 2.
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn shutdown_ends_the_driver_task() {
    let mut h = Harness::start(Some("tok"));
    let socket = h.go_live().await;

    socket.frame(r#"{"e":"machineData","d":{"uuid":"A","cau":5}}"#);
    sleep(Duration::from_millis(1000)).await;
    settle().await;

    h.handle.shutdown();
    h.task.await.expect("driver task panicked");

    assert_eq!(h.handle.status().state, ConnectionState::Disconnected);
    // Unlike logout, shutdown leaves the store alone.
    assert_eq!(h.machines.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn zero_timer_periods_do_not_kill_the_driver() {
    let (connector, _sockets) = FakeConnector::new();
    let mut zeroed = settings();
    zeroed.watchdog_interval = Duration::ZERO;
    zeroed.drain_interval = Duration::ZERO;

    let (driver, handle) = SyncDriver::new(
        zeroed,
        connector.clone(),
        Arc::new(MemoryTokenHolder::new(Some("tok"))),
        SharedStore::new(),
    );
    let task = driver.spawn();

    handle.connect();
    settle().await;
    sleep(Duration::from_millis(20)).await;

    assert!(!task.is_finished());
    assert_eq!(connector.opened(), 1);
    assert_eq!(handle.status().state, ConnectionState::Connecting);
}
