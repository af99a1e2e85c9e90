//! Integration tests for the push-channel connection manager

mod common;

use common::{within, ScriptedTransport};
use nest_sync::{
    BackoffPolicy, ConnectionEvent, ConnectionManager, ConnectionSnapshot, ConnectionState,
    SyncError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

async fn wait_for_state(
    events: &mut broadcast::Receiver<ConnectionEvent>,
    predicate: impl Fn(&ConnectionSnapshot) -> bool,
) -> ConnectionSnapshot {
    within(async {
        loop {
            if let ConnectionEvent::StateChanged(snapshot) = events.recv().await.unwrap() {
                if predicate(&snapshot) {
                    return snapshot;
                }
            }
        }
    })
    .await
}

async fn wait_for_fatal(events: &mut broadcast::Receiver<ConnectionEvent>) -> SyncError {
    within(async {
        loop {
            if let ConnectionEvent::Fatal(error) = events.recv().await.unwrap() {
                return error;
            }
        }
    })
    .await
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_delays_double_until_exhausted() {
    let transport = Arc::new(ScriptedTransport::new());
    let (manager, _frames) = ConnectionManager::spawn(transport.clone(), BackoffPolicy::new(3));
    let mut events = manager.subscribe();

    manager.open(Some("jwt")).unwrap();
    let fatal = wait_for_fatal(&mut events).await;
    assert_eq!(fatal, SyncError::MaxReconnectExceeded { attempts: 3 });

    // Initial connect plus three reconnects.
    let times = transport.connect_times();
    assert_eq!(times.len(), 4);
    let gaps: Vec<u128> = times
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).as_millis())
        .collect();
    assert_eq!(gaps, vec![1000, 2000, 4000]);

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.state, ConnectionState::Idle);
    assert_eq!(snapshot.attempt, 3);
    assert!(snapshot.exhausted);
    assert!(snapshot.is_degraded());

    // Terminal: nothing else is attempted on its own.
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(transport.connect_count(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_successful_open_resets_attempt_counter() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.refuse();
    transport.refuse();
    let server = transport.accept();

    let (manager, _frames) = ConnectionManager::spawn(transport.clone(), BackoffPolicy::new(10));
    let mut events = manager.subscribe();
    manager.open(Some("jwt")).unwrap();

    let open = wait_for_state(&mut events, ConnectionSnapshot::is_open).await;
    assert_eq!(open.attempt, 0);
    assert_eq!(open.next_delay_ms(), 1000);
    assert_eq!(transport.connect_count(), 3);

    drop(server);
    let backoff = wait_for_state(&mut events, |s| s.state == ConnectionState::Backoff).await;
    assert_eq!(backoff.attempt, 1);
    assert_eq!(backoff.next_delay_ms(), 1000);
}

#[tokio::test(start_paused = true)]
async fn test_close_cancels_pending_reconnect() {
    let transport = Arc::new(ScriptedTransport::new());
    let (manager, _frames) = ConnectionManager::spawn(transport.clone(), BackoffPolicy::new(10));
    let mut events = manager.subscribe();

    manager.open(Some("jwt")).unwrap();
    wait_for_state(&mut events, |s| s.state == ConnectionState::Backoff).await;

    manager.close().unwrap();
    let idle = wait_for_state(&mut events, |s| s.state == ConnectionState::Idle).await;
    assert!(!idle.exhausted);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(transport.connect_count(), 1);
}

#[tokio::test]
async fn test_open_without_credential_is_rejected() {
    let transport = Arc::new(ScriptedTransport::new());
    let (manager, _frames) = ConnectionManager::spawn(transport.clone(), BackoffPolicy::default());

    assert_eq!(manager.open(None), Err(SyncError::AuthRequired));
    assert_eq!(manager.open(Some("  ")), Err(SyncError::AuthRequired));

    tokio::task::yield_now().await;
    assert_eq!(manager.snapshot().state, ConnectionState::Idle);
    assert_eq!(transport.connect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_frames_arrive_in_order_with_epoch() {
    let transport = Arc::new(ScriptedTransport::new());
    let server = transport.accept();
    let (manager, mut frames) = ConnectionManager::spawn(transport.clone(), BackoffPolicy::default());
    let mut events = manager.subscribe();

    manager.open(Some("jwt")).unwrap();
    wait_for_state(&mut events, ConnectionSnapshot::is_open).await;

    for payload in ["one", "two", "three"] {
        server.send(payload.to_string()).unwrap();
    }

    let mut received = Vec::new();
    for _ in 0..3 {
        let frame = within(frames.recv()).await.unwrap();
        assert_eq!(frame.epoch, 1);
        received.push(frame.payload);
    }
    assert_eq!(received, vec!["one", "two", "three"]);
}

#[tokio::test(start_paused = true)]
async fn test_explicit_open_after_exhaustion() {
    let transport = Arc::new(ScriptedTransport::new());
    let (manager, _frames) = ConnectionManager::spawn(transport.clone(), BackoffPolicy::new(1));
    let mut events = manager.subscribe();

    manager.open(Some("jwt")).unwrap();
    wait_for_fatal(&mut events).await;
    assert_eq!(transport.connect_count(), 2);

    let _server = transport.accept();
    manager.open(Some("jwt")).unwrap();
    let open = wait_for_state(&mut events, ConnectionSnapshot::is_open).await;
    assert!(!open.exhausted);
    assert_eq!(open.attempt, 0);
    assert_eq!(open.epoch, 3);
}

#[tokio::test(start_paused = true)]
async fn test_reopen_switches_credential() {
    let transport = Arc::new(ScriptedTransport::new());
    let first = transport.accept();
    let _second = transport.accept();
    let (manager, _frames) = ConnectionManager::spawn(transport.clone(), BackoffPolicy::default());
    let mut events = manager.subscribe();

    manager.open(Some("old-token")).unwrap();
    wait_for_state(&mut events, ConnectionSnapshot::is_open).await;

    manager.open(Some("new-token")).unwrap();
    let reopened = wait_for_state(&mut events, |s| s.is_open() && s.epoch == 2).await;
    assert_eq!(reopened.attempt, 0);
    assert_eq!(transport.tokens(), vec!["old-token", "new-token"]);
    assert!(first.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_closes_open_channel() {
    let transport = Arc::new(ScriptedTransport::new());
    let server = transport.accept();
    let (manager, _frames) = ConnectionManager::spawn(transport.clone(), BackoffPolicy::default());
    let mut events = manager.subscribe();

    manager.open(Some("jwt")).unwrap();
    wait_for_state(&mut events, ConnectionSnapshot::is_open).await;

    within(manager.shutdown()).await;
    assert!(server.is_closed());
}
