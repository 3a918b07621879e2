//! Integration tests for the registration lifecycle.
//!
//! Verifies the session state machine over a live driver task:
//! `connecting` is observable before the verdict, success lands in
//! `connected`, a rejected identity lands in `disconnected`, and there is
//! no retry — the state rests where the single attempt left it.

use std::time::Duration;

use tokio::sync::mpsc;

use peerchat::net::{self, NetCommand, NetEvent};
use peerchat::session::{SessionSnapshot, SessionState};
use peerchat::signaling::in_process::InProcessHub;
use peerchat_proto::message::PeerId;

/// Wait until a snapshot satisfying `pred` arrives.
async fn wait_for_snapshot(
    rx: &mut mpsc::Receiver<NetEvent>,
    pred: impl Fn(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Some(NetEvent::Snapshot(s)) if pred(&s) => return s,
                Some(_) => {}
                None => panic!("event channel closed before the condition was met"),
            }
        }
    })
    .await
    .expect("timed out waiting for snapshot")
}

#[tokio::test]
async fn the_first_snapshot_is_connecting() {
    let hub = InProcessHub::new();
    let endpoint = hub.register(PeerId::new("alice"));
    let (_cmd_tx, mut evt_rx) = net::spawn_net(endpoint, 64);

    // The initial snapshot precedes any service event.
    match evt_rx.recv().await {
        Some(NetEvent::Snapshot(s)) => assert_eq!(s.state, SessionState::Connecting),
        other => panic!("expected initial snapshot, got: {other:?}"),
    }
}

#[tokio::test]
async fn successful_registration_reaches_connected() {
    let hub = InProcessHub::new();
    let endpoint = hub.register(PeerId::new("alice"));
    let (_cmd_tx, mut evt_rx) = net::spawn_net(endpoint, 64);

    let snapshot = wait_for_snapshot(&mut evt_rx, |s| s.state == SessionState::Connected).await;
    assert_eq!(snapshot.local, PeerId::new("alice"));
    assert!(snapshot.peers.is_empty());
    assert!(snapshot.history.is_empty());
}

#[tokio::test]
async fn rejected_identity_reaches_disconnected() {
    let hub = InProcessHub::new();
    let _original = hub.register(PeerId::new("alice"));
    let imposter = hub.register(PeerId::new("alice"));
    let (_cmd_tx, mut evt_rx) = net::spawn_net(imposter, 64);

    let snapshot = wait_for_snapshot(&mut evt_rx, |s| s.state == SessionState::Disconnected).await;
    assert_eq!(snapshot.local, PeerId::new("alice"));
}

#[tokio::test]
async fn dialing_while_disconnected_is_a_no_op() {
    let hub = InProcessHub::new();
    let _original = hub.register(PeerId::new("alice"));
    let bob = hub.register(PeerId::new("bob"));
    let (_bob_cmd, mut bob_evt) = net::spawn_net(bob, 64);
    wait_for_snapshot(&mut bob_evt, |s| s.state == SessionState::Connected).await;

    let imposter = hub.register(PeerId::new("alice"));
    let (cmd_tx, mut evt_rx) = net::spawn_net(imposter, 64);
    wait_for_snapshot(&mut evt_rx, |s| s.state == SessionState::Disconnected).await;

    cmd_tx
        .send(NetCommand::Connect {
            peer: "bob".to_string(),
        })
        .await
        .unwrap();

    // The dial is skipped: the imposter's own view stays empty...
    let snapshot = wait_for_snapshot(&mut evt_rx, |_| true).await;
    assert!(snapshot.peers.is_empty());

    // ...and nothing ever reaches bob.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(bob_evt.try_recv().is_err());
}

#[tokio::test]
async fn shutdown_stops_the_driver_and_frees_the_identity() {
    let hub = InProcessHub::new();
    let endpoint = hub.register(PeerId::new("alice"));
    let (cmd_tx, mut evt_rx) = net::spawn_net(endpoint, 64);
    wait_for_snapshot(&mut evt_rx, |s| s.state == SessionState::Connected).await;

    cmd_tx.send(NetCommand::Shutdown).await.unwrap();

    // The driver exits and drops its event channel...
    tokio::time::timeout(Duration::from_secs(2), async {
        while evt_rx.recv().await.is_some() {}
    })
    .await
    .expect("event channel should close after shutdown");

    // ...releasing the endpoint, so the identity can be claimed again.
    let again = hub.register(PeerId::new("alice"));
    let (_cmd_tx, mut evt_rx) = net::spawn_net(again, 64);
    wait_for_snapshot(&mut evt_rx, |s| s.state == SessionState::Connected).await;
}
