//! Integration tests for disconnect handling.
//!
//! Closing a session removes its identity from the remote peer list, a
//! subsequent send reaches no one (local echo only), and the departed
//! identity becomes dialable again — no stale-entry lockout.

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

type Channels = (mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>);

/// Register `identity` on the hub and wait for the connected state.
async fn session(hub: &InProcessHub, identity: &str) -> Channels {
    let (cmd, mut evt) = net::spawn_net(hub.register(PeerId::new(identity)), 64);
    wait_for_snapshot(&mut evt, |s| s.state == SessionState::Connected).await;
    (cmd, evt)
}

#[tokio::test]
async fn remote_shutdown_removes_the_peer() {
    let hub = InProcessHub::new();
    let (alice_cmd, mut alice_evt) = session(&hub, "alice").await;
    let (bob_cmd, mut bob_evt) = session(&hub, "bob").await;

    alice_cmd
        .send(NetCommand::Connect {
            peer: "bob".to_string(),
        })
        .await
        .unwrap();
    wait_for_snapshot(&mut alice_evt, |s| s.peers.contains(&PeerId::new("bob"))).await;
    wait_for_snapshot(&mut bob_evt, |s| s.peers.contains(&PeerId::new("alice"))).await;

    // Bob goes away entirely.
    bob_cmd.send(NetCommand::Shutdown).await.unwrap();

    let alice = wait_for_snapshot(&mut alice_evt, |s| s.peers.is_empty()).await;
    assert!(!alice.peers.contains(&PeerId::new("bob")));
}

#[tokio::test]
async fn send_after_disconnect_reaches_no_peer() {
    let hub = InProcessHub::new();
    let (alice_cmd, mut alice_evt) = session(&hub, "alice").await;
    let (bob_cmd, mut bob_evt) = session(&hub, "bob").await;

    alice_cmd
        .send(NetCommand::Connect {
            peer: "bob".to_string(),
        })
        .await
        .unwrap();
    wait_for_snapshot(&mut alice_evt, |s| s.peers.contains(&PeerId::new("bob"))).await;
    wait_for_snapshot(&mut bob_evt, |s| s.peers.contains(&PeerId::new("alice"))).await;

    bob_cmd.send(NetCommand::Shutdown).await.unwrap();
    wait_for_snapshot(&mut alice_evt, |s| s.peers.is_empty()).await;

    alice_cmd
        .send(NetCommand::SendText {
            text: "still there?".to_string(),
        })
        .await
        .unwrap();

    // Only the local echo lands; there is no one to deliver to.
    let alice = wait_for_snapshot(&mut alice_evt, |s| !s.history.is_empty()).await;
    assert_eq!(alice.history.len(), 1);
    assert_eq!(alice.history[0].sender, PeerId::new("alice"));
    assert!(alice.peers.is_empty());
}

#[tokio::test]
async fn departed_identity_is_dialable_after_it_returns() {
    let hub = InProcessHub::new();
    let (alice_cmd, mut alice_evt) = session(&hub, "alice").await;
    let (bob_cmd, mut bob_evt) = session(&hub, "bob").await;

    alice_cmd
        .send(NetCommand::Connect {
            peer: "bob".to_string(),
        })
        .await
        .unwrap();
    wait_for_snapshot(&mut alice_evt, |s| s.peers.contains(&PeerId::new("bob"))).await;
    wait_for_snapshot(&mut bob_evt, |s| s.peers.contains(&PeerId::new("alice"))).await;

    // Bob leaves and his connection entry is cleared on alice's side.
    bob_cmd.send(NetCommand::Shutdown).await.unwrap();
    wait_for_snapshot(&mut alice_evt, |s| s.peers.is_empty()).await;

    // Bob comes back under the same identity; alice dials again and a
    // fresh connection is created — the closed one left no lockout.
    let (_bob2_cmd, mut bob2_evt) = session(&hub, "bob").await;

    alice_cmd
        .send(NetCommand::Connect {
            peer: "bob".to_string(),
        })
        .await
        .unwrap();

    wait_for_snapshot(&mut alice_evt, |s| s.peers.contains(&PeerId::new("bob"))).await;
    wait_for_snapshot(&mut bob2_evt, |s| s.peers.contains(&PeerId::new("alice"))).await;

    // And traffic flows over the new connection.
    alice_cmd
        .send(NetCommand::SendText {
            text: "welcome back".to_string(),
        })
        .await
        .unwrap();
    let bob = wait_for_snapshot(&mut bob2_evt, |s| !s.history.is_empty()).await;
    assert_eq!(bob.history[0].content, "welcome back");
    assert_eq!(bob.history[0].sender, PeerId::new("alice"));
}
