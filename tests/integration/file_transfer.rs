//! Integration tests for file attachments.
//!
//! A 10 KB file sent by one session arrives in the other's history as a
//! single file entry whose data-URI decodes to the original bytes, with
//! the file name preserved. A missing file surfaces as a local notice and
//! never touches either history.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;

use peerchat::net::{self, NetCommand, NetEvent};
use peerchat::session::{SessionSnapshot, SessionState};
use peerchat::signaling::in_process::InProcessHub;
use peerchat_proto::data_uri;
use peerchat_proto::message::{MessageKind, PeerId};

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

/// Wait until a notice arrives.
async fn wait_for_notice(rx: &mut mpsc::Receiver<NetEvent>) -> String {
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            match rx.recv().await {
                Some(NetEvent::Notice(n)) => return n,
                Some(_) => {}
                None => panic!("event channel closed before a notice arrived"),
            }
        }
    })
    .await
    .expect("timed out waiting for notice")
}

type Channels = (mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>);

/// Two registered sessions with alice dialed into bob.
async fn connected_pair() -> (Channels, Channels) {
    let hub = InProcessHub::new();

    let (alice_cmd, mut alice_evt) = net::spawn_net(hub.register(PeerId::new("alice")), 64);
    let (bob_cmd, mut bob_evt) = net::spawn_net(hub.register(PeerId::new("bob")), 64);

    wait_for_snapshot(&mut alice_evt, |s| s.state == SessionState::Connected).await;
    wait_for_snapshot(&mut bob_evt, |s| s.state == SessionState::Connected).await;

    alice_cmd
        .send(NetCommand::Connect {
            peer: "bob".to_string(),
        })
        .await
        .unwrap();

    wait_for_snapshot(&mut alice_evt, |s| s.peers.contains(&PeerId::new("bob"))).await;
    wait_for_snapshot(&mut bob_evt, |s| s.peers.contains(&PeerId::new("alice"))).await;

    ((alice_cmd, alice_evt), (bob_cmd, bob_evt))
}

/// Write a scratch file and return its path.
fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("peerchat-ft-{}", PeerId::generate()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[tokio::test]
async fn ten_kilobyte_file_round_trips() {
    let ((alice_cmd, mut alice_evt), (_bob_cmd, mut bob_evt)) = connected_pair().await;

    let original: Vec<u8> = (0..10 * 1024).map(|i| (i % 251) as u8).collect();
    let path = scratch_file("report.pdf", &original);

    alice_cmd
        .send(NetCommand::SendFile { path: path.clone() })
        .await
        .unwrap();

    // Local echo: one file entry with the name preserved.
    let alice = wait_for_snapshot(&mut alice_evt, |s| !s.history.is_empty()).await;
    assert_eq!(alice.history.len(), 1);
    assert_eq!(alice.history[0].kind, MessageKind::File);
    assert_eq!(alice.history[0].file_name.as_deref(), Some("report.pdf"));

    // Delivery: bob's entry decodes back to the original 10 KB.
    let bob = wait_for_snapshot(&mut bob_evt, |s| !s.history.is_empty()).await;
    assert_eq!(bob.history.len(), 1);
    let received = &bob.history[0];
    assert_eq!(received.kind, MessageKind::File);
    assert_eq!(received.sender, PeerId::new("alice"));
    assert_eq!(received.file_name.as_deref(), Some("report.pdf"));

    let (_, decoded) = data_uri::decode(&received.content).unwrap();
    assert_eq!(decoded, original);

    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[tokio::test]
async fn empty_file_round_trips() {
    let ((alice_cmd, _alice_evt), (_bob_cmd, mut bob_evt)) = connected_pair().await;

    let path = scratch_file("empty.bin", &[]);
    alice_cmd
        .send(NetCommand::SendFile { path: path.clone() })
        .await
        .unwrap();

    let bob = wait_for_snapshot(&mut bob_evt, |s| !s.history.is_empty()).await;
    let (_, decoded) = data_uri::decode(&bob.history[0].content).unwrap();
    assert!(decoded.is_empty());

    std::fs::remove_dir_all(path.parent().unwrap()).ok();
}

#[tokio::test]
async fn missing_file_surfaces_a_notice_and_no_message() {
    let ((alice_cmd, mut alice_evt), (_bob_cmd, mut bob_evt)) = connected_pair().await;

    alice_cmd
        .send(NetCommand::SendFile {
            path: PathBuf::from("/nonexistent/peerchat/ghost.bin"),
        })
        .await
        .unwrap();

    let notice = wait_for_notice(&mut alice_evt).await;
    assert!(notice.contains("could not read"));

    // Neither history gains an entry.
    tokio::time::sleep(Duration::from_millis(100)).await;
    loop {
        match bob_evt.try_recv() {
            Ok(NetEvent::Snapshot(s)) => assert!(s.history.is_empty()),
            Ok(NetEvent::Notice(_)) => {}
            Err(_) => break,
        }
    }
}
