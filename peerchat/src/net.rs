//! Bridge between the TUI event loop and the async signaling stack.
//!
//! A single driver task owns the [`SessionManager`] and serializes every
//! mutation: signaling events and UI commands are interleaved in arrival
//! order, one at a time, and a fresh [`SessionSnapshot`] is emitted after
//! each one. The TUI main loop sends [`NetCommand`]s and drains
//! [`NetEvent`]s on every tick.
//!
//! ```text
//! TUI (main thread)  ←── NetEvent ───  driver task  ←── SessionEvent ── service
//!                     ─── NetCommand →
//! ```

use std::path::PathBuf;

use tokio::sync::mpsc;

use peerchat_proto::message::PeerId;

use crate::session::{SessionManager, SessionSnapshot};
use crate::signaling::SignalingService;

/// Commands sent from the TUI main loop to the driver task.
#[derive(Debug)]
pub enum NetCommand {
    /// Dial a remote identity. A no-op while unregistered or while a
    /// connection for that identity is already open.
    Connect {
        /// The identity to dial.
        peer: String,
    },
    /// Broadcast a text message to every connected peer.
    SendText {
        /// The message text.
        text: String,
    },
    /// Read a file and broadcast it as an attachment.
    SendFile {
        /// Path of the file to read.
        path: PathBuf,
    },
    /// Completion of an asynchronous file read, enqueued internally once
    /// the bytes are in memory.
    FileLoaded {
        /// Original file name.
        name: String,
        /// The file contents.
        bytes: Vec<u8>,
    },
    /// Stop the driver task.
    Shutdown,
}

/// Events sent from the driver task to the TUI main loop.
#[derive(Debug)]
pub enum NetEvent {
    /// Fresh read-only view of the session after a mutation.
    Snapshot(SessionSnapshot),
    /// A local, UI-facing notice (file read failure and the like).
    Notice(String),
}

/// Spawn the driver task and return its channel handles.
///
/// The session starts in the `Connecting` state; an initial snapshot is
/// emitted immediately so the UI renders the pending registration.
pub fn spawn_net<S>(
    service: S,
    capacity: usize,
) -> (mpsc::Sender<NetCommand>, mpsc::Receiver<NetEvent>)
where
    S: SignalingService + 'static,
{
    let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
    let (evt_tx, evt_rx) = mpsc::channel(capacity);
    tokio::spawn(drive(service, cmd_tx.clone(), cmd_rx, evt_tx));
    (cmd_tx, evt_rx)
}

/// Driver loop: apply events and commands one at a time, snapshot after each.
async fn drive<S: SignalingService>(
    service: S,
    cmd_tx: mpsc::Sender<NetCommand>,
    mut cmd_rx: mpsc::Receiver<NetCommand>,
    evt_tx: mpsc::Sender<NetEvent>,
) {
    let mut session = SessionManager::new(service.local_identity().clone());
    let _ = evt_tx.send(NetEvent::Snapshot(session.snapshot())).await;

    loop {
        tokio::select! {
            event = service.next_event() => {
                let Some(event) = event else {
                    // The service is gone; the final RegistrationError has
                    // already moved the session to Disconnected.
                    break;
                };
                session.handle_event(event);
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(NetCommand::Connect { peer }) => {
                        let remote = PeerId::new(peer);
                        if session.wants_dial(&remote) {
                            if let Err(e) = service.open(&remote).await {
                                // Per-connection failures are logged only;
                                // the peer simply never appears.
                                tracing::warn!(peer = %remote, error = %e, "dial failed");
                            }
                        } else {
                            tracing::debug!(peer = %remote, "dial skipped");
                        }
                    }
                    Some(NetCommand::SendText { text }) => session.send_text(text),
                    Some(NetCommand::SendFile { path }) => {
                        // Read off the driver loop; the completion comes
                        // back as FileLoaded. No cancellation, no timeout.
                        spawn_file_read(path, cmd_tx.clone(), evt_tx.clone());
                    }
                    Some(NetCommand::FileLoaded { name, bytes }) => {
                        session.send_file(name, &bytes);
                    }
                    Some(NetCommand::Shutdown) | None => {
                        tracing::info!("net driver shutting down");
                        break;
                    }
                }
            }
        }
        let _ = evt_tx.send(NetEvent::Snapshot(session.snapshot())).await;
    }
}

/// Read a file in the background and enqueue its completion.
fn spawn_file_read(
    path: PathBuf,
    cmd_tx: mpsc::Sender<NetCommand>,
    evt_tx: mpsc::Sender<NetEvent>,
) {
    tokio::spawn(async move {
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("attachment")
                    .to_string();
                let _ = cmd_tx.send(NetCommand::FileLoaded { name, bytes }).await;
            }
            Err(e) => {
                let notice = format!("could not read {}: {e}", path.display());
                tracing::warn!(path = %path.display(), error = %e, "file read failed");
                let _ = evt_tx.send(NetEvent::Notice(notice)).await;
            }
        }
    });
}
