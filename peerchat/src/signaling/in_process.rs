//! In-process signaling hub.
//!
//! Pairs endpoints registered under distinct identities through in-memory
//! channels, with the same event surface as a live broker. Used by the
//! test suite to drive two full sessions deterministically, and available
//! as a demo backend.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex, mpsc};

use peerchat_proto::message::{Message, PeerId};

use super::{ConnEvent, Connection, ServiceError, SessionEvent, SignalingService};

/// Channel capacity for endpoint event queues and per-connection payloads.
const DEFAULT_BUFFER: usize = 64;

/// Registry shared by every endpoint of one hub.
type PeerRegistry = Arc<SyncMutex<HashMap<PeerId, mpsc::Sender<SessionEvent>>>>;

/// In-memory hub pairing registered identities.
///
/// `register` mints a [`HubEndpoint`] per participant; endpoints dial each
/// other by identity exactly as they would through a remote broker. The
/// registration outcome arrives as the endpoint's first event, mirroring
/// the asynchronous acknowledgment of the WebSocket backend.
#[derive(Debug, Clone, Default)]
pub struct InProcessHub {
    peers: PeerRegistry,
}

impl InProcessHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an identity and return its endpoint.
    ///
    /// Always returns an endpoint: a duplicate identity yields one whose
    /// first event is [`SessionEvent::RegistrationError`] and which never
    /// appears in the registry, leaving the original registrant intact.
    #[must_use]
    pub fn register(&self, identity: PeerId) -> HubEndpoint {
        let (events_tx, events_rx) = mpsc::channel(DEFAULT_BUFFER);
        let mut peers = self.peers.lock();

        let registered = if peers.contains_key(&identity) {
            let _ = events_tx.try_send(SessionEvent::RegistrationError {
                reason: format!("identity {identity} is already in use"),
            });
            false
        } else {
            peers.insert(identity.clone(), events_tx.clone());
            let _ = events_tx.try_send(SessionEvent::Registered {
                identity: identity.clone(),
            });
            true
        };
        drop(peers);

        HubEndpoint {
            identity,
            registered,
            peers: Arc::clone(&self.peers),
            events_tx,
            events: Mutex::new(events_rx),
        }
    }
}

/// One participant's handle to an [`InProcessHub`].
///
/// Dropping the endpoint releases its identity so the token can be
/// registered again, regardless of the last observed session state.
#[derive(Debug)]
pub struct HubEndpoint {
    identity: PeerId,
    registered: bool,
    peers: PeerRegistry,
    events_tx: mpsc::Sender<SessionEvent>,
    events: Mutex<mpsc::Receiver<SessionEvent>>,
}

impl SignalingService for HubEndpoint {
    async fn open(&self, remote: &PeerId) -> Result<(), ServiceError> {
        if !self.registered {
            return Err(ServiceError::NotRegistered(self.identity.clone()));
        }

        let remote_events = self.peers.lock().get(remote).cloned();
        match remote_events {
            Some(remote_events) => {
                wire_pair(
                    self.identity.clone(),
                    remote.clone(),
                    self.events_tx.clone(),
                    remote_events,
                )
                .await;
            }
            None => {
                // An unreachable peer is reported through the event stream,
                // the same way a broker would.
                let _ = self
                    .events_tx
                    .send(SessionEvent::Conn {
                        peer: remote.clone(),
                        event: ConnEvent::Errored("peer is not registered".to_string()),
                    })
                    .await;
            }
        }
        Ok(())
    }

    async fn next_event(&self) -> Option<SessionEvent> {
        let mut events = self.events.lock().await;
        events.recv().await
    }

    fn local_identity(&self) -> &PeerId {
        &self.identity
    }
}

impl Drop for HubEndpoint {
    fn drop(&mut self) {
        if self.registered {
            self.peers.lock().remove(&self.identity);
        }
    }
}

/// Wire a duplex channel between two endpoints and notify both.
///
/// Each side receives a [`ConnEvent::Opened`] carrying its handle; payload
/// traffic is tagged with the identity baked into the wiring, so a
/// payload's self-declared sender has no effect on attribution.
async fn wire_pair(
    a: PeerId,
    b: PeerId,
    a_events: mpsc::Sender<SessionEvent>,
    b_events: mpsc::Sender<SessionEvent>,
) {
    let (a_out_tx, a_out_rx) = mpsc::channel(DEFAULT_BUFFER);
    let (b_out_tx, b_out_rx) = mpsc::channel(DEFAULT_BUFFER);

    tokio::spawn(pump(a.clone(), a_out_rx, b_events.clone()));
    tokio::spawn(pump(b.clone(), b_out_rx, a_events.clone()));

    let _ = a_events
        .send(SessionEvent::Conn {
            peer: b.clone(),
            event: ConnEvent::Opened(Connection::new(b, a_out_tx)),
        })
        .await;
    let _ = b_events
        .send(SessionEvent::Conn {
            peer: a.clone(),
            event: ConnEvent::Opened(Connection::new(a, b_out_tx)),
        })
        .await;
}

/// Deliver payloads queued by `from` to the opposite endpoint.
///
/// When the sending handle is dropped the channel drains and closes, and
/// the opposite endpoint observes a [`ConnEvent::Closed`].
async fn pump(from: PeerId, mut rx: mpsc::Receiver<Message>, events: mpsc::Sender<SessionEvent>) {
    while let Some(message) = rx.recv().await {
        let delivered = events
            .send(SessionEvent::Conn {
                peer: from.clone(),
                event: ConnEvent::DataReceived(message),
            })
            .await;
        if delivered.is_err() {
            return;
        }
    }
    let _ = events
        .send(SessionEvent::Conn {
            peer: from,
            event: ConnEvent::Closed,
        })
        .await;
}
