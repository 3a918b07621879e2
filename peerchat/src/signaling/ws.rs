//! WebSocket signaling client.
//!
//! Implements [`SignalingService`] against an external broker speaking the
//! [`SignalMessage`] protocol over WebSocket binary frames. The broker is
//! not part of this repository; this module only dials it, claims an
//! identity, and turns broker traffic into [`SessionEvent`]s.
//!
//! Registration is a single attempt per client: the `Register` frame is
//! sent during [`WsSignaling::connect`] and the verdict arrives on the
//! event stream, so the caller observes a pending interval before the
//! session reaches its final state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use peerchat_proto::codec;
use peerchat_proto::message::PeerId;
use peerchat_proto::signal::{self, SignalMessage};

use super::{ConnEvent, Connection, ServiceError, SessionEvent, SignalingService};

/// Type alias for the write half of a WebSocket connection.
type WsSink = futures_util::stream::SplitSink<
    WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
    WsMessage,
>;

/// Type alias for the read half of a WebSocket connection.
type WsReader =
    futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>>;

/// Timeout for establishing the WebSocket connection to the broker.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the session event queue.
const EVENT_BUFFER: usize = 256;

/// Capacity of each connection's outbound payload queue.
const CONNECTION_BUFFER: usize = 64;

/// WebSocket client for an external signaling broker.
///
/// Created via [`WsSignaling::connect`], which dials the broker, sends the
/// `Register` frame, and spawns a background reader task. All subsequent
/// traffic — registration verdict, inbound dials (auto-acknowledged),
/// payloads, closes — surfaces through [`SignalingService::next_event`].
///
/// Dropping the client aborts the reader task; once the session layer
/// drops its connection handles, the write half follows and the broker
/// sees the socket close, releasing the registered identity regardless of
/// the last observed session state.
pub struct WsSignaling {
    /// This client's identity.
    local_id: PeerId,
    /// The broker URL (ws:// or wss://).
    server_url: String,
    /// Write half of the WebSocket, shared with forwarder tasks.
    writer: Arc<Mutex<WsSink>>,
    /// Session events produced by the background reader task.
    events: Mutex<mpsc::Receiver<SessionEvent>>,
    /// Whether the broker has acknowledged our registration.
    registered: Arc<AtomicBool>,
    /// Handle to the background reader task, aborted on drop.
    reader_handle: tokio::task::JoinHandle<()>,
}

impl WsSignaling {
    /// Dial the broker and claim an identity.
    ///
    /// Performs the following steps:
    /// 1. Establishes a WebSocket connection to `server_url` (10s timeout)
    /// 2. Sends a `Register` frame with the local identity
    /// 3. Spawns a background task that reads broker traffic
    ///
    /// The registration verdict is NOT awaited here — it arrives as a
    /// [`SessionEvent::Registered`] or [`SessionEvent::RegistrationError`].
    ///
    /// # Errors
    ///
    /// - [`ServiceError::InvalidUrl`] if `server_url` does not parse.
    /// - [`ServiceError::Timeout`] if the connection attempt times out.
    /// - [`ServiceError::Io`] for TLS/HTTP failures or a send failure on
    ///   the `Register` frame.
    pub async fn connect(server_url: &str, local_id: PeerId) -> Result<Self, ServiceError> {
        url::Url::parse(server_url).map_err(|e| ServiceError::InvalidUrl(e.to_string()))?;

        let (ws_stream, _response) =
            tokio::time::timeout(CONNECT_TIMEOUT, connect_async(server_url))
                .await
                .map_err(|_| {
                    tracing::warn!(url = server_url, "broker WebSocket connect timed out");
                    ServiceError::Timeout
                })?
                .map_err(|e| {
                    tracing::warn!(url = server_url, err = %e, "broker WebSocket connect failed");
                    map_ws_connect_error(&e)
                })?;

        let (mut ws_sender, ws_reader) = ws_stream.split();

        let register = SignalMessage::Register {
            identity: local_id.as_str().to_string(),
        };
        let bytes =
            signal::encode(&register).map_err(|e| ServiceError::Io(std::io::Error::other(e)))?;
        ws_sender
            .send(WsMessage::Binary(bytes.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "failed to send Register frame");
                ServiceError::Io(std::io::Error::other(format!(
                    "failed to send Register: {e}"
                )))
            })?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let registered = Arc::new(AtomicBool::new(false));
        let writer = Arc::new(Mutex::new(ws_sender));

        let reader_handle = tokio::spawn(reader_loop(
            local_id.clone(),
            ws_reader,
            Arc::clone(&writer),
            events_tx,
            Arc::clone(&registered),
        ));

        Ok(Self {
            local_id,
            server_url: server_url.to_string(),
            writer,
            events: Mutex::new(events_rx),
            registered,
            reader_handle,
        })
    }

    /// Return the broker URL this client dialed.
    #[must_use]
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Whether the broker has acknowledged our registration.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Relaxed)
    }
}

impl SignalingService for WsSignaling {
    /// Send a dial request for `remote` to the broker.
    ///
    /// The channel opens when the remote's acceptance comes back as a
    /// `ConnectAck`, surfacing as [`ConnEvent::Opened`]. An unreachable
    /// peer produces no event at all — the broker's error is logged and
    /// the peer simply never appears.
    async fn open(&self, remote: &PeerId) -> Result<(), ServiceError> {
        if !self.registered.load(Ordering::Relaxed) {
            return Err(ServiceError::NotRegistered(self.local_id.clone()));
        }

        let dial = SignalMessage::Connect {
            from: self.local_id.as_str().to_string(),
            to: remote.as_str().to_string(),
        };
        let bytes =
            signal::encode(&dial).map_err(|e| ServiceError::Io(std::io::Error::other(e)))?;

        let mut sink = self.writer.lock().await;
        sink.send(WsMessage::Binary(bytes.into()))
            .await
            .map_err(|e| {
                tracing::warn!(err = %e, "dial request send failed");
                self.registered.store(false, Ordering::Relaxed);
                ServiceError::ServiceClosed
            })?;
        Ok(())
    }

    async fn next_event(&self) -> Option<SessionEvent> {
        let mut events = self.events.lock().await;
        events.recv().await
    }

    fn local_identity(&self) -> &PeerId {
        &self.local_id
    }
}

impl Drop for WsSignaling {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

/// Background task that reads broker frames and dispatches them.
///
/// Malformed frames — undecodable `SignalMessage`s or payloads that do not
/// decode into a chat message — are logged and skipped; the task never
/// disconnects on bad data. When the socket closes or errors out, a final
/// `RegistrationError` event moves the session to its disconnected state.
async fn reader_loop(
    local: PeerId,
    mut ws_reader: WsReader,
    writer: Arc<Mutex<WsSink>>,
    events: mpsc::Sender<SessionEvent>,
    registered: Arc<AtomicBool>,
) {
    let mut failure_reported = false;

    while let Some(frame) = ws_reader.next().await {
        match frame {
            Ok(WsMessage::Binary(data)) => match signal::decode(&data) {
                Ok(SignalMessage::Registered { identity }) => {
                    registered.store(true, Ordering::Relaxed);
                    tracing::info!(identity = %identity, "registered with signaling broker");
                    let event = SessionEvent::Registered {
                        identity: PeerId::new(identity),
                    };
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(SignalMessage::Connect { from, .. }) => {
                    // Inbound dial: accept it and open our side. Outbound
                    // and inbound connections share the same Opened path.
                    let ack = SignalMessage::ConnectAck {
                        from: local.as_str().to_string(),
                        to: from.clone(),
                    };
                    if send_frame(&writer, &ack).await.is_err() {
                        tracing::warn!(peer = %from, "failed to acknowledge inbound dial");
                        continue;
                    }
                    emit_opened(&local, PeerId::new(from), &writer, &events).await;
                }
                Ok(SignalMessage::ConnectAck { from, .. }) => {
                    emit_opened(&local, PeerId::new(from), &writer, &events).await;
                }
                Ok(SignalMessage::Payload { from, payload, .. }) => {
                    let peer = PeerId::new(from);
                    match codec::decode(&payload) {
                        Ok(message) => {
                            let event = SessionEvent::Conn {
                                peer,
                                event: ConnEvent::DataReceived(message),
                            };
                            if events.send(event).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            // Fail closed: an undecodable payload never
                            // reaches history.
                            tracing::warn!(peer = %peer, error = %e, "malformed payload dropped");
                        }
                    }
                }
                Ok(SignalMessage::Close { from, .. }) => {
                    let event = SessionEvent::Conn {
                        peer: PeerId::new(from),
                        event: ConnEvent::Closed,
                    };
                    if events.send(event).await.is_err() {
                        break;
                    }
                }
                Ok(SignalMessage::Error { reason }) => {
                    if registered.load(Ordering::Relaxed) {
                        // Post-registration broker errors (unreachable dial
                        // targets and the like) are logged only; the peer
                        // never appears in the connected list.
                        tracing::warn!(reason = %reason, "signaling broker error");
                    } else {
                        let _ = events
                            .send(SessionEvent::RegistrationError { reason })
                            .await;
                        failure_reported = true;
                        break;
                    }
                }
                Ok(other) => {
                    tracing::debug!(?other, "unexpected signal frame");
                }
                Err(e) => {
                    tracing::warn!(err = %e, "malformed signal frame, skipping");
                }
            },
            Ok(WsMessage::Close(_)) => {
                tracing::info!("signaling WebSocket closed by broker");
                break;
            }
            Ok(
                WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Text(_) | WsMessage::Frame(_),
            ) => {}
            Err(e) => {
                tracing::warn!(err = %e, "signaling WebSocket read error");
                break;
            }
        }
    }

    registered.store(false, Ordering::Relaxed);
    if !failure_reported {
        let _ = events
            .send(SessionEvent::RegistrationError {
                reason: "signaling connection lost".to_string(),
            })
            .await;
    }
    tracing::info!("signaling reader task exiting");
}

/// Mint a connection handle for `remote` and emit its `Opened` event.
async fn emit_opened(
    local: &PeerId,
    remote: PeerId,
    writer: &Arc<Mutex<WsSink>>,
    events: &mpsc::Sender<SessionEvent>,
) {
    let (tx, rx) = mpsc::channel(CONNECTION_BUFFER);
    tokio::spawn(forward_outbound(
        local.clone(),
        remote.clone(),
        rx,
        Arc::clone(writer),
    ));

    let conn = Connection::new(remote.clone(), tx);
    let _ = events
        .send(SessionEvent::Conn {
            peer: remote,
            event: ConnEvent::Opened(conn),
        })
        .await;
}

/// Per-connection task draining queued payloads into broker frames.
///
/// Exits when the session layer drops the connection handle, sending a
/// `Close` frame so the remote side learns the channel is gone.
async fn forward_outbound(
    local: PeerId,
    remote: PeerId,
    mut rx: mpsc::Receiver<peerchat_proto::message::Message>,
    writer: Arc<Mutex<WsSink>>,
) {
    while let Some(message) = rx.recv().await {
        let payload = match codec::encode(&message) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(peer = %remote, error = %e, "payload encode failed, dropping");
                continue;
            }
        };
        let frame = SignalMessage::Payload {
            from: local.as_str().to_string(),
            to: remote.as_str().to_string(),
            payload,
        };
        if send_frame(&writer, &frame).await.is_err() {
            return;
        }
    }

    let close = SignalMessage::Close {
        from: local.as_str().to_string(),
        to: remote.as_str().to_string(),
    };
    let _ = send_frame(&writer, &close).await;
}

/// Encode and send one signal frame over the shared write half.
async fn send_frame(writer: &Arc<Mutex<WsSink>>, msg: &SignalMessage) -> Result<(), ()> {
    let bytes = match signal::encode(msg) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "signal encode failed");
            return Err(());
        }
    };
    let mut sink = writer.lock().await;
    sink.send(WsMessage::Binary(bytes.into())).await.map_err(|e| {
        tracing::warn!(err = %e, "signaling send failed");
    })
}

/// Map a `tokio_tungstenite` connection error to a [`ServiceError`].
fn map_ws_connect_error(err: &tokio_tungstenite::tungstenite::Error) -> ServiceError {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match err {
        WsError::Io(io_err) => ServiceError::Io(std::io::Error::new(
            io_err.kind(),
            format!("broker unreachable: {io_err}"),
        )),
        WsError::Tls(_) => ServiceError::Io(std::io::Error::other(format!("TLS error: {err}"))),
        WsError::Http(response) => ServiceError::Io(std::io::Error::other(format!(
            "broker HTTP error: status {}",
            response.status()
        ))),
        other => ServiceError::Io(std::io::Error::other(format!(
            "broker connection error: {other}"
        ))),
    }
}
