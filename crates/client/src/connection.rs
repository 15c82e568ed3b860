//! Connection lifecycle and inbound dispatch.
//!
//! One [`ConnectionManager`] owns one socket for one session. The lifecycle
//! is strictly forward: `Disconnected -> Connecting -> Authenticating ->
//! Ready -> Terminated`. There is no reconnection path; a terminated manager
//! is done, and resuming requires constructing a new one.
//!
//! Inbound frames are processed by a single reader task in transport delivery
//! order: the state-mirror side effect of a frame is always applied before
//! the correlator settles the request that frame replies to.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use gridlock_protocol::{ClientRequest, Envelope, ServerEvent};

use crate::config::ClientConfig;
use crate::correlator::{Ack, PendingRequests, RequestIdSource};
use crate::error::{ConnectError, RequestError};
use crate::mirror::StateMirror;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Initial state; no socket.
    Disconnected,
    /// Socket opening; waiting for the transport-level open.
    Connecting,
    /// Login request sent; exactly one inbound frame is expected to be the
    /// login reply.
    Authenticating,
    /// Steady state; actions are accepted and inbound frames are dispatched.
    Ready,
    /// Terminal state; all pending requests abandoned, no further sends.
    Terminated,
}

impl SessionPhase {
    /// Convert to u8 for atomic storage.
    pub fn to_u8(self) -> u8 {
        match self {
            SessionPhase::Disconnected => 0,
            SessionPhase::Connecting => 1,
            SessionPhase::Authenticating => 2,
            SessionPhase::Ready => 3,
            SessionPhase::Terminated => 4,
        }
    }

    /// Convert from u8 (atomic storage).
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => SessionPhase::Connecting,
            2 => SessionPhase::Authenticating,
            3 => SessionPhase::Ready,
            4 => SessionPhase::Terminated,
            _ => SessionPhase::Disconnected,
        }
    }
}

/// Read-only view of the session phase for UI binding.
///
/// Cloneable and independent of the manager's lifetime, so a UI layer can
/// notice `Terminated` (the transport-loss signal) without owning the
/// connection.
#[derive(Clone)]
pub struct PhaseObserver {
    phase: Arc<AtomicU8>,
}

impl PhaseObserver {
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == SessionPhase::Ready
    }
}

/// Owns the socket, drives the login handshake, and dispatches inbound
/// frames to the state mirror and the request correlator.
pub struct ConnectionManager {
    config: ClientConfig,
    phase: Arc<AtomicU8>,
    /// Outgoing frame queue; present only while the session is `Ready`.
    tx: Arc<Mutex<Option<mpsc::Sender<String>>>>,
    pending: Arc<Mutex<PendingRequests>>,
    ids: RequestIdSource,
    mirror: StateMirror,
}

impl ConnectionManager {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            phase: Arc::new(AtomicU8::new(SessionPhase::Disconnected.to_u8())),
            tx: Arc::new(Mutex::new(None)),
            pending: Arc::new(Mutex::new(PendingRequests::default())),
            ids: RequestIdSource::new(),
            mirror: StateMirror::new(),
        }
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    pub fn phase_observer(&self) -> PhaseObserver {
        PhaseObserver {
            phase: Arc::clone(&self.phase),
        }
    }

    pub fn mirror(&self) -> &StateMirror {
        &self.mirror
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase.store(phase.to_u8(), Ordering::SeqCst);
    }

    /// Open the socket and run the login handshake.
    ///
    /// On success the socket is installed as the session transport and the
    /// manager is `Ready`. Every failure mode is terminal for this manager.
    pub async fn login(&self, username: &str) -> Result<(), ConnectError> {
        let claimed = self.phase.compare_exchange(
            SessionPhase::Disconnected.to_u8(),
            SessionPhase::Connecting.to_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        if claimed.is_err() {
            tracing::error!("login attempted while a socket is already active, keeping the existing socket");
            return Err(ConnectError::AlreadyConnected);
        }

        tracing::info!(url = %self.config.ws_url, "connecting to game server");
        let (ws_stream, _) = match connect_async(self.config.ws_url.as_str()).await {
            Ok(connected) => connected,
            Err(e) => {
                tracing::error!(error = %e, "failed to connect to game server");
                self.set_phase(SessionPhase::Terminated);
                return Err(ConnectError::Transport(e));
            }
        };

        let (mut write, mut read) = ws_stream.split();

        let frame = ClientRequest::Login {
            login_id: username.to_string(),
            authorization: self.config.authorization.clone(),
        }
        .into_envelope(None)
        .and_then(|envelope| envelope.encode())?;

        if let Err(e) = write.send(Message::Text(frame)).await {
            self.set_phase(SessionPhase::Terminated);
            return Err(ConnectError::Transport(e));
        }
        self.set_phase(SessionPhase::Authenticating);

        // Exactly one decoded envelope settles the handshake. Transport-level
        // ping/pong frames are not envelopes and are skipped.
        let reply = loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => break text,
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    self.set_phase(SessionPhase::Terminated);
                    return Err(ConnectError::HandshakeClosed);
                }
                Some(Ok(_)) => {
                    self.set_phase(SessionPhase::Terminated);
                    return Err(ConnectError::UnexpectedMessage {
                        message_type: "<non-text frame>".to_string(),
                    });
                }
                Some(Err(e)) => {
                    self.set_phase(SessionPhase::Terminated);
                    return Err(ConnectError::Transport(e));
                }
            }
        };

        let envelope = match Envelope::decode(&reply) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.set_phase(SessionPhase::Terminated);
                return Err(ConnectError::MalformedReply(e));
            }
        };
        let message_type = envelope.message_type.clone();

        match ServerEvent::from_envelope(envelope) {
            Ok(ServerEvent::LoginSuccess(data)) => {
                self.mirror.set_session(data.username, data.player_id).await;
                self.install_socket(write, read).await;
                self.set_phase(SessionPhase::Ready);
                tracing::info!("login succeeded, session ready");
                Ok(())
            }
            Ok(ServerEvent::Error(err)) => {
                tracing::error!(reason = %err.message, "login rejected by server");
                self.set_phase(SessionPhase::Terminated);
                Err(ConnectError::AuthenticationFailed {
                    reason: err.message,
                })
            }
            Ok(_) => {
                tracing::error!(%message_type, "unexpected message during login handshake");
                self.set_phase(SessionPhase::Terminated);
                Err(ConnectError::UnexpectedMessage { message_type })
            }
            Err(e) => {
                self.set_phase(SessionPhase::Terminated);
                Err(ConnectError::MalformedReply(e))
            }
        }
    }

    /// Assign a fresh request id, register the pending entry, and queue the
    /// frame for sending.
    ///
    /// Fails fast with [`RequestError::NotConnected`] outside `Ready`; in that
    /// case nothing reaches the socket and no id is consumed.
    pub async fn send_request(&self, request: ClientRequest) -> Result<Ack, RequestError> {
        if self.phase() != SessionPhase::Ready {
            return Err(RequestError::NotConnected);
        }
        let tx = {
            let slot = self.tx.lock().await;
            slot.clone()
        };
        let Some(tx) = tx else {
            return Err(RequestError::NotConnected);
        };

        let id = self.ids.next();
        let frame = request
            .into_envelope(Some(id))
            .and_then(|envelope| envelope.encode())
            .map_err(|e| RequestError::SendFailed(e.to_string()))?;

        let (ack_tx, ack_rx) = oneshot::channel();
        self.pending.lock().await.insert(id, ack_tx);

        if let Err(e) = tx.send(frame).await {
            // The session terminated while we were queueing; drop the entry.
            self.pending.lock().await.remove(id);
            return Err(RequestError::SendFailed(e.to_string()));
        }

        Ok(Ack::new(
            id,
            ack_rx,
            Arc::clone(&self.pending),
            self.config.request_timeout,
        ))
    }

    /// Install the authenticated socket as the session transport: a writer
    /// task draining the outgoing queue and a reader task dispatching inbound
    /// frames until the transport drops.
    async fn install_socket(
        &self,
        write: SplitSink<WsStream, Message>,
        read: SplitStream<WsStream>,
    ) {
        let (tx, mut rx) = mpsc::channel::<String>(32);
        {
            let mut slot = self.tx.lock().await;
            if slot.is_some() {
                tracing::error!("socket being replaced, keeping the existing one");
                return;
            }
            *slot = Some(tx);
        }

        tokio::spawn(async move {
            let mut write = write;
            while let Some(frame) = rx.recv().await {
                if let Err(e) = write.send(Message::Text(frame)).await {
                    tracing::error!(error = %e, "failed to send frame");
                    break;
                }
            }
        });

        let phase = Arc::clone(&self.phase);
        let tx_slot = Arc::clone(&self.tx);
        let pending = Arc::clone(&self.pending);
        let mirror = self.mirror.clone();
        tokio::spawn(async move {
            let mut read = read;
            while let Some(frame) = read.next().await {
                match frame {
                    Ok(Message::Text(text)) => dispatch_frame(&text, &mirror, &pending).await,
                    Ok(Message::Close(_)) => {
                        tracing::info!("server closed connection");
                        break;
                    }
                    Ok(Message::Ping(_) | Message::Pong(_)) => {}
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!(error = %e, "websocket error");
                        break;
                    }
                }
            }

            // Terminal teardown. Phase first so no new sends are accepted,
            // then the queue, then the pending table (dropping the senders
            // wakes every in-flight Ack with Abandoned).
            phase.store(SessionPhase::Terminated.to_u8(), Ordering::SeqCst);
            tx_slot.lock().await.take();
            let abandoned = pending.lock().await.clear();
            if abandoned > 0 {
                tracing::warn!(abandoned, "session terminated, pending requests abandoned");
            }
        });
    }
}

/// Route one inbound frame: decode, apply the message-type side effect, then
/// settle the echoed request id, in that order.
async fn dispatch_frame(text: &str, mirror: &StateMirror, pending: &Mutex<PendingRequests>) {
    let envelope = match Envelope::decode(text) {
        Ok(envelope) => envelope,
        Err(error) => {
            tracing::warn!(%error, "dropping malformed frame");
            return;
        }
    };
    let request_id = envelope.request_id;

    let event = match ServerEvent::from_envelope(envelope) {
        Ok(event) => event,
        Err(error) => {
            tracing::warn!(%error, "dropping frame with malformed payload");
            return;
        }
    };

    match event {
        ServerEvent::GameUpdate(record) => mirror.upsert_game(record).await,
        ServerEvent::UserLookup(entry) => {
            mirror.add_lookup_entry(entry.username, entry.player_id).await;
        }
        ServerEvent::Error(err) => {
            if err.recoverable {
                tracing::warn!(message = %err.message, "server reported a recoverable error");
            } else {
                tracing::error!(message = %err.message, "server reported a fatal error, expecting close");
            }
        }
        ServerEvent::LoginSuccess(_) => {
            tracing::warn!("unexpected LoginSuccess outside the handshake, ignoring");
        }
        ServerEvent::Unknown(message_type) => {
            tracing::warn!(%message_type, "unknown websocket message type");
        }
    }

    if let Some(id) = request_id {
        pending.lock().await.resolve(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_phase_round_trips_through_u8() {
        let phases = [
            SessionPhase::Disconnected,
            SessionPhase::Connecting,
            SessionPhase::Authenticating,
            SessionPhase::Ready,
            SessionPhase::Terminated,
        ];

        for phase in phases {
            assert_eq!(SessionPhase::from_u8(phase.to_u8()), phase);
        }
    }

    #[test]
    fn observer_reads_phase() {
        let config = ClientConfig::new("ws://localhost:9/ws").expect("valid url");
        let manager = ConnectionManager::new(config);
        let observer = manager.phase_observer();

        assert_eq!(observer.phase(), SessionPhase::Disconnected);
        assert!(!observer.is_ready());

        manager.set_phase(SessionPhase::Ready);
        assert!(observer.is_ready());
    }

    #[tokio::test]
    async fn dispatch_applies_side_effect_before_resolving() {
        let mirror = StateMirror::new();
        let pending = Mutex::new(PendingRequests::default());
        let (tx, rx) = oneshot::channel();
        pending.lock().await.insert(1, tx);

        dispatch_frame(
            r#"{"messageType":"UserLookup","payload":{"username":"bob","playerID":"p7"},"requestID":1}"#,
            &mirror,
            &pending,
        )
        .await;

        // The continuation fired, and the mapping was already present when it did.
        assert!(rx.await.is_ok());
        assert_eq!(mirror.player_id_for("bob").await.as_deref(), Some("p7"));
    }

    #[tokio::test]
    async fn dispatch_ignores_unknown_request_ids() {
        let mirror = StateMirror::new();
        let pending = Mutex::new(PendingRequests::default());

        dispatch_frame(
            r#"{"messageType":"GameUpdate","payload":{"id":"g1"},"requestID":999}"#,
            &mirror,
            &pending,
        )
        .await;

        // Side effect applied, no fault raised.
        assert!(mirror.game("g1").await.is_some());
        assert!(pending.lock().await.is_empty());
    }

    #[tokio::test]
    async fn dispatch_drops_malformed_frames_without_resolving() {
        let mirror = StateMirror::new();
        let pending = Mutex::new(PendingRequests::default());
        let (tx, mut rx) = oneshot::channel();
        pending.lock().await.insert(1, tx);

        dispatch_frame("not json", &mirror, &pending).await;
        dispatch_frame(
            r#"{"messageType":"UserLookup","payload":{"bogus":1},"requestID":1}"#,
            &mirror,
            &pending,
        )
        .await;

        // Neither frame settled the request.
        assert!(rx.try_recv().is_err());
        assert_eq!(pending.lock().await.len(), 1);
    }
}
