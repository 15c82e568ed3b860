//! Client-side error taxonomy.
//!
//! Split by phase: [`ConfigError`] before a client exists, [`ConnectError`]
//! during the login handshake, [`RequestError`] for everything issued while
//! (or instead of) being `Ready`. Frame-level decode failures never surface
//! here - they are dropped and logged by the connection manager.

use gridlock_protocol::WireError;

/// Errors building a [`crate::ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid server URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported URL scheme {scheme:?} (expected ws or wss)")]
    UnsupportedScheme { scheme: String },
    #[error("invalid request timeout {value:?}: not a millisecond count")]
    InvalidTimeout { value: String },
}

/// Errors surfaced by `login`.
///
/// Every variant except `AlreadyConnected` is fatal to the session: the
/// connection manager is `Terminated` and a new one must be constructed to
/// try again.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// A socket is already active for this manager. The existing socket is
    /// left untouched.
    #[error("a socket is already active for this session")]
    AlreadyConnected,
    /// The server rejected the login with an `ErrorMessage`.
    #[error("authentication failed: {reason}")]
    AuthenticationFailed { reason: String },
    /// The handshake reply decoded to something other than a login outcome.
    #[error("unexpected message type during login handshake: {message_type}")]
    UnexpectedMessage { message_type: String },
    /// The handshake reply could not be decoded at all.
    #[error("malformed login reply")]
    MalformedReply(#[from] WireError),
    /// The transport closed before delivering a login reply.
    #[error("connection closed during login handshake")]
    HandshakeClosed,
    /// Socket-level failure while connecting or during the handshake.
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
}

/// Errors surfaced by the correlated actions (`play_move`, `new_game`,
/// `lookup_opponent`) and their [`crate::Ack`] handles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// Action invoked while the session is not `Ready`. Nothing was sent.
    #[error("not connected to server")]
    NotConnected,
    /// No reply arrived within the configured deadline. The pending entry has
    /// been discarded; a late reply will be ignored by the correlator.
    #[error("request timed out")]
    TimedOut,
    /// The session terminated before the reply arrived. The request will
    /// never settle.
    #[error("request abandoned: session terminated")]
    Abandoned,
    /// The request could not be queued for sending.
    #[error("failed to send request: {0}")]
    SendFailed(String),
}
