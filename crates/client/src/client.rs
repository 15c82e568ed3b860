//! The outward-facing action interface.
//!
//! UI collaborators hold a [`GameClient`], call the four actions, and read
//! the [`StateMirror`] for everything they render. Nothing else in this crate
//! is part of the UI contract.

use gridlock_protocol::ClientRequest;

use crate::config::ClientConfig;
use crate::connection::{ConnectionManager, PhaseObserver, SessionPhase};
use crate::correlator::Ack;
use crate::error::{ConfigError, ConnectError, RequestError};
use crate::mirror::StateMirror;

/// Client for one game session.
///
/// One instance corresponds to one connection lifetime. After the session
/// terminates (login failure or transport loss) the instance is spent;
/// construct a new one to start over.
pub struct GameClient {
    conn: ConnectionManager,
}

impl GameClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            conn: ConnectionManager::new(config),
        }
    }

    /// Build a client from `GRIDLOCK_*` environment variables.
    pub fn with_config_from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(ClientConfig::from_env()?))
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Connect and authenticate as `username`.
    ///
    /// Settles with nothing on success; on failure the session is terminated
    /// and the reason is surfaced here.
    pub async fn login(&self, username: &str) -> Result<(), ConnectError> {
        self.conn.login(username).await
    }

    /// Play a move in `game_id`. The move body is opaque to this layer.
    ///
    /// The send happens before this returns; the [`Ack`] only signals that
    /// the server acknowledged receipt. Whether the move was legal shows up
    /// later as a `GameUpdate` in the mirror.
    pub async fn play_move(
        &self,
        game_id: &str,
        mv: serde_json::Value,
    ) -> Result<Ack, RequestError> {
        self.conn
            .send_request(ClientRequest::PlayMove {
                game_id: game_id.to_string(),
                mv,
            })
            .await
    }

    /// Start a new game against `opponent`.
    pub async fn new_game(&self, opponent: &str) -> Result<Ack, RequestError> {
        self.conn
            .send_request(ClientRequest::NewGame {
                opponent: opponent.to_string(),
            })
            .await
    }

    /// Resolve `username` through the server.
    ///
    /// The [`Ack`] settles only after the reply has been folded into the
    /// lookup index; read the mapping from [`Self::mirror`] afterwards.
    pub async fn lookup_opponent(&self, username: &str) -> Result<Ack, RequestError> {
        self.conn
            .send_request(ClientRequest::LookupUser {
                username: username.to_string(),
            })
            .await
    }

    // =========================================================================
    // Passive read surface
    // =========================================================================

    /// The local mirror of server state.
    pub fn mirror(&self) -> &StateMirror {
        self.conn.mirror()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.conn.phase()
    }

    /// Cloneable phase handle for UI binding.
    pub fn phase_observer(&self) -> PhaseObserver {
        self.conn.phase_observer()
    }
}
