//! Local mirror of server-owned state.
//!
//! The mirror is the only UI-observable state in the sync core. The
//! connection manager is its only writer; everything else gets a read-only
//! view through the public accessors. The closed mutation set (`set_session`,
//! `upsert_game`, `add_lookup_entry`) is `pub(crate)` to enforce that split
//! at the crate boundary.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use gridlock_protocol::GameRecord;

/// Who this connection is logged in as.
///
/// Both fields stay `None` until the login handshake succeeds, then are set
/// exactly once for the connection's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub username: Option<String>,
    pub player_id: Option<String>,
}

impl Session {
    /// True once the login handshake has committed an identity.
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some() && self.player_id.is_some()
    }
}

#[derive(Default)]
struct MirrorState {
    session: Session,
    /// Insertion order; upserts replace in place so the order never changes
    /// for a known id.
    games: Vec<GameRecord>,
    player_ids_by_username: HashMap<String, String>,
    usernames_by_player_id: HashMap<String, String>,
}

/// Cloneable handle to the shared mirror state.
#[derive(Clone, Default)]
pub struct StateMirror {
    state: Arc<RwLock<MirrorState>>,
}

impl StateMirror {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Read API (UI collaborators)
    // =========================================================================

    /// Current session identity.
    pub async fn session(&self) -> Session {
        self.state.read().await.session.clone()
    }

    /// All known games, in insertion order.
    pub async fn games(&self) -> Vec<GameRecord> {
        self.state.read().await.games.clone()
    }

    /// One game by id.
    pub async fn game(&self, id: &str) -> Option<GameRecord> {
        self.state
            .read()
            .await
            .games
            .iter()
            .find(|g| g.id == id)
            .cloned()
    }

    /// Resolve a username to a player id, if a lookup reply has been seen.
    pub async fn player_id_for(&self, username: &str) -> Option<String> {
        self.state
            .read()
            .await
            .player_ids_by_username
            .get(username)
            .cloned()
    }

    /// Resolve a player id to a username, if a lookup reply has been seen.
    pub async fn username_for(&self, player_id: &str) -> Option<String> {
        self.state
            .read()
            .await
            .usernames_by_player_id
            .get(player_id)
            .cloned()
    }

    // =========================================================================
    // Mutation API (connection manager only)
    // =========================================================================

    /// Commit the session identity from a successful login.
    pub(crate) async fn set_session(&self, username: String, player_id: String) {
        let mut state = self.state.write().await;
        if state.session.is_authenticated() {
            tracing::error!("session already set for this connection, ignoring");
            return;
        }
        tracing::info!(%username, %player_id, "session established");
        state.session = Session {
            username: Some(username),
            player_id: Some(player_id),
        };
    }

    /// Insert or replace a game by id.
    pub(crate) async fn upsert_game(&self, record: GameRecord) {
        let mut state = self.state.write().await;
        match state.games.iter_mut().find(|g| g.id == record.id) {
            Some(existing) => *existing = record,
            None => state.games.push(record),
        }
    }

    /// Record a username/player-id pair in both directions.
    ///
    /// Entries are additive only; nothing is evicted for the session's
    /// lifetime.
    pub(crate) async fn add_lookup_entry(&self, username: String, player_id: String) {
        let mut state = self.state.write().await;
        state
            .player_ids_by_username
            .insert(username.clone(), player_id.clone());
        state.usernames_by_player_id.insert(player_id, username);
    }
}
