//! Gridlock Client - the WebSocket synchronization core for the game client.
//!
//! This crate owns the single connection to the game server: the login
//! handshake, request/reply correlation, and the local mirror of game state
//! that UI layers read. It renders nothing and validates no game rules - move
//! legality is the server's job, and anything visual lives above this crate.
//!
//! # Usage
//!
//! ```rust,ignore
//! let client = GameClient::with_config_from_env()?;
//! client.login("alice").await?;
//!
//! let ack = client.lookup_opponent("bob").await?;
//! ack.settled().await?;
//! let player_id = client.mirror().player_id_for("bob").await;
//! ```
//!
//! There is no reconnection: once a session terminates, construct a new
//! [`GameClient`].

pub mod client;
pub mod config;
pub mod connection;
pub mod correlator;
pub mod error;
pub mod mirror;

pub use client::GameClient;
pub use config::ClientConfig;
pub use connection::{PhaseObserver, SessionPhase};
pub use correlator::Ack;
pub use error::{ConfigError, ConnectError, RequestError};
pub use mirror::{Session, StateMirror};

// Wire vocabulary re-exported for callers that build or inspect payloads.
pub use gridlock_protocol::GameRecord;
