//! Gridlock Protocol - wire types shared by the game server and client
//!
//! This crate contains everything that crosses the WebSocket connection:
//! - The JSON message envelope (`Envelope`)
//! - Typed client requests and server events (`ClientRequest`, `ServerEvent`)
//! - The opaque game state DTO (`GameRecord`)
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, serde_json, and thiserror
//! 2. **No business logic** - Pure data types and serialization
//! 3. **Closed message vocabulary** - Unrecognized server message types decode
//!    into an explicit `Unknown` variant instead of failing

pub mod envelope;
pub mod messages;

// =============================================================================
// Wire Envelope
// =============================================================================
pub use envelope::{Envelope, WireError};

// =============================================================================
// Message Types
// =============================================================================
pub use messages::{
    ClientRequest, ErrorData, GameRecord, LoginSuccessData, ServerEvent, UserLookupData,
};
