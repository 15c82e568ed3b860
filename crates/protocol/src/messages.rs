//! Typed message vocabulary for the client-server WebSocket connection.
//!
//! Client requests and server events are closed sum types; the routing layer
//! matches on them exhaustively. Server message types this client does not
//! recognize decode into [`ServerEvent::Unknown`] so that newer servers can
//! push new message types without breaking older clients.

use serde::{Deserialize, Serialize};

use crate::envelope::{Envelope, WireError};

// =============================================================================
// Message type tags
// =============================================================================

const LOGIN_REQUEST: &str = "LoginRequest";
const PLAY_MOVE: &str = "PlayMove";
const NEW_GAME: &str = "NewGame";
const USER_LOOKUP: &str = "UserLookup";
const LOGIN_SUCCESS: &str = "LoginSuccess";
const ERROR_MESSAGE: &str = "ErrorMessage";
const GAME_UPDATE: &str = "GameUpdate";

// =============================================================================
// Game State DTO
// =============================================================================

/// One game as the server describes it.
///
/// Only `id` is meaningful to the sync core; board and move state are opaque
/// and round-trip through the record untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    #[serde(flatten)]
    pub state: serde_json::Map<String, serde_json::Value>,
}

// =============================================================================
// Client Requests (client -> server)
// =============================================================================

/// Messages the client sends to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientRequest {
    /// Login handshake opener. Not correlated - the reply is handshake-scoped.
    Login {
        login_id: String,
        authorization: Option<String>,
    },
    /// Play a move in an existing game. The move body is opaque to this core.
    PlayMove {
        game_id: String,
        mv: serde_json::Value,
    },
    /// Start a new game against an opponent.
    NewGame { opponent: String },
    /// Resolve a username/playerID pair.
    LookupUser { username: String },
}

#[derive(Serialize)]
struct LoginPayload<'a> {
    #[serde(rename = "loginID")]
    login_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    authorization: Option<&'a str>,
}

#[derive(Serialize)]
struct PlayMovePayload<'a> {
    #[serde(rename = "gameID")]
    game_id: &'a str,
    #[serde(rename = "move")]
    mv: &'a serde_json::Value,
}

#[derive(Serialize)]
struct NewGamePayload<'a> {
    opponent: &'a str,
}

#[derive(Serialize)]
struct UserLookupPayload<'a> {
    username: &'a str,
}

impl ClientRequest {
    /// The wire-level `messageType` tag for this request.
    pub fn message_type(&self) -> &'static str {
        match self {
            ClientRequest::Login { .. } => LOGIN_REQUEST,
            ClientRequest::PlayMove { .. } => PLAY_MOVE,
            ClientRequest::NewGame { .. } => NEW_GAME,
            ClientRequest::LookupUser { .. } => USER_LOOKUP,
        }
    }

    /// Whether this request is correlated by a request id.
    ///
    /// Login is the exception: its reply is the next handshake frame, not a
    /// correlated response.
    pub fn expects_request_id(&self) -> bool {
        !matches!(self, ClientRequest::Login { .. })
    }

    /// Wrap this request in a wire envelope.
    pub fn into_envelope(self, request_id: Option<u64>) -> Result<Envelope, WireError> {
        let message_type = self.message_type();
        match self {
            ClientRequest::Login {
                login_id,
                authorization,
            } => Envelope::new(
                message_type,
                &LoginPayload {
                    login_id: &login_id,
                    authorization: authorization.as_deref(),
                },
                request_id,
            ),
            ClientRequest::PlayMove { game_id, mv } => Envelope::new(
                message_type,
                &PlayMovePayload {
                    game_id: &game_id,
                    mv: &mv,
                },
                request_id,
            ),
            ClientRequest::NewGame { opponent } => Envelope::new(
                message_type,
                &NewGamePayload {
                    opponent: &opponent,
                },
                request_id,
            ),
            ClientRequest::LookupUser { username } => Envelope::new(
                message_type,
                &UserLookupPayload {
                    username: &username,
                },
                request_id,
            ),
        }
    }
}

// =============================================================================
// Server Events (server -> client)
// =============================================================================

/// Payload of a `LoginSuccess` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginSuccessData {
    pub username: String,
    #[serde(rename = "playerID")]
    pub player_id: String,
}

/// Payload of an `ErrorMessage`.
///
/// When `recoverable` is false the server closes the socket after sending it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub message: String,
    #[serde(default)]
    pub recoverable: bool,
}

/// Payload of a `UserLookup` reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserLookupData {
    pub username: String,
    #[serde(rename = "playerID")]
    pub player_id: String,
}

/// Messages the server sends to the client, decoded from an [`Envelope`].
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    LoginSuccess(LoginSuccessData),
    Error(ErrorData),
    GameUpdate(GameRecord),
    UserLookup(UserLookupData),
    /// A message type this client does not know. Carried instead of an error
    /// so unrecognized pushes do not kill the session.
    Unknown(String),
}

impl ServerEvent {
    /// Decode the typed event out of an envelope.
    ///
    /// The envelope's `request_id` is not part of the event; callers read it
    /// off the envelope before conversion. A payload that does not match its
    /// declared `messageType` is a malformed frame.
    pub fn from_envelope(envelope: Envelope) -> Result<Self, WireError> {
        match envelope.message_type.as_str() {
            LOGIN_SUCCESS => Ok(ServerEvent::LoginSuccess(serde_json::from_value(
                envelope.payload,
            )?)),
            ERROR_MESSAGE => Ok(ServerEvent::Error(serde_json::from_value(
                envelope.payload,
            )?)),
            GAME_UPDATE => Ok(ServerEvent::GameUpdate(serde_json::from_value(
                envelope.payload,
            )?)),
            USER_LOOKUP => Ok(ServerEvent::UserLookup(serde_json::from_value(
                envelope.payload,
            )?)),
            _ => Ok(ServerEvent::Unknown(envelope.message_type)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_request_payload_uses_wire_field_names() {
        let envelope = ClientRequest::Login {
            login_id: "alice".to_string(),
            authorization: None,
        }
        .into_envelope(None)
        .unwrap();

        assert_eq!(envelope.message_type, "LoginRequest");
        assert_eq!(envelope.payload, json!({ "loginID": "alice" }));
        assert_eq!(envelope.request_id, None);
    }

    #[test]
    fn login_request_carries_authorization_when_configured() {
        let envelope = ClientRequest::Login {
            login_id: "alice".to_string(),
            authorization: Some("token-1".to_string()),
        }
        .into_envelope(None)
        .unwrap();

        assert_eq!(
            envelope.payload,
            json!({ "loginID": "alice", "authorization": "token-1" })
        );
    }

    #[test]
    fn play_move_payload_uses_wire_field_names() {
        let envelope = ClientRequest::PlayMove {
            game_id: "g1".to_string(),
            mv: json!({ "x": 2, "y": 0 }),
        }
        .into_envelope(Some(4))
        .unwrap();

        assert_eq!(envelope.message_type, "PlayMove");
        assert_eq!(
            envelope.payload,
            json!({ "gameID": "g1", "move": { "x": 2, "y": 0 } })
        );
        assert_eq!(envelope.request_id, Some(4));
    }

    #[test]
    fn game_update_decodes_with_opaque_state() {
        let envelope = Envelope::decode(
            r#"{"messageType":"GameUpdate","payload":{"id":"g1","board":[[0,1],[1,0]],"turn":"p2"}}"#,
        )
        .unwrap();

        let event = ServerEvent::from_envelope(envelope).unwrap();
        let ServerEvent::GameUpdate(record) = event else {
            panic!("expected GameUpdate, got {event:?}");
        };
        assert_eq!(record.id, "g1");
        assert_eq!(record.state["turn"], json!("p2"));
    }

    #[test]
    fn game_record_round_trips_opaque_fields() {
        let text = r#"{"id":"g9","board":[[1]],"winner":null}"#;
        let record: GameRecord = serde_json::from_str(text).unwrap();
        let back: serde_json::Value =
            serde_json::to_value(&record).unwrap();
        let original: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn error_message_defaults_to_non_recoverable() {
        let envelope = Envelope::decode(
            r#"{"messageType":"ErrorMessage","payload":{"message":"bad credentials"}}"#,
        )
        .unwrap();

        let event = ServerEvent::from_envelope(envelope).unwrap();
        assert_eq!(
            event,
            ServerEvent::Error(ErrorData {
                message: "bad credentials".to_string(),
                recoverable: false,
            })
        );
    }

    #[test]
    fn unrecognized_message_type_decodes_as_unknown() {
        let envelope =
            Envelope::decode(r#"{"messageType":"ServerGossip","payload":{"x":1}}"#).unwrap();

        let event = ServerEvent::from_envelope(envelope).unwrap();
        assert_eq!(event, ServerEvent::Unknown("ServerGossip".to_string()));
    }

    #[test]
    fn known_type_with_mismatched_payload_is_malformed() {
        let envelope =
            Envelope::decode(r#"{"messageType":"UserLookup","payload":{"nope":true}}"#).unwrap();

        assert!(matches!(
            ServerEvent::from_envelope(envelope),
            Err(WireError::Malformed(_))
        ));
    }
}
