//! The wire-level message envelope.
//!
//! Every frame exchanged with the server is a single JSON object carrying a
//! `messageType` tag, a type-specific `payload`, and - on client requests and
//! their replies - a `requestID` used for correlation. Server pushes omit the
//! `requestID` entirely.

use serde::{Deserialize, Serialize};

/// Errors raised while encoding or decoding wire frames.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The frame is not valid JSON, lacks a `messageType`, or carries a
    /// payload that does not match its declared type.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// The only unit ever placed on the wire.
///
/// `payload` stays untyped here; [`crate::ServerEvent::from_envelope`] and
/// [`crate::ClientRequest::into_envelope`] convert between raw payloads and
/// the typed message vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "messageType")]
    pub message_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(rename = "requestID", default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
}

impl Envelope {
    /// Build an envelope from a typed payload.
    pub fn new<T: Serialize>(
        message_type: impl Into<String>,
        payload: &T,
        request_id: Option<u64>,
    ) -> Result<Self, WireError> {
        Ok(Self {
            message_type: message_type.into(),
            payload: serde_json::to_value(payload)?,
            request_id,
        })
    }

    /// Serialize to a UTF-8 text frame.
    pub fn encode(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize a text frame.
    ///
    /// Fails with [`WireError::Malformed`] if the text is not a JSON object
    /// with a `messageType` field. Callers drop the frame on failure; a single
    /// bad frame must not tear down an otherwise healthy session.
    pub fn decode(text: &str) -> Result<Self, WireError> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_request_id_when_present() {
        let envelope = Envelope {
            message_type: "UserLookup".to_string(),
            payload: json!({ "username": "bob" }),
            request_id: Some(7),
        };

        let text = envelope.encode().unwrap();
        let raw: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw["messageType"], "UserLookup");
        assert_eq!(raw["requestID"], 7);
        assert_eq!(raw["payload"]["username"], "bob");
    }

    #[test]
    fn omits_request_id_when_absent() {
        let envelope = Envelope {
            message_type: "LoginRequest".to_string(),
            payload: json!({ "loginID": "alice" }),
            request_id: None,
        };

        let text = envelope.encode().unwrap();
        let raw: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(raw.get("requestID").is_none());
    }

    #[test]
    fn decode_round_trips() {
        let text = r#"{"messageType":"GameUpdate","payload":{"id":"g1"},"requestID":3}"#;
        let envelope = Envelope::decode(text).unwrap();
        assert_eq!(envelope.message_type, "GameUpdate");
        assert_eq!(envelope.request_id, Some(3));
    }

    #[test]
    fn decode_tolerates_missing_payload() {
        let envelope = Envelope::decode(r#"{"messageType":"LoginSuccess"}"#).unwrap();
        assert_eq!(envelope.message_type, "LoginSuccess");
        assert!(envelope.payload.is_null());
        assert_eq!(envelope.request_id, None);
    }

    #[test]
    fn decode_rejects_invalid_json() {
        assert!(matches!(
            Envelope::decode("not json at all"),
            Err(WireError::Malformed(_))
        ));
    }

    #[test]
    fn decode_rejects_missing_message_type() {
        assert!(matches!(
            Envelope::decode(r#"{"payload":{}}"#),
            Err(WireError::Malformed(_))
        ));
    }
}
