use serde::{Deserialize, Serialize};

use crate::RealtimeEvent;

/// A named event and its JSON payload, as exchanged with a transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeMessage {
    pub event: RealtimeEvent,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl RealtimeMessage {
    pub fn new(event: impl Into<RealtimeEvent>, payload: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }

    /// Builds a message from a typed payload.
    pub fn from_payload<T: Serialize>(
        event: impl Into<RealtimeEvent>,
        payload: &T,
    ) -> crate::types::Result<Self> {
        Ok(Self::new(event, serde_json::to_value(payload)?))
    }
}

/// `authenticate` handshake payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthenticatePayload {
    pub token: String,
}

/// `message:send` payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub recipient_id: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing_id: Option<String>,
    /// Lets the caller match an optimistic local echo to the server's `message:sent`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<String>,
}

/// `typing:start` / `typing:stop` payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub recipient_id: String,
}
