use crate::types::constants::{client_events, server_events, transport_events};
use serde::{Deserialize, Serialize};

/// Type-safe realtime events
///
/// Covers the outbound actions, the server pushes, and the transport-native
/// events of the messaging socket. Anything else is carried as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RealtimeEvent {
    /// Client handshake action carrying the bearer token
    Authenticate,
    AuthSuccess,
    AuthError,

    /// Outbound chat message
    MessageSend,
    /// Inbound chat message
    MessageReceive,
    /// Delivery acknowledgement for a message this client sent
    MessageSent,

    TypingStart,
    TypingStop,

    UserOnline,
    UserOffline,
    UserPresence,

    /// Transport-level connect
    Connect,
    /// Transport-level connect failure
    ConnectError,
    /// Connection error as re-published to subscribers
    Error,
    /// Connection closed; payload is the reason string
    Disconnect,

    /// Custom user-defined event
    Custom(String),
}

impl RealtimeEvent {
    /// Parse a string into a RealtimeEvent
    pub fn parse(s: &str) -> Self {
        match s {
            client_events::AUTHENTICATE => Self::Authenticate,
            server_events::AUTH_SUCCESS => Self::AuthSuccess,
            server_events::AUTH_ERROR => Self::AuthError,
            client_events::MESSAGE_SEND => Self::MessageSend,
            server_events::MESSAGE_RECEIVE => Self::MessageReceive,
            server_events::MESSAGE_SENT => Self::MessageSent,
            client_events::TYPING_START => Self::TypingStart,
            client_events::TYPING_STOP => Self::TypingStop,
            server_events::USER_ONLINE => Self::UserOnline,
            server_events::USER_OFFLINE => Self::UserOffline,
            server_events::USER_PRESENCE => Self::UserPresence,
            transport_events::CONNECT => Self::Connect,
            transport_events::CONNECT_ERROR => Self::ConnectError,
            transport_events::ERROR => Self::Error,
            transport_events::DISCONNECT => Self::Disconnect,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Convert event to string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Authenticate => client_events::AUTHENTICATE,
            Self::AuthSuccess => server_events::AUTH_SUCCESS,
            Self::AuthError => server_events::AUTH_ERROR,
            Self::MessageSend => client_events::MESSAGE_SEND,
            Self::MessageReceive => server_events::MESSAGE_RECEIVE,
            Self::MessageSent => server_events::MESSAGE_SENT,
            Self::TypingStart => client_events::TYPING_START,
            Self::TypingStop => client_events::TYPING_STOP,
            Self::UserOnline => server_events::USER_ONLINE,
            Self::UserOffline => server_events::USER_OFFLINE,
            Self::UserPresence => server_events::USER_PRESENCE,
            Self::Connect => transport_events::CONNECT,
            Self::ConnectError => transport_events::CONNECT_ERROR,
            Self::Error => transport_events::ERROR,
            Self::Disconnect => transport_events::DISCONNECT,
            Self::Custom(s) => s,
        }
    }

    /// Whether the event is passed through to local subscribers.
    pub fn is_republished(&self) -> bool {
        matches!(
            self,
            Self::MessageReceive
                | Self::MessageSent
                | Self::TypingStart
                | Self::TypingStop
                | Self::UserOnline
                | Self::UserOffline
                | Self::UserPresence
                | Self::Error
                | Self::Disconnect
        )
    }
}

impl From<&str> for RealtimeEvent {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for RealtimeEvent {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<RealtimeEvent> for String {
    fn from(event: RealtimeEvent) -> Self {
        event.as_str().to_string()
    }
}

impl std::fmt::Display for RealtimeEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
