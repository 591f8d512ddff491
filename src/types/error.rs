use thiserror::Error;

/// Errors that can occur when using the portal realtime client.
#[derive(Error, Debug)]
pub enum RealtimeError {
    /// WebSocket protocol error (connection failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// `connect` was called without a user id
    #[error("No user id supplied")]
    MissingUserId,

    /// `connect` was called while the session store holds no token
    #[error("No auth token in session store")]
    MissingToken,

    /// Attempted operation while not connected to the server
    #[error("Not connected")]
    NotConnected,

    /// Malformed Engine.IO / Socket.IO frame
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Session store could not be read or written
    #[error("Session store error: {0}")]
    Session(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error (malformed endpoint URL)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, RealtimeError>`.
pub type Result<T> = std::result::Result<T, RealtimeError>;
