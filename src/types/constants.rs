/// Socket.IO event strings sent by the client (magic strings layer)
pub mod client_events {
    pub const AUTHENTICATE: &str = "authenticate";
    pub const MESSAGE_SEND: &str = "message:send";
    pub const TYPING_START: &str = "typing:start";
    pub const TYPING_STOP: &str = "typing:stop";
}

/// Socket.IO event strings pushed by the server
pub mod server_events {
    pub const AUTH_SUCCESS: &str = "auth:success";
    pub const AUTH_ERROR: &str = "auth:error";
    pub const MESSAGE_RECEIVE: &str = "message:receive";
    pub const MESSAGE_SENT: &str = "message:sent";
    pub const USER_ONLINE: &str = "user:online";
    pub const USER_OFFLINE: &str = "user:offline";
    pub const USER_PRESENCE: &str = "user:presence";
}

/// Transport-native event strings
pub mod transport_events {
    pub const CONNECT: &str = "connect";
    pub const CONNECT_ERROR: &str = "connect_error";
    pub const DISCONNECT: &str = "disconnect";
    pub const ERROR: &str = "error";
}

/// Disconnect reasons, as reported by Socket.IO clients
pub mod disconnect_reasons {
    pub const CLIENT: &str = "io client disconnect";
    pub const SERVER: &str = "io server disconnect";
    pub const PING_TIMEOUT: &str = "ping timeout";
    pub const TRANSPORT_CLOSE: &str = "transport close";
    pub const TRANSPORT_ERROR: &str = "transport error";
}

/// Engine.IO protocol revision
pub const ENGINE_IO_VERSION: &str = "4";

/// Socket.IO handshake path
pub const SOCKET_IO_PATH: &str = "/socket.io/";

/// Path suffix stripped from the REST base URL to derive the socket endpoint
pub const API_PATH_SUFFIX: &str = "/api";

/// Environment variables read by `RealtimeClientOptions::from_env`
pub const ENV_SOCKET_URL: &str = "PORTAL_SOCKET_URL";
pub const ENV_API_URL: &str = "PORTAL_API_URL";

/// Default connect timeout (milliseconds)
pub const DEFAULT_TIMEOUT: u64 = 20000;

/// Default reconnection settings
pub const RECONNECT_ATTEMPTS: u32 = 5;
pub const RECONNECT_DELAY: u64 = 1000;
pub const RECONNECT_DELAY_MAX: u64 = 5000;

/// Buffer size of channel-backed subscribers
pub const SUBSCRIBER_BUFFER_SIZE: usize = 100;
