// Module declarations
mod builder;
mod connection;
mod core;
mod state;

// Public API exports
pub use builder::{RealtimeClientBuilder, RealtimeClientOptions};
pub use connection::ConnectionManager;
pub use self::core::{ConnectOutcome, RealtimeClient};
pub use state::{ClientState, SessionStatus};
