//! # Portal Realtime
//!
//! Realtime messaging client for the community portal (Socket.IO v4 over WebSocket).
//!
//! The client opens one connection per signed-in user, authenticates it with the
//! token from a [`SessionStore`], and fans server pushes out to local listeners.
//!
//! ## Example
//!
//! ```no_run
//! use portal_realtime::{
//!     FileSessionStore, RealtimeClient, RealtimeClientOptions, RealtimeEvent, SessionStatus,
//!     listener,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RealtimeClient::builder(RealtimeClientOptions::from_env())?
//!         .with_session_store(FileSessionStore::new("session.json"))
//!         .build();
//!
//!     client.on(
//!         RealtimeEvent::MessageReceive,
//!         listener(|payload| println!("{}", payload)),
//!     );
//!
//!     client.connect("user-42").await?;
//!     client
//!         .watch_status()
//!         .await
//!         .wait_for(|status| *status == SessionStatus::Ready)
//!         .await?;
//!     client.send_message("user-7", "Is the bike still available?", None, None).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod infrastructure;
pub mod messaging;
pub mod session;
pub mod transport;
pub mod types;

pub use client::{
    ConnectOutcome, RealtimeClient, RealtimeClientBuilder, RealtimeClientOptions, SessionStatus,
};
pub use infrastructure::{ApiClient, ReconnectPolicy};
pub use messaging::{Listener, ListenerRegistry, RealtimeEvent, listener};
pub use session::{CachedUser, FileSessionStore, MemorySessionStore, SessionStore};
pub use transport::{Connector, MemoryConnector, TransportEvent, WebSocketConnector};
pub use types::{RealtimeError, RealtimeMessage, Result};
