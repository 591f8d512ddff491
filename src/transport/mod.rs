//! Transport seam between the client and the wire.
//!
//! A [`Connector`] opens one realtime channel and hands back a
//! [`TransportLink`]: a sender for outbound frames and a receiver of
//! [`TransportEvent`]s. Opening never blocks; the transport connects,
//! answers heartbeats and reconnects on its own.

mod memory;
pub mod packet;
mod websocket;

pub use memory::{MemoryConnector, MemoryServer};
pub use websocket::WebSocketConnector;

use crate::infrastructure::ReconnectPolicy;
use crate::types::RealtimeMessage;
use std::time::Duration;
use tokio::sync::mpsc;

/// Parameters for opening a transport.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    /// Socket endpoint, `http(s)://` or `ws(s)://`
    pub endpoint: String,
    pub reconnect: ReconnectPolicy,
    /// Bound on a single handshake attempt
    pub connect_timeout: Duration,
}

/// Frames the client hands to a transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Emit(RealtimeMessage),
    Close,
}

/// What a transport reports back to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// Namespace connected; fires again after every successful reconnect
    Connected,
    /// A connection attempt failed
    ConnectError(String),
    /// An established connection ended; carries the disconnect reason
    Disconnected(String),
    /// A reconnect attempt is scheduled
    Reconnecting { attempt: u32, delay: Duration },
    /// The transport gave up; nothing follows this event
    Failed(String),
    /// A server push
    Event(RealtimeMessage),
}

/// Client side of an open transport.
#[derive(Debug)]
pub struct TransportLink {
    pub outbound: mpsc::UnboundedSender<Outbound>,
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Opens realtime transports.
pub trait Connector: Send + Sync {
    fn open(&self, request: OpenRequest) -> TransportLink;
}
