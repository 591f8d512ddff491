use super::{Connector, OpenRequest, Outbound, TransportEvent, TransportLink};
use crate::RealtimeEvent;
use crate::types::RealtimeMessage;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// In-memory transport for tests and offline use.
///
/// Every `open` is recorded and yields a [`MemoryServer`] that plays the
/// remote side: it can push events and inspect what the client emitted.
#[derive(Clone, Default)]
pub struct MemoryConnector {
    inner: Arc<Mutex<MemoryConnectorState>>,
}

#[derive(Default)]
struct MemoryConnectorState {
    opened: usize,
    pending: VecDeque<MemoryServer>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of transports opened so far
    pub fn open_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .opened
    }

    /// Takes the server side of the oldest transport not yet taken.
    pub fn take_server(&self) -> Option<MemoryServer> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pending
            .pop_front()
    }
}

impl Connector for MemoryConnector {
    fn open(&self, request: OpenRequest) -> TransportLink {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.opened += 1;
        inner.pending.push_back(MemoryServer {
            request,
            outbound: outbound_rx,
            events: inbound_tx,
        });
        tracing::debug!("Opened in-memory transport #{}", inner.opened);

        TransportLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        }
    }
}

/// Remote side of an in-memory transport.
pub struct MemoryServer {
    request: OpenRequest,
    outbound: mpsc::UnboundedReceiver<Outbound>,
    events: mpsc::UnboundedSender<TransportEvent>,
}

impl MemoryServer {
    /// The request this transport was opened with
    pub fn request(&self) -> &OpenRequest {
        &self.request
    }

    /// Reports a raw transport event to the client.
    ///
    /// Returns `false` once the client stopped listening.
    pub fn send(&self, event: TransportEvent) -> bool {
        self.events.send(event).is_ok()
    }

    /// Transport-level connect.
    pub fn connect(&self) -> bool {
        self.send(TransportEvent::Connected)
    }

    /// Server push.
    pub fn push(&self, event: impl Into<RealtimeEvent>, payload: Value) -> bool {
        self.send(TransportEvent::Event(RealtimeMessage::new(event, payload)))
    }

    /// Drops an established connection with the given reason.
    pub fn drop_connection(&self, reason: &str) -> bool {
        self.send(TransportEvent::Disconnected(reason.to_string()))
    }

    /// Next outbound frame, if one is already queued.
    pub fn try_next(&mut self) -> Option<Outbound> {
        self.outbound.try_recv().ok()
    }

    /// Waits for the next outbound frame. `None` once the client side is gone.
    pub async fn next(&mut self) -> Option<Outbound> {
        self.outbound.recv().await
    }

    /// Waits for the next emitted message.
    ///
    /// Returns `None` if the next frame is a close or the client is gone.
    pub async fn next_emit(&mut self) -> Option<RealtimeMessage> {
        match self.next().await? {
            Outbound::Emit(message) => Some(message),
            Outbound::Close => None,
        }
    }

    /// Whether the client closed this transport or dropped its sender.
    ///
    /// Drains queued frames while looking for the close.
    pub fn is_closed(&mut self) -> bool {
        loop {
            match self.outbound.try_recv() {
                Ok(Outbound::Close) => return true,
                Ok(Outbound::Emit(_)) => continue,
                Err(mpsc::error::TryRecvError::Empty) => return false,
                Err(mpsc::error::TryRecvError::Disconnected) => return true,
            }
        }
    }
}
