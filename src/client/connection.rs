use crate::transport::Outbound;
use crate::types::{RealtimeError, RealtimeMessage, Result};
use tokio::sync::mpsc;

/// Handle to the transport opened for one connect generation.
pub struct ConnectionManager {
    outbound: mpsc::UnboundedSender<Outbound>,
    generation: u64,
}

impl ConnectionManager {
    pub fn new(outbound: mpsc::UnboundedSender<Outbound>, generation: u64) -> Self {
        Self {
            outbound,
            generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Hands a message to the transport
    pub fn send_message(&self, message: RealtimeMessage) -> Result<()> {
        tracing::debug!("Emitting '{}'", message.event);
        self.outbound
            .send(Outbound::Emit(message))
            .map_err(|_| RealtimeError::Connection("transport is closed".to_string()))
    }

    /// Asks the transport to close; safe to call on an already closed transport
    pub fn close(&self) {
        if self.outbound.send(Outbound::Close).is_err() {
            tracing::debug!("Transport of generation {} already gone", self.generation);
        }
    }
}
