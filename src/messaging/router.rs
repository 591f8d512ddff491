use super::registry::ListenerRegistry;
use crate::RealtimeEvent;
use crate::client::{ClientState, SessionStatus};
use crate::transport::TransportEvent;
use crate::types::constants::disconnect_reasons;
use crate::types::{AuthenticatePayload, RealtimeMessage};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Applies transport events of one connect generation to the client state
/// and re-publishes server pushes to local listeners.
pub struct MessageRouter {
    state: Arc<RwLock<ClientState>>,
    registry: Arc<ListenerRegistry>,
    token: String,
    generation: u64,
}

impl MessageRouter {
    pub fn new(
        state: Arc<RwLock<ClientState>>,
        registry: Arc<ListenerRegistry>,
        token: String,
        generation: u64,
    ) -> Self {
        Self {
            state,
            registry,
            token,
            generation,
        }
    }

    /// Routes one transport event.
    ///
    /// Returns `false` once this generation is finished and the driver
    /// should stop reading.
    pub async fn route(&self, event: TransportEvent) -> bool {
        let mut state = self.state.write().await;
        if state.generation != self.generation {
            tracing::debug!(
                "Discarding {:?} from stale generation {} (current {})",
                event,
                self.generation,
                state.generation
            );
            return false;
        }

        match event {
            TransportEvent::Connected => {
                if state.transition(SessionStatus::Authenticating) {
                    self.authenticate(&state);
                }
                true
            }
            TransportEvent::ConnectError(reason) => {
                drop(state);
                tracing::warn!("Connection error: {}", reason);
                self.registry
                    .publish(&RealtimeEvent::Error, &json!({ "message": reason }));
                true
            }
            TransportEvent::Disconnected(reason) => {
                let keep_going = if reason == disconnect_reasons::SERVER {
                    state.teardown(SessionStatus::Disconnected);
                    false
                } else if reason == disconnect_reasons::CLIENT {
                    // Only seen for closes this client requested.
                    false
                } else {
                    state.transition(SessionStatus::Connecting);
                    true
                };
                drop(state);
                tracing::info!("Disconnected: {}", reason);
                self.registry
                    .publish(&RealtimeEvent::Disconnect, &Value::String(reason));
                keep_going
            }
            TransportEvent::Reconnecting { attempt, delay } => {
                tracing::info!("Reconnect attempt {} scheduled in {:?}", attempt, delay);
                true
            }
            TransportEvent::Failed(reason) => {
                tracing::error!("Realtime transport failed: {}", reason);
                state.teardown(SessionStatus::Failed(reason.clone()));
                drop(state);
                self.registry
                    .publish(&RealtimeEvent::Error, &json!({ "message": reason }));
                false
            }
            TransportEvent::Event(message) => self.route_push(state, message),
        }
    }

    /// Handles a transport that went away without reporting why.
    pub async fn transport_closed(&self) {
        let mut state = self.state.write().await;
        if state.generation != self.generation {
            return;
        }
        tracing::warn!("Transport of generation {} closed unexpectedly", self.generation);
        let had_connection = state.teardown(SessionStatus::Disconnected);
        drop(state);
        if had_connection {
            self.registry.publish(
                &RealtimeEvent::Disconnect,
                &Value::String(disconnect_reasons::TRANSPORT_CLOSE.to_string()),
            );
        }
    }

    fn route_push(
        &self,
        mut state: tokio::sync::RwLockWriteGuard<'_, ClientState>,
        message: RealtimeMessage,
    ) -> bool {
        match message.event {
            RealtimeEvent::AuthSuccess => {
                if state.transition(SessionStatus::Ready) {
                    tracing::info!(
                        "Authenticated as {}",
                        state.user_id.as_deref().unwrap_or("<unknown>")
                    );
                }
                true
            }
            RealtimeEvent::AuthError => {
                let reason = auth_error_reason(&message.payload);
                tracing::error!("Authentication rejected: {}", reason);
                let had_connection = state.teardown(SessionStatus::Failed(reason));
                drop(state);
                if had_connection {
                    self.registry.publish(
                        &RealtimeEvent::Disconnect,
                        &Value::String(disconnect_reasons::CLIENT.to_string()),
                    );
                }
                false
            }
            ref event if event.is_republished() || matches!(event, RealtimeEvent::Custom(_)) => {
                drop(state);
                self.registry.publish(&message.event, &message.payload);
                true
            }
            ref other => {
                tracing::debug!("Ignoring server push '{}'", other);
                true
            }
        }
    }

    fn authenticate(&self, state: &ClientState) {
        let Some(connection) = state.connection.as_ref() else {
            return;
        };
        let payload = AuthenticatePayload {
            token: self.token.clone(),
        };
        let result = RealtimeMessage::from_payload(RealtimeEvent::Authenticate, &payload)
            .and_then(|message| connection.send_message(message));

        match result {
            Ok(()) => tracing::debug!("Sent authenticate for generation {}", self.generation),
            Err(e) => tracing::error!("Failed to send authenticate: {}", e),
        }
    }
}

/// `auth:error` carries either a bare string or an object with a `message`.
fn auth_error_reason(payload: &Value) -> String {
    match payload {
        Value::String(reason) => reason.clone(),
        Value::Null => "authentication failed".to_string(),
        other => other
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_reason() {
        assert_eq!(auth_error_reason(&json!("Invalid token")), "Invalid token");
        assert_eq!(
            auth_error_reason(&json!({ "message": "Token expired" })),
            "Token expired"
        );
        assert_eq!(auth_error_reason(&Value::Null), "authentication failed");
        assert_eq!(auth_error_reason(&json!({ "code": 401 })), r#"{"code":401}"#);
    }
}
