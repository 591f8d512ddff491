use super::{
    ClientState, ConnectionManager, RealtimeClientBuilder, RealtimeClientOptions, SessionStatus,
};
use crate::RealtimeEvent;
use crate::messaging::{Listener, ListenerRegistry, MessageRouter};
use crate::session::SessionStore;
use crate::transport::{Connector, OpenRequest, TransportLink};
use crate::types::constants::disconnect_reasons;
use crate::types::{
    RealtimeError, RealtimeMessage, Result, SendMessagePayload, TypingPayload,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc, watch};

/// What a successful [`RealtimeClient::connect`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// A new transport was requested
    Opened,
    /// The same user is already connected or connecting; nothing was done
    AlreadyConnected,
    /// The previous user's transport was closed and a new one requested
    Replaced { previous_user: String },
}

/// The realtime messaging channel of the portal.
///
/// `RealtimeClient` owns one Socket.IO connection, authenticates it with the
/// token from the [`SessionStore`], and re-publishes server pushes to any
/// number of local listeners. Clones share the same connection and registry.
///
/// # Example
///
/// ```no_run
/// use portal_realtime::{
///     FileSessionStore, RealtimeClient, RealtimeClientOptions, RealtimeEvent, listener,
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = RealtimeClient::builder(RealtimeClientOptions {
///     api_url: Some("https://portal.example.com/api".to_string()),
///     ..Default::default()
/// })?
/// .with_session_store(FileSessionStore::new("session.json"))
/// .build();
///
/// client.on(
///     RealtimeEvent::MessageReceive,
///     listener(|payload| println!("new message: {}", payload)),
/// );
/// client.connect("user-42").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RealtimeClient {
    pub(crate) endpoint: String,
    pub(crate) options: RealtimeClientOptions,
    pub(crate) session: Arc<dyn SessionStore>,
    pub(crate) connector: Arc<dyn Connector>,
    pub(crate) registry: Arc<ListenerRegistry>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<ClientState>>,
}

impl RealtimeClient {
    /// Creates a client with the websocket transport and an empty in-memory
    /// session store. Use [`builder`](Self::builder) to supply a store.
    pub fn new(options: RealtimeClientOptions) -> Result<Self> {
        RealtimeClientBuilder::new(options).map(|builder| builder.build())
    }

    pub fn builder(options: RealtimeClientOptions) -> Result<RealtimeClientBuilder> {
        RealtimeClientBuilder::new(options)
    }

    /// Opens the realtime channel for `user_id`.
    ///
    /// Returns as soon as the transport has been requested. The outcome of
    /// the `authenticate` handshake is observed through [`status`](Self::status),
    /// [`watch_status`](Self::watch_status) and the `disconnect`/`error` events.
    ///
    /// Connecting again for the user that is already connected is a no-op.
    /// Connecting for a different user closes the current transport first.
    ///
    /// # Errors
    ///
    /// - [`RealtimeError::MissingUserId`] if `user_id` is blank
    /// - [`RealtimeError::MissingToken`] if the session store holds no token
    ///
    /// In both cases no transport is opened.
    pub async fn connect(&self, user_id: &str) -> Result<ConnectOutcome> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            tracing::warn!("connect called without a user id");
            return Err(RealtimeError::MissingUserId);
        }
        let Some(token) = self.session.token() else {
            tracing::warn!("No auth token stored, not connecting {}", user_id);
            return Err(RealtimeError::MissingToken);
        };

        let mut state = self.state.write().await;

        let previous_user = match state.user_id.clone() {
            Some(current) if state.status().is_active() => {
                if current == user_id {
                    tracing::debug!("Already connected as {}", user_id);
                    return Ok(ConnectOutcome::AlreadyConnected);
                }
                tracing::info!("Replacing connection of {} with {}", current, user_id);
                state.task_manager.abort_all();
                state.teardown(SessionStatus::Disconnected);
                Some(current)
            }
            _ => None,
        };

        let generation = state.next_generation();
        let TransportLink {
            outbound,
            mut inbound,
        } = self.connector.open(OpenRequest {
            endpoint: self.endpoint.clone(),
            reconnect: self.options.reconnect.clone(),
            connect_timeout: self.options.connect_timeout,
        });

        state.connection = Some(ConnectionManager::new(outbound, generation));
        state.user_id = Some(user_id.to_string());
        state.transition(SessionStatus::Connecting);

        let router = MessageRouter::new(
            Arc::clone(&self.state),
            Arc::clone(&self.registry),
            token,
            generation,
        );
        state.task_manager.spawn(async move {
            loop {
                let Some(event) = inbound.recv().await else {
                    router.transport_closed().await;
                    break;
                };
                if !router.route(event).await {
                    break;
                }
            }
            tracing::debug!("Event driver for generation {} finished", generation);
        });
        drop(state);

        tracing::info!("Connecting to {} as {}", self.endpoint, user_id);

        Ok(match previous_user {
            Some(previous_user) => {
                self.publish_client_disconnect();
                ConnectOutcome::Replaced { previous_user }
            }
            None => ConnectOutcome::Opened,
        })
    }

    /// Closes the channel and forgets the user. Safe to call when not connected.
    ///
    /// Listeners stay registered and will receive events after the next `connect`.
    pub async fn disconnect(&self) {
        let had_connection = {
            let mut state = self.state.write().await;
            state.task_manager.abort_all();
            state.teardown(SessionStatus::Disconnected)
        };

        if had_connection {
            tracing::info!("Disconnected from realtime server");
            self.publish_client_disconnect();
        }
    }

    /// Sends a chat message.
    ///
    /// `client_message_id` is echoed back in `message:sent`, so an optimistic
    /// local copy can be matched with the server's acknowledgement.
    ///
    /// # Errors
    ///
    /// [`RealtimeError::NotConnected`] unless the session is authenticated.
    /// Nothing is queued and nothing is retried.
    pub async fn send_message(
        &self,
        recipient_id: &str,
        content: &str,
        listing_id: Option<&str>,
        client_message_id: Option<&str>,
    ) -> Result<()> {
        let payload = SendMessagePayload {
            recipient_id: recipient_id.to_string(),
            content: content.to_string(),
            listing_id: listing_id.map(str::to_string),
            client_message_id: client_message_id.map(str::to_string),
        };
        self.emit(RealtimeMessage::from_payload(
            RealtimeEvent::MessageSend,
            &payload,
        )?)
        .await
    }

    pub async fn start_typing(&self, recipient_id: &str) -> Result<()> {
        self.emit_typing(RealtimeEvent::TypingStart, recipient_id)
            .await
    }

    pub async fn stop_typing(&self, recipient_id: &str) -> Result<()> {
        self.emit_typing(RealtimeEvent::TypingStop, recipient_id)
            .await
    }

    async fn emit_typing(&self, event: RealtimeEvent, recipient_id: &str) -> Result<()> {
        let payload = TypingPayload {
            recipient_id: recipient_id.to_string(),
        };
        self.emit(RealtimeMessage::from_payload(event, &payload)?)
            .await
    }

    async fn emit(&self, message: RealtimeMessage) -> Result<()> {
        let state = self.state.read().await;
        match (state.status(), state.connection.as_ref()) {
            (SessionStatus::Ready, Some(connection)) => connection.send_message(message),
            (status, _) => {
                tracing::warn!("Not sending '{}' while {}", message.event, status);
                Err(RealtimeError::NotConnected)
            }
        }
    }

    /// Registers a listener for an event. Returns `false` if it was already registered.
    pub fn on(&self, event: impl Into<RealtimeEvent>, listener: Listener) -> bool {
        self.registry.on(event, listener)
    }

    /// Unregisters a listener. Other listeners of the event are unaffected.
    pub fn off(&self, event: impl Into<RealtimeEvent>, listener: &Listener) -> bool {
        self.registry.off(event, listener)
    }

    /// Channel-backed alternative to [`on`](Self::on); drop the receiver to unsubscribe.
    pub fn subscribe(&self, event: impl Into<RealtimeEvent>) -> mpsc::Receiver<Value> {
        self.registry.subscribe(event)
    }

    /// Whether the transport is connected, authenticated or not.
    pub async fn is_connected(&self) -> bool {
        self.state.read().await.status().is_transport_connected()
    }

    pub async fn status(&self) -> SessionStatus {
        self.state.read().await.status().clone()
    }

    /// Receiver notified on every status change
    pub async fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.state.read().await.subscribe_status()
    }

    /// User the current connection was opened for
    pub async fn current_user(&self) -> Option<String> {
        self.state.read().await.user_id.clone()
    }

    /// Resolved socket endpoint
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn publish_client_disconnect(&self) {
        self.registry.publish(
            &RealtimeEvent::Disconnect,
            &Value::String(disconnect_reasons::CLIENT.to_string()),
        );
    }
}
