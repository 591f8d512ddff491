use super::{ClientState, RealtimeClient};
use crate::infrastructure::{ReconnectPolicy, socket_endpoint_from_api};
use crate::messaging::ListenerRegistry;
use crate::session::{MemorySessionStore, SessionStore};
use crate::transport::packet::socket_io_url;
use crate::transport::{Connector, WebSocketConnector};
use crate::types::constants::{DEFAULT_TIMEOUT, ENV_API_URL, ENV_SOCKET_URL};
use crate::types::{RealtimeError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct RealtimeClientOptions {
    /// Explicit socket endpoint; takes precedence over `api_url`
    pub socket_url: Option<String>,
    /// REST base URL; the socket endpoint is derived by dropping its `/api` suffix
    pub api_url: Option<String>,
    pub reconnect: ReconnectPolicy,
    pub connect_timeout: Duration,
}

impl Default for RealtimeClientOptions {
    fn default() -> Self {
        Self {
            socket_url: None,
            api_url: None,
            reconnect: ReconnectPolicy::default(),
            connect_timeout: Duration::from_millis(DEFAULT_TIMEOUT),
        }
    }
}

impl RealtimeClientOptions {
    /// Reads `PORTAL_SOCKET_URL` and `PORTAL_API_URL`; everything else keeps its default.
    pub fn from_env() -> Self {
        Self {
            socket_url: non_empty_env(ENV_SOCKET_URL),
            api_url: non_empty_env(ENV_API_URL),
            ..Default::default()
        }
    }

    /// Resolves the socket endpoint.
    pub fn socket_endpoint(&self) -> Result<String> {
        if let Some(socket_url) = self.socket_url.as_deref() {
            return Ok(socket_url.trim().to_string());
        }
        if let Some(api_url) = self.api_url.as_deref() {
            return Ok(socket_endpoint_from_api(api_url.trim()));
        }
        Err(RealtimeError::Connection(format!(
            "no socket endpoint configured; set {} or {}",
            ENV_SOCKET_URL, ENV_API_URL
        )))
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Builder for RealtimeClient that handles initialization
pub struct RealtimeClientBuilder {
    endpoint: String,
    options: RealtimeClientOptions,
    session: Option<Arc<dyn SessionStore>>,
    connector: Option<Arc<dyn Connector>>,
}

impl RealtimeClientBuilder {
    /// Create a new builder; fails if no usable endpoint can be resolved
    pub fn new(options: RealtimeClientOptions) -> Result<Self> {
        let endpoint = options.socket_endpoint()?;
        socket_io_url(&endpoint)?;

        Ok(Self {
            endpoint,
            options,
            session: None,
            connector: None,
        })
    }

    /// Where the auth token is read from at connect time
    pub fn with_session_store(mut self, session: impl SessionStore + 'static) -> Self {
        self.session = Some(Arc::new(session));
        self
    }

    pub fn with_shared_session_store(mut self, session: Arc<dyn SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Replaces the websocket transport, e.g. with a `MemoryConnector`
    pub fn with_connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    pub fn build(self) -> RealtimeClient {
        RealtimeClient {
            endpoint: self.endpoint,
            options: self.options,
            session: self
                .session
                .unwrap_or_else(|| Arc::new(MemorySessionStore::new())),
            connector: self
                .connector
                .unwrap_or_else(|| Arc::new(WebSocketConnector::new())),
            registry: Arc::new(ListenerRegistry::new()),
            state: Arc::new(RwLock::new(ClientState::new())),
        }
    }
}
