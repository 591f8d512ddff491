use super::connection::ConnectionManager;
use crate::infrastructure::TaskManager;
use tokio::sync::watch;

/// Lifecycle of the realtime session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// No transport
    Disconnected,
    /// Transport requested or reconnecting
    Connecting,
    /// Transport up, `authenticate` sent, waiting for the verdict
    Authenticating,
    /// Authenticated; messages may be sent
    Ready,
    /// Authentication was rejected or the transport gave up
    Failed(String),
}

impl SessionStatus {
    /// Whether a transport is open or being opened.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Authenticating | Self::Ready)
    }

    /// Whether the transport itself is connected.
    pub fn is_transport_connected(&self) -> bool {
        matches!(self, Self::Authenticating | Self::Ready)
    }

    /// Whether `self -> next` is one of the documented edges.
    pub fn can_transition_to(&self, next: &SessionStatus) -> bool {
        use SessionStatus::*;

        match (self, next) {
            (_, Disconnected) => true,
            (Disconnected | Failed(_), Connecting) => true,
            (Connecting, Authenticating) => true,
            (Authenticating, Ready) => true,
            (Authenticating, Failed(_)) => true,
            (Authenticating | Ready, Connecting) => true,
            (Connecting, Failed(_)) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Ready => write!(f, "ready"),
            Self::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// Consolidated mutable state for RealtimeClient
/// Using a single struct reduces lock contention
pub struct ClientState {
    status: SessionStatus,

    /// User the current connection was opened for
    pub user_id: Option<String>,

    /// Bumped on every connect and teardown; events from older generations are dropped
    pub generation: u64,

    /// Outbound side of the active transport
    pub connection: Option<ConnectionManager>,

    /// Background task manager
    pub task_manager: TaskManager,

    status_tx: watch::Sender<SessionStatus>,
}

impl ClientState {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Disconnected);
        Self {
            status: SessionStatus::Disconnected,
            user_id: None,
            generation: 0,
            connection: None,
            task_manager: TaskManager::new(),
            status_tx,
        }
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Receiver notified on every status change
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Starts a new generation and returns it
    pub fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Moves to `next` if the edge is permitted. Refused edges are logged and ignored.
    pub fn transition(&mut self, next: SessionStatus) -> bool {
        if !self.status.can_transition_to(&next) {
            tracing::warn!("Refusing status change {} -> {}", self.status, next);
            return false;
        }
        if self.status != next {
            tracing::debug!("Status {} -> {}", self.status, next);
        }
        self.status = next.clone();
        self.status_tx.send_replace(next);
        true
    }

    /// Closes the active transport, forgets the user and ends the generation.
    ///
    /// Returns whether a transport was open.
    pub fn teardown(&mut self, next: SessionStatus) -> bool {
        let had_connection = match self.connection.take() {
            Some(connection) => {
                connection.close();
                true
            }
            None => false,
        };
        self.user_id = None;
        self.next_generation();
        if !self.transition(next) {
            self.transition(SessionStatus::Disconnected);
        }
        had_connection
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::new()
    }
}
