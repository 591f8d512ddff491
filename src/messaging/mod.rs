// Messaging module - Event vocabulary, listener registry and routing
pub mod event;
pub mod registry;
pub mod router;

pub use event::RealtimeEvent;
pub use registry::{Listener, ListenerRegistry, listener};
pub use router::MessageRouter;
