// Infrastructure module - Core background services and utilities
pub mod http;
pub mod task_manager;
pub mod timer;

pub use http::{ApiClient, socket_endpoint_from_api};
pub use task_manager::TaskManager;
pub use timer::{ReconnectPolicy, Timer};
