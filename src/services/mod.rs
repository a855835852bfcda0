//! Service layer modules for external integrations.
//!
//! Contains the marketplace REST client, typed per-entity services, the
//! Redis session storage adapter and the realtime notification hub.

pub mod api_client;
pub mod backend;
pub mod cache;
pub mod realtime;
pub mod resources;

pub use api_client::ApiClient;
pub use backend::RestBackend;
pub use cache::RedisStorage;
pub use realtime::{NotificationChannel, SocketEvent, SocketHub};
pub use resources::ResourceService;
