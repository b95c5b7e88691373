//! Runtime adapters: HTTP and websocket surfaces, identity checks and task spawning.

pub mod api;
pub mod auth;
pub mod socket;
pub mod tokio_spawner;

pub use api::{router, ApiError, AppState, Health};
pub use auth::{AuthError, JwtVerifier};
pub use socket::{ClientMessage, ServerMessage, SessionHandler};
pub use tokio_spawner::TokioSpawner;
