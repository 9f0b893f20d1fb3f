//! API Module
//!
//! HTTP API for note generation, proof lookup and root synchronization.

pub mod handlers;
pub mod routes;
pub mod types;

pub use handlers::ApiState;
pub use routes::create_router;
