//! Realtime event routing over WebSocket connections.

pub mod hub;
pub mod router;

pub use hub::Hub;
