//! WebSocket push server
//!
//! Accepts browser/client connections and keeps them in a registry that a
//! [`WebSocketSink`](crate::WebSocketSink) broadcasts into.

mod registry;
mod server;

pub use registry::{BroadcastOutcome, ClientId, ConnectionRegistry, CLIENT_QUEUE_DEPTH};
pub use server::PushServer;
