//! Transport implementations
//!
//! Contains BusSink, WebSocketSink, and LogSink.

mod bus;
mod log;
mod websocket;

pub use self::bus::{BusSink, BusSinkConfig};
pub use self::log::LogSink;
pub use self::websocket::WebSocketSink;
