//! # Dispatcher
//!
//! Distribution side of the pipeline.
//!
//! Responsibilities:
//! - Read the latest sample from the shared cache once per channel tick
//! - Forward only samples newer than the channel's cursor
//! - Hand samples to a transport (bus datagram, WebSocket push, log)
//! - Isolate channels: a slow or failing transport never blocks another
//! - Feed bus datagrams back into the cache in subscriber mode

pub mod bus_listener;
pub mod channel;
pub mod codec;
pub mod distribution;
pub mod error;
pub mod metrics;
pub mod push;
pub mod sinks;

pub use bus_listener::{BusListener, ListenerStats};
pub use channel::{create_channel, ChannelSink};
pub use contracts::{Sample, TransportSink};
pub use distribution::{DistributionLoop, DistributionReport, TickOutcome};
pub use error::DispatcherError;
pub use crate::metrics::{DistributionMetrics, DistributionSnapshot};
pub use push::{ConnectionRegistry, PushServer};
pub use sinks::{BusSink, LogSink, WebSocketSink};
