//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the pipeline.
//! Business crates depend on this crate only, never the other way round.
//!
//! ## Time Model
//! - `timestamp_ms` is wall-clock time (milliseconds since the Unix epoch)
//! - `sequence` is the ordering key; it starts at 1 and grows by exactly 1

mod blueprint;
mod bus;
mod error;
mod sample;
mod task;
mod transport;

pub use blueprint::*;
pub use bus::BusMessage;
pub use error::*;
pub use sample::{Coordinate, Sample};
pub use task::{LocalPeriodicTask, PeriodicTask};
pub use transport::{LocalTransportSink, TransportSink};
