//! Sample - LatestValueCache payload
//!
//! Immutable trajectory readings shared between the producer and every
//! distribution loop.

use serde::{Deserialize, Serialize};

/// A position reading that has not been sequenced yet.
///
/// Produced by the trajectory generator (or decoded from the bus) and turned
/// into a [`Sample`] by the cache, which owns sequence assignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Longitude in degrees
    pub longitude: f64,

    /// Latitude in degrees
    pub latitude: f64,

    /// Capture time, milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl Coordinate {
    pub fn new(longitude: f64, latitude: f64, timestamp_ms: i64) -> Self {
        Self {
            longitude,
            latitude,
            timestamp_ms,
        }
    }
}

/// One immutable trajectory reading.
///
/// Never mutated after creation; readers share it through `Arc<Sample>`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Longitude in degrees
    pub longitude: f64,

    /// Latitude in degrees
    pub latitude: f64,

    /// Capture time, milliseconds since the Unix epoch
    pub timestamp_ms: i64,

    /// Sequence number, strictly increasing from 1
    pub sequence: u64,
}

impl Sample {
    /// Attach a sequence number to a coordinate
    pub fn from_coordinate(coordinate: Coordinate, sequence: u64) -> Self {
        Self {
            longitude: coordinate.longitude,
            latitude: coordinate.latitude,
            timestamp_ms: coordinate.timestamp_ms,
            sequence,
        }
    }

    /// The coordinate part of the sample
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.longitude, self.latitude, self.timestamp_ms)
    }

    /// `"longitude,latitude,timestamp"` with 8 decimals, the bus text format
    pub fn to_csv(&self) -> String {
        format!(
            "{:.8},{:.8},{}",
            self.longitude, self.latitude, self.timestamp_ms
        )
    }
}
