//! # Shared State
//!
//! Single-slot "latest value" store shared by the producer and every
//! distribution loop.
//!
//! Responsibilities:
//! - Assign gap-free sequence numbers
//! - Swap the current `Arc<Sample>` under a short critical section
//! - Hand out whole samples only (never a torn read)

mod cache;

pub use cache::LatestValueCache;
pub use contracts::{Coordinate, Sample};
