//! # Producer
//!
//! Synthetic position source.
//!
//! Responsibilities:
//! - Generate a figure-eight trajectory around a configured centre
//! - Publish each point into the shared [`LatestValueCache`](shared_state::LatestValueCache)
//!   once per producer tick
//!
//! ## Example
//!
//! ```ignore
//! use producer::{ProducerLoop, TrajectoryGenerator};
//!
//! let generator = TrajectoryGenerator::new(&blueprint.trajectory);
//! let mut producer = ProducerLoop::new(generator, cache.clone(), 100);
//! scheduler.run(&mut producer, &shutdown).await;
//! ```

mod generator;
mod producer_loop;

pub use generator::TrajectoryGenerator;
pub use producer_loop::ProducerLoop;
