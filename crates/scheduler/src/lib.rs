//! # Scheduler
//!
//! Deadline-based repeating timer shared by the producer and every
//! distribution loop.
//!
//! Responsibilities:
//! - Tick a [`PeriodicTask`](contracts::PeriodicTask) at a fixed rate
//! - Advance deadlines by exactly one period (no cumulative drift)
//! - Resynchronize after severe drift instead of firing a catch-up burst
//! - Wake immediately on the shared [`ShutdownSignal`]
//!
//! ## Example
//!
//! ```ignore
//! use scheduler::{PeriodicScheduler, ShutdownSignal};
//!
//! let shutdown = ShutdownSignal::new();
//! let scheduler = PeriodicScheduler::from_rate_hz("producer", 50.0)?;
//! let stats = scheduler.run(&mut producer_loop, &shutdown).await;
//! ```

mod error;
mod periodic;
mod shutdown;

pub use error::SchedulerError;
pub use periodic::{PeriodicScheduler, ScheduleState, ScheduleStats};
pub use shutdown::ShutdownSignal;
