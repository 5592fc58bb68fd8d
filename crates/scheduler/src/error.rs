//! Scheduler error types

use thiserror::Error;

/// Scheduler construction errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Rate is zero, negative or not finite
    #[error("scheduler '{name}': rate must be finite and > 0, got {rate_hz}")]
    InvalidRate { name: String, rate_hz: f64 },

    /// Period is zero
    #[error("scheduler '{name}': period must be non-zero")]
    ZeroPeriod { name: String },
}
