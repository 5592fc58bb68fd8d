//! Pipeline metrics
//!
//! Thin wrappers over the `metrics` facade plus an in-memory running
//! statistics helper used for end-of-run summaries.

use metrics::{counter, gauge, histogram};

/// Record a sample written to the cache
pub fn record_sample_produced(sequence: u64) {
    counter!("trajectory_pipeline_samples_produced_total").increment(1);
    gauge!("trajectory_pipeline_last_sequence").set(sequence as f64);
}

/// Record the outcome of one distribution tick
///
/// `outcome` is one of `forwarded`, `stale`, `no_data`, `no_audience`, `failed`.
pub fn record_forward_outcome(channel: &str, outcome: &'static str) {
    counter!(
        "trajectory_pipeline_distribution_ticks_total",
        "channel" => channel.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

/// Record the last sequence a channel forwarded
pub fn record_channel_cursor(channel: &str, sequence: u64) {
    gauge!(
        "trajectory_pipeline_channel_cursor",
        "channel" => channel.to_string()
    )
    .set(sequence as f64);
}

/// Record sample age (capture to handoff) in milliseconds
pub fn record_sample_age_ms(channel: &str, age_ms: f64) {
    histogram!(
        "trajectory_pipeline_sample_age_ms",
        "channel" => channel.to_string()
    )
    .record(age_ms);
}

/// Record a tick whose task returned an error
pub fn record_tick_failure(task: &str) {
    counter!(
        "trajectory_pipeline_tick_failures_total",
        "task" => task.to_string()
    )
    .increment(1);
}

/// Record a scheduler deadline resync
pub fn record_drift_resync(task: &str, lag_ms: f64) {
    counter!(
        "trajectory_pipeline_drift_resyncs_total",
        "task" => task.to_string()
    )
    .increment(1);
    histogram!(
        "trajectory_pipeline_drift_lag_ms",
        "task" => task.to_string()
    )
    .record(lag_ms);
}

/// Record the number of connected push clients
pub fn record_connected_clients(channel: &str, clients: usize) {
    gauge!(
        "trajectory_pipeline_connected_clients",
        "channel" => channel.to_string()
    )
    .set(clients as f64);
}

/// Record a datagram received from the bus
pub fn record_bus_received(valid: bool) {
    let status = if valid { "valid" } else { "invalid" };
    counter!(
        "trajectory_pipeline_bus_received_total",
        "status" => status
    )
    .increment(1);
}

/// Statistics summary
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// Add a value
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Summarize the current state
    pub fn summary(&self) -> StatsSummary {
        StatsSummary::from(self)
    }
}
