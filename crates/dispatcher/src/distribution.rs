//! DistributionLoop - forwards the newest cached sample to one transport

use std::sync::Arc;

use chrono::Utc;
use contracts::{ContractError, ForwardPolicy, PeriodicTask, TransportSink};
use observability::{RunningStats, StatsSummary};
use shared_state::LatestValueCache;
use tracing::{debug, info, instrument, warn};

use crate::metrics::{DistributionMetrics, DistributionSnapshot};

/// Log progress every N successful forwards
const PROGRESS_LOG_INTERVAL: u64 = 50;

/// What one distribution tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Cache is still empty
    NoData,
    /// Cached sample is not newer than the cursor
    Stale,
    /// Transport has nobody listening
    NoAudience,
    /// Sample with this sequence was handed off
    Forwarded(u64),
}

impl TickOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoData => "no_data",
            Self::Stale => "stale",
            Self::NoAudience => "no_audience",
            Self::Forwarded(_) => "forwarded",
        }
    }
}

/// Final state of a distribution loop
#[derive(Debug, Clone)]
pub struct DistributionReport {
    pub channel: String,
    pub counters: DistributionSnapshot,
    /// Age of forwarded samples at handoff time (ms)
    pub sample_age_ms: StatsSummary,
}

/// Periodic consumer of the shared cache.
///
/// Keeps a cursor (last forwarded sequence, starting at 0) and forwards a
/// sample only when its sequence is strictly greater. The cursor advances
/// only after the transport accepted the sample, so a failed handoff is
/// retried on the next tick with whatever is current then.
pub struct DistributionLoop<S> {
    name: String,
    cache: Arc<LatestValueCache>,
    sink: S,
    policy: ForwardPolicy,
    cursor: u64,
    metrics: Arc<DistributionMetrics>,
    sample_age: RunningStats,
}

impl<S: TransportSink> DistributionLoop<S> {
    pub fn new(
        name: impl Into<String>,
        cache: Arc<LatestValueCache>,
        sink: S,
        policy: ForwardPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            cache,
            sink,
            policy,
            cursor: 0,
            metrics: Arc::new(DistributionMetrics::new()),
            sample_age: RunningStats::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last forwarded sequence (0 before the first forward)
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn policy(&self) -> ForwardPolicy {
        self.policy
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn metrics(&self) -> Arc<DistributionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run one distribution step
    ///
    /// # Errors
    /// Returns the transport error when the handoff failed; the cursor is
    /// left unchanged in that case.
    pub async fn tick_once(&mut self) -> Result<TickOutcome, ContractError> {
        let Some(sample) = self.cache.read() else {
            return Ok(self.finish_tick(TickOutcome::NoData));
        };

        if sample.sequence <= self.cursor {
            return Ok(self.finish_tick(TickOutcome::Stale));
        }

        if self.policy == ForwardPolicy::RequireAudience && !self.sink.has_audience() {
            return Ok(self.finish_tick(TickOutcome::NoAudience));
        }

        if let Err(e) = self.sink.send(&sample).await {
            self.metrics.inc_failed();
            observability::record_forward_outcome(&self.name, "failed");
            return Err(e);
        }

        self.cursor = sample.sequence;
        observability::record_channel_cursor(&self.name, self.cursor);

        // timestamps may come off the wire unchecked
        let age_ms = Utc::now().timestamp_millis().saturating_sub(sample.timestamp_ms) as f64;
        self.sample_age.push(age_ms);
        observability::record_sample_age_ms(&self.name, age_ms);

        let outcome = self.finish_tick(TickOutcome::Forwarded(sample.sequence));

        let forwarded = self.metrics.forwarded();
        if forwarded.is_multiple_of(PROGRESS_LOG_INTERVAL) {
            info!(
                channel = %self.name,
                forwarded,
                sequence = sample.sequence,
                longitude = sample.longitude,
                latitude = sample.latitude,
                "Distribution progress"
            );
        } else {
            debug!(channel = %self.name, sequence = sample.sequence, "Sample forwarded");
        }

        Ok(outcome)
    }

    fn finish_tick(&self, outcome: TickOutcome) -> TickOutcome {
        self.metrics.record(outcome);
        observability::record_forward_outcome(&self.name, outcome.as_str());
        outcome
    }

    /// Close the transport and report
    #[instrument(name = "distribution_loop_finish", skip(self), fields(channel = %self.name))]
    pub async fn finish(mut self) -> DistributionReport {
        if let Err(e) = self.sink.close().await {
            warn!(channel = %self.name, error = %e, "Failed to close transport");
        }

        let report = DistributionReport {
            channel: self.name,
            counters: self.metrics.snapshot(),
            sample_age_ms: self.sample_age.summary(),
        };
        debug!(counters = ?report.counters, "Distribution loop finished");
        report
    }
}

impl<S: TransportSink> PeriodicTask for DistributionLoop<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_tick(&mut self) -> Result<(), ContractError> {
        self.tick_once().await.map(|_| ())
    }
}
