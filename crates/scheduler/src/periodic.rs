//! Deadline-based periodic scheduler.

use std::time::Duration;

use contracts::PeriodicTask;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::{SchedulerError, ShutdownSignal};

/// Deadlines further than this many periods in the past trigger a resync
const DRIFT_LIMIT_PERIODS: u32 = 2;

/// Counters collected over one scheduler run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    /// Ticks executed (successful or not)
    pub ticks: u64,
    /// Ticks whose task returned an error
    pub failed_ticks: u64,
    /// Times the deadline was reset after falling too far behind
    pub resyncs: u64,
}

/// Pure deadline arithmetic, separated from the clock so it can be driven
/// with explicit instants.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleState {
    period: Duration,
    next_deadline: Instant,
}

impl ScheduleState {
    /// First deadline is one period after `start`
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            next_deadline: start + period,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.next_deadline
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Move to the next deadline after a tick finished at `now`.
    ///
    /// The deadline advances by exactly one period. If it is still more than
    /// two periods behind `now`, it is reset to `now + period` and the lag is
    /// returned.
    pub fn advance(&mut self, now: Instant) -> Option<Duration> {
        self.next_deadline += self.period;

        if self.next_deadline + self.period * DRIFT_LIMIT_PERIODS < now {
            let lag = now - self.next_deadline;
            self.next_deadline = now + self.period;
            return Some(lag);
        }
        None
    }
}

/// Repeating timer driving one [`PeriodicTask`].
#[derive(Debug)]
pub struct PeriodicScheduler {
    name: String,
    period: Duration,
}

impl PeriodicScheduler {
    pub fn new(name: impl Into<String>, period: Duration) -> Result<Self, SchedulerError> {
        let name = name.into();
        if period.is_zero() {
            return Err(SchedulerError::ZeroPeriod { name });
        }
        Ok(Self { name, period })
    }

    /// Build a scheduler ticking `rate_hz` times per second
    pub fn from_rate_hz(name: impl Into<String>, rate_hz: f64) -> Result<Self, SchedulerError> {
        let name = name.into();
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(SchedulerError::InvalidRate { name, rate_hz });
        }
        match Duration::try_from_secs_f64(1.0 / rate_hz) {
            Ok(period) => Self::new(name, period),
            Err(_) => Err(SchedulerError::InvalidRate { name, rate_hz }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tick `task` until `shutdown` fires.
    ///
    /// Each wait sleeps until an absolute deadline and races the shutdown
    /// signal, so a stop request wakes the loop without waiting out the
    /// period. Task errors are logged and counted; they never end the loop.
    pub async fn run<T: PeriodicTask>(
        self,
        task: &mut T,
        shutdown: &ShutdownSignal,
    ) -> ScheduleStats {
        let mut stats = ScheduleStats::default();
        let mut state = ScheduleState::new(self.period, Instant::now());

        info!(
            scheduler = %self.name,
            task = task.name(),
            period_us = self.period.as_micros() as u64,
            "Scheduler started"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                _ = sleep_until(state.deadline()) => {}
            }

            stats.ticks += 1;
            let result = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                result = task.on_tick() => result,
            };

            if let Err(e) = result {
                stats.failed_ticks += 1;
                observability::record_tick_failure(task.name());
                warn!(scheduler = %self.name, error = %e, "Tick failed");
            }

            if let Some(lag) = state.advance(Instant::now()) {
                stats.resyncs += 1;
                let lag_ms = lag.as_secs_f64() * 1000.0;
                observability::record_drift_resync(&self.name, lag_ms);
                warn!(
                    scheduler = %self.name,
                    lag_ms,
                    "Schedule fell behind, resetting deadline"
                );
            }
        }

        debug!(scheduler = %self.name, ?stats, "Scheduler loop exited");
        info!(scheduler = %self.name, ticks = stats.ticks, "Scheduler stopped");
        stats
    }
}
