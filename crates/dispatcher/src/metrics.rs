//! Per-channel distribution counters

use std::sync::atomic::{AtomicU64, Ordering};

use crate::TickOutcome;

/// Counters for a single distribution loop.
///
/// Shared as `Arc<DistributionMetrics>` so the orchestrator can read them
/// while the loop is running.
#[derive(Debug, Default)]
pub struct DistributionMetrics {
    /// Ticks that found an empty cache
    no_data: AtomicU64,
    /// Ticks whose sample was already forwarded
    stale: AtomicU64,
    /// Ticks skipped because nobody was listening
    no_audience: AtomicU64,
    /// Successful handoffs
    forwarded: AtomicU64,
    /// Failed handoffs
    failed: AtomicU64,
    /// Cursor after the last successful handoff
    last_forwarded: AtomicU64,
}

impl DistributionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one tick outcome
    pub fn record(&self, outcome: TickOutcome) {
        match outcome {
            TickOutcome::NoData => self.no_data.fetch_add(1, Ordering::Relaxed),
            TickOutcome::Stale => self.stale.fetch_add(1, Ordering::Relaxed),
            TickOutcome::NoAudience => self.no_audience.fetch_add(1, Ordering::Relaxed),
            TickOutcome::Forwarded(sequence) => {
                self.last_forwarded.store(sequence, Ordering::Relaxed);
                self.forwarded.fetch_add(1, Ordering::Relaxed)
            }
        };
    }

    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> DistributionSnapshot {
        DistributionSnapshot {
            no_data: self.no_data.load(Ordering::Relaxed),
            stale: self.stale.load(Ordering::Relaxed),
            no_audience: self.no_audience.load(Ordering::Relaxed),
            forwarded: self.forwarded(),
            failed: self.failed(),
            last_forwarded: self.last_forwarded.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of distribution counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DistributionSnapshot {
    pub no_data: u64,
    pub stale: u64,
    pub no_audience: u64,
    pub forwarded: u64,
    pub failed: u64,
    pub last_forwarded: u64,
}

impl DistributionSnapshot {
    /// Ticks observed, failures included
    pub fn ticks(&self) -> u64 {
        self.no_data + self.stale + self.no_audience + self.forwarded + self.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_outcomes() {
        let metrics = DistributionMetrics::new();
        metrics.record(TickOutcome::NoData);
        metrics.record(TickOutcome::Forwarded(3));
        metrics.record(TickOutcome::Stale);
        metrics.record(TickOutcome::Forwarded(7));
        metrics.record(TickOutcome::NoAudience);
        metrics.inc_failed();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.no_data, 1);
        assert_eq!(snapshot.stale, 1);
        assert_eq!(snapshot.no_audience, 1);
        assert_eq!(snapshot.forwarded, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.last_forwarded, 7);
        assert_eq!(snapshot.ticks(), 6);
    }
}
