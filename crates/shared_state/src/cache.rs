//! LatestValueCache - most-recent sample store

use std::sync::Arc;

use contracts::{Coordinate, Sample};
use parking_lot::RwLock;

/// Thread-safe single-slot cache of the most recent [`Sample`].
///
/// One writer, any number of readers. Samples are immutable; an update
/// allocates a new `Arc<Sample>` and swaps the slot, so a reader holding the
/// previous value keeps a consistent copy while the writer moves on.
#[derive(Debug, Default)]
pub struct LatestValueCache {
    slot: RwLock<Option<Arc<Sample>>>,
}

impl LatestValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new coordinate under the next sequence number.
    ///
    /// Sequence is previous + 1, or 1 for the first update. Callers must
    /// serialize updates (single producer).
    pub fn update(&self, coordinate: Coordinate) -> Arc<Sample> {
        let sequence = self.latest_sequence() + 1;
        let sample = Arc::new(Sample::from_coordinate(coordinate, sequence));

        let previous = {
            let mut slot = self.slot.write();
            slot.replace(Arc::clone(&sample))
        };
        // last reference to the old sample is released outside the lock
        drop(previous);

        sample
    }

    /// Current sample, or `None` before the first update
    pub fn read(&self) -> Option<Arc<Sample>> {
        self.slot.read().clone()
    }

    /// True once at least one update has happened
    pub fn has_data(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Sequence of the current sample, 0 when empty
    pub fn latest_sequence(&self) -> u64 {
        self.slot.read().as_ref().map_or(0, |sample| sample.sequence)
    }
}
