//! Producer tick: generate one point and publish it to the cache.

use std::sync::Arc;

use contracts::{ContractError, PeriodicTask};
use shared_state::LatestValueCache;
use tracing::{debug, info};

use crate::TrajectoryGenerator;

/// Periodic task feeding the shared cache
#[derive(Debug)]
pub struct ProducerLoop {
    generator: TrajectoryGenerator,
    cache: Arc<LatestValueCache>,
    /// Emit an info log every `log_every` ticks
    log_every: u64,
    ticks: u64,
}

impl ProducerLoop {
    pub fn new(generator: TrajectoryGenerator, cache: Arc<LatestValueCache>, log_every: u64) -> Self {
        Self {
            generator,
            cache,
            log_every: log_every.max(1),
            ticks: 0,
        }
    }

    /// Ticks executed so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl PeriodicTask for ProducerLoop {
    fn name(&self) -> &str {
        "producer"
    }

    async fn on_tick(&mut self) -> Result<(), ContractError> {
        let coordinate = self.generator.next();
        let sample = self.cache.update(coordinate);
        self.ticks += 1;

        observability::record_sample_produced(sample.sequence);

        if self.ticks.is_multiple_of(self.log_every) {
            info!(
                sequence = sample.sequence,
                longitude = sample.longitude,
                latitude = sample.latitude,
                "Produced sample"
            );
        } else {
            debug!(sequence = sample.sequence, "Produced sample");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scheduler::{PeriodicScheduler, ShutdownSignal};
    use std::time::Duration;

    #[tokio::test]
    async fn test_each_tick_publishes_next_sequence() {
        let cache = Arc::new(LatestValueCache::new());
        let mut producer = ProducerLoop::new(TrajectoryGenerator::default(), cache.clone(), 100);

        assert!(!cache.has_data());
        for expected in 1..=5u64 {
            producer.on_tick().await.unwrap();
            assert_eq!(cache.latest_sequence(), expected);
        }
        assert_eq!(producer.ticks(), 5);

        let latest = cache.read().unwrap();
        let expected_lon = 107.02243 + 0.05 * 0.04_f64.sin();
        assert!((latest.longitude - expected_lon).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduled_producer_has_no_gaps() {
        let cache = Arc::new(LatestValueCache::new());
        let shutdown = ShutdownSignal::new();
        let mut producer = ProducerLoop::new(TrajectoryGenerator::default(), cache.clone(), 10);

        let stopper = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                // 50 Hz for one second of paused time
                tokio::time::sleep(Duration::from_millis(1010)).await;
                shutdown.trigger();
            })
        };

        let stats = PeriodicScheduler::from_rate_hz("producer", 50.0)
            .unwrap()
            .run(&mut producer, &shutdown)
            .await;
        stopper.await.unwrap();

        assert_eq!(stats.ticks, 50);
        assert_eq!(cache.latest_sequence(), 50);
        assert_eq!(producer.ticks(), 50);
    }
}
