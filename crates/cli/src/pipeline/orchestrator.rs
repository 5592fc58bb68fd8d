//! Pipeline orchestrator - starts, stops and joins every loop.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{PipelineBlueprint, Role};
use dispatcher::{
    create_channel, BusListener, DistributionMetrics, DistributionReport, DistributionSnapshot,
};
use producer::{ProducerLoop, TrajectoryGenerator};
use scheduler::{PeriodicScheduler, ScheduleStats, ShutdownSignal};
use shared_state::LatestValueCache;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use super::{ChannelStats, PipelineStats, SourceStats};
use crate::error::CliError;

/// A running distribution loop
struct ChannelTask {
    name: String,
    rate_hz: f64,
    metrics: Arc<DistributionMetrics>,
    handle: JoinHandle<(ScheduleStats, DistributionReport)>,
}

/// Running pipeline: one source task plus one task per channel, all
/// sharing one cache and one shutdown signal.
pub struct Pipeline {
    role: Role,
    cache: Arc<LatestValueCache>,
    shutdown: ShutdownSignal,
    source: JoinHandle<SourceStats>,
    channels: Vec<ChannelTask>,
    listener_addr: Option<SocketAddr>,
    started_at: Instant,
}

impl Pipeline {
    /// Build every transport, then spawn the source and channel loops.
    ///
    /// Transports are constructed before any task is spawned, so a
    /// construction failure leaves nothing running.
    #[instrument(name = "pipeline_start", skip(blueprint), fields(role = %blueprint.role))]
    pub async fn start(blueprint: &PipelineBlueprint) -> Result<Self> {
        let shutdown = ShutdownSignal::new();
        let cache = Arc::new(LatestValueCache::new());

        let mut loops = Vec::new();
        for config in blueprint.effective_channels() {
            let scheduler = PeriodicScheduler::from_rate_hz(&config.name, config.rate_hz)?;
            let dl = create_channel(&config, Arc::clone(&cache), &shutdown)
                .await
                .with_context(|| format!("Failed to start channel '{}'", config.name))?;
            loops.push((config.rate_hz, scheduler, dl));
        }

        let (source, listener_addr) = match blueprint.role {
            Role::Publisher => {
                let scheduler =
                    PeriodicScheduler::from_rate_hz("producer", blueprint.producer.rate_hz)?;
                let mut producer = ProducerLoop::new(
                    TrajectoryGenerator::new(&blueprint.trajectory),
                    Arc::clone(&cache),
                    blueprint.producer.log_every,
                );
                let shutdown = shutdown.clone();
                let handle = tokio::spawn(async move {
                    let schedule = scheduler.run(&mut producer, &shutdown).await;
                    SourceStats::Producer {
                        schedule,
                        produced: producer.ticks(),
                    }
                });
                (handle, None)
            }
            Role::Subscriber => {
                let addr: SocketAddr = blueprint
                    .subscriber
                    .listen_addr
                    .parse()
                    .with_context(|| {
                        format!("Invalid listen address '{}'", blueprint.subscriber.listen_addr)
                    })?;
                let listener = BusListener::bind(addr, blueprint.subscriber.format, Arc::clone(&cache))
                    .await
                    .context("Failed to start bus listener")?;
                let local_addr = listener.local_addr()?;
                let shutdown = shutdown.clone();
                let handle = tokio::spawn(async move {
                    SourceStats::Listener(listener.run(&shutdown).await)
                });
                (handle, Some(local_addr))
            }
        };

        let mut channels = Vec::with_capacity(loops.len());
        for (rate_hz, scheduler, mut dl) in loops {
            let name = dl.name().to_string();
            let metrics = dl.metrics();
            let shutdown = shutdown.clone();
            let handle = tokio::spawn(async move {
                let schedule = scheduler.run(&mut dl, &shutdown).await;
                let report = dl.finish().await;
                (schedule, report)
            });
            channels.push(ChannelTask {
                name,
                rate_hz,
                metrics,
                handle,
            });
        }

        info!(
            role = %blueprint.role,
            channels = channels.len(),
            "Pipeline started"
        );

        Ok(Self {
            role: blueprint.role,
            cache,
            shutdown,
            source,
            channels,
            listener_addr,
            started_at: Instant::now(),
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn cache(&self) -> &Arc<LatestValueCache> {
        &self.cache
    }

    /// Handle for signal tasks; triggering it stops the pipeline
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Bound bus listener address (subscriber role only)
    pub fn listener_addr(&self) -> Option<SocketAddr> {
        self.listener_addr
    }

    /// Live per-channel counters
    pub fn snapshot(&self) -> Vec<(String, DistributionSnapshot)> {
        self.channels
            .iter()
            .map(|c| (c.name.clone(), c.metrics.snapshot()))
            .collect()
    }

    /// Request shutdown. Returns `true` only for the first call.
    pub fn stop(&self) -> bool {
        let first = self.shutdown.trigger();
        if first {
            info!("Pipeline stop requested");
        }
        first
    }

    /// Wait for every loop to exit and collect statistics.
    ///
    /// Does not request shutdown by itself.
    #[instrument(name = "pipeline_join", skip(self))]
    pub async fn join(self) -> Result<PipelineStats> {
        let source = self
            .source
            .await
            .map_err(|e| CliError::pipeline_execution(format!("source task failed: {e}")))?;

        let mut channels = Vec::with_capacity(self.channels.len());
        for task in self.channels {
            let (schedule, report) = task.handle.await.map_err(|e| {
                CliError::pipeline_execution(format!("channel '{}' task failed: {e}", task.name))
            })?;
            channels.push(ChannelStats {
                rate_hz: task.rate_hz,
                schedule,
                report,
            });
        }

        let stats = PipelineStats {
            role: self.role,
            duration: self.started_at.elapsed(),
            latest_sequence: self.cache.latest_sequence(),
            source,
            channels,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            latest_sequence = stats.latest_sequence,
            "Pipeline shutdown complete"
        );
        Ok(stats)
    }
}
