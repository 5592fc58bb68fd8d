//! Pipeline statistics.

use std::time::Duration;

use contracts::Role;
use dispatcher::{DistributionReport, ListenerStats};
use scheduler::ScheduleStats;

/// What fed the cache during the run
#[derive(Debug, Clone)]
pub enum SourceStats {
    /// Local trajectory generator
    Producer {
        schedule: ScheduleStats,
        produced: u64,
    },
    /// Bus records received in subscriber mode
    Listener(ListenerStats),
}

/// One distribution loop's run
#[derive(Debug, Clone)]
pub struct ChannelStats {
    pub rate_hz: f64,
    pub schedule: ScheduleStats,
    pub report: DistributionReport,
}

/// Statistics from a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub role: Role,

    /// Total duration of the pipeline run
    pub duration: Duration,

    /// Sequence of the last sample in the cache
    pub latest_sequence: u64,

    pub source: SourceStats,

    pub channels: Vec<ChannelStats>,
}

impl PipelineStats {
    /// Samples written into the cache per second
    pub fn samples_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.latest_sequence as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Scheduler resyncs across every loop
    pub fn total_resyncs(&self) -> u64 {
        let source = match &self.source {
            SourceStats::Producer { schedule, .. } => schedule.resyncs,
            SourceStats::Listener(_) => 0,
        };
        source + self.channels.iter().map(|c| c.schedule.resyncs).sum::<u64>()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n================================================================");
        println!("                      Pipeline Statistics");
        println!("================================================================\n");

        println!("Overview");
        println!("   ├─ Role: {}", self.role);
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Latest sequence: {}", self.latest_sequence);
        println!("   ├─ Samples/s: {:.2}", self.samples_per_sec());
        println!("   └─ Scheduler resyncs: {}", self.total_resyncs());

        match &self.source {
            SourceStats::Producer { schedule, produced } => {
                println!("\nProducer");
                println!("   ├─ Samples produced: {}", produced);
                println!("   └─ Failed ticks: {}", schedule.failed_ticks);
            }
            SourceStats::Listener(stats) => {
                println!("\nBus listener");
                println!("   ├─ Datagrams received: {}", stats.received);
                println!("   ├─ Accepted: {}", stats.accepted);
                println!("   └─ Rejected: {}", stats.rejected);
            }
        }

        for channel in &self.channels {
            let counters = &channel.report.counters;
            println!("\nChannel '{}' ({:.1} Hz)", channel.report.channel, channel.rate_hz);
            println!("   ├─ Forwarded: {}", counters.forwarded);
            println!("   ├─ Stale: {}", counters.stale);
            println!("   ├─ No audience: {}", counters.no_audience);
            println!("   ├─ No data: {}", counters.no_data);
            println!("   ├─ Failed: {}", counters.failed);
            println!("   ├─ Last forwarded: {}", counters.last_forwarded);
            println!("   └─ Sample age (ms): {}", channel.report.sample_age_ms);
        }

        println!();
    }
}
