//! LogSink - logs forwarded samples via tracing

use contracts::{ContractError, Sample, TransportSink};
use tracing::{info, instrument};

/// Transport that only logs each sample, for debugging
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TransportSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_audience(&self) -> bool {
        true
    }

    #[instrument(
        name = "log_sink_send",
        skip(self, sample),
        fields(channel = %self.name, sequence = sample.sequence)
    )]
    async fn send(&mut self, sample: &Sample) -> Result<(), ContractError> {
        info!(
            channel = %self.name,
            sequence = sample.sequence,
            longitude = sample.longitude,
            latitude = sample.latitude,
            timestamp_ms = sample.timestamp_ms,
            "Sample"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(channel = %self.name, "LogSink closed");
        Ok(())
    }
}
