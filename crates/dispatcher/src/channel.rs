//! Channel factory - builds a distribution loop per configured channel

use std::sync::Arc;

use contracts::{ChannelConfig, ChannelKind, ContractError, Sample, TransportSink};
use scheduler::ShutdownSignal;
use shared_state::LatestValueCache;
use tracing::{info, instrument};

use crate::distribution::DistributionLoop;
use crate::error::DispatcherError;
use crate::sinks::{BusSink, LogSink, WebSocketSink};

/// Any configured transport
pub enum ChannelSink {
    Bus(BusSink),
    WebSocket(WebSocketSink),
    Log(LogSink),
}

impl TransportSink for ChannelSink {
    fn name(&self) -> &str {
        match self {
            Self::Bus(sink) => sink.name(),
            Self::WebSocket(sink) => sink.name(),
            Self::Log(sink) => sink.name(),
        }
    }

    fn has_audience(&self) -> bool {
        match self {
            Self::Bus(sink) => sink.has_audience(),
            Self::WebSocket(sink) => sink.has_audience(),
            Self::Log(sink) => sink.has_audience(),
        }
    }

    async fn send(&mut self, sample: &Sample) -> Result<(), ContractError> {
        match self {
            Self::Bus(sink) => sink.send(sample).await,
            Self::WebSocket(sink) => sink.send(sample).await,
            Self::Log(sink) => sink.send(sample).await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Bus(sink) => sink.close().await,
            Self::WebSocket(sink) => sink.close().await,
            Self::Log(sink) => sink.close().await,
        }
    }
}

/// Construct the transport for `config` and wrap it in a distribution loop.
///
/// # Errors
/// Any transport construction failure (bad params, bind failure).
#[instrument(
    name = "dispatcher_create_channel",
    skip(config, cache, shutdown),
    fields(channel = %config.name, kind = ?config.kind)
)]
pub async fn create_channel(
    config: &ChannelConfig,
    cache: Arc<LatestValueCache>,
    shutdown: &ShutdownSignal,
) -> Result<DistributionLoop<ChannelSink>, DispatcherError> {
    let sink = match config.kind {
        ChannelKind::Log => ChannelSink::Log(LogSink::new(&config.name)),
        ChannelKind::Bus => {
            let sink = BusSink::from_params(&config.name, &config.params)
                .await
                .map_err(|e| DispatcherError::sink_creation(&config.name, e.to_string()))?;
            ChannelSink::Bus(sink)
        }
        ChannelKind::Websocket => {
            let sink = WebSocketSink::from_params(&config.name, &config.params, shutdown).await?;
            ChannelSink::WebSocket(sink)
        }
    };

    let policy = config.effective_policy();
    info!(channel = %config.name, rate_hz = config.rate_hz, ?policy, "Channel ready");

    Ok(DistributionLoop::new(&config.name, cache, sink, policy))
}
