//! WebSocketSink - pushes samples to every connected WebSocket client

use std::collections::HashMap;
use std::net::SocketAddr;

use contracts::{ContractError, Sample, TransportSink};
use scheduler::ShutdownSignal;
use serde::Serialize;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, instrument};

use crate::push::PushServer;
use crate::DispatcherError;

/// Text frame pushed to clients: `{"coords":[lon,lat],"time":ts}`
#[derive(Debug, Serialize)]
struct PushPayload {
    coords: [f64; 2],
    time: i64,
}

impl From<&Sample> for PushPayload {
    fn from(sample: &Sample) -> Self {
        Self {
            coords: [sample.longitude, sample.latitude],
            time: sample.timestamp_ms,
        }
    }
}

/// Broadcast transport backed by its own [`PushServer`]
pub struct WebSocketSink {
    name: String,
    server: PushServer,
}

impl WebSocketSink {
    /// Start a push server on `addr`
    pub async fn bind(
        name: impl Into<String>,
        addr: SocketAddr,
        shutdown: &ShutdownSignal,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let server = PushServer::start(&name, addr, shutdown).await?;
        Ok(Self { name, server })
    }

    /// Create from params (for factory); requires `bind`
    #[instrument(name = "websocket_sink_from_params", skip(name, params, shutdown))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
        shutdown: &ShutdownSignal,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let bind = params
            .get("bind")
            .ok_or_else(|| DispatcherError::sink_creation(&name, "missing 'bind' parameter"))?;
        let addr: SocketAddr = bind.parse().map_err(|e| {
            DispatcherError::sink_creation(&name, format!("invalid address '{}': {}", bind, e))
        })?;

        Self::bind(name, addr, shutdown).await
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    pub fn client_count(&self) -> usize {
        self.server.client_count()
    }

    fn encode(&self, sample: &Sample) -> Result<String, ContractError> {
        serde_json::to_string(&PushPayload::from(sample))
            .map_err(|e| ContractError::codec(format!("json error: {e}")))
    }
}

impl TransportSink for WebSocketSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_audience(&self) -> bool {
        !self.server.registry().is_empty()
    }

    async fn send(&mut self, sample: &Sample) -> Result<(), ContractError> {
        let payload = self.encode(sample)?;
        let outcome = self.server.registry().broadcast(&Message::Text(payload));

        // every client left after the audience check
        if outcome.audience() == 0 {
            return Err(ContractError::transport_send(&self.name, "no connected clients"));
        }

        debug!(
            channel = %self.name,
            sequence = sample.sequence,
            queued = outcome.queued,
            dropped = outcome.dropped,
            "Broadcast"
        );
        Ok(())
    }

    #[instrument(name = "websocket_sink_close", skip(self), fields(channel = %self.name))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.server.stop().await;
        Ok(())
    }
}
