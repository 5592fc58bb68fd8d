//! BusSink - publishes samples as bus records over UDP

use std::collections::HashMap;
use std::net::SocketAddr;

use contracts::{BusMessage, ContractError, Sample, TransportSink, WireFormat};
use tokio::net::UdpSocket;
use tracing::{debug, instrument, warn};

use crate::codec;

/// Largest payload sent in one datagram
const DEFAULT_MAX_PACKET_SIZE: usize = 65000;

/// Configuration for BusSink
#[derive(Debug, Clone)]
pub struct BusSinkConfig {
    /// Target address
    pub addr: SocketAddr,
    /// Serialization format
    pub format: WireFormat,
    /// Max packet size (UDP typically 65507 for IPv4)
    pub max_packet_size: usize,
}

impl BusSinkConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            format: WireFormat::default(),
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }

    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let addr_str = params
            .get("addr")
            .ok_or_else(|| "missing 'addr' parameter".to_string())?;

        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|e| format!("invalid address '{}': {}", addr_str, e))?;

        let format = match params.get("format") {
            Some(value) => WireFormat::from_param(value)
                .ok_or_else(|| format!("unknown format '{}'", value))?,
            None => WireFormat::default(),
        };

        let max_packet_size = params
            .get("max_packet_size")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_PACKET_SIZE);

        Ok(Self {
            addr,
            format,
            max_packet_size,
        })
    }
}

/// Fire-and-forget bus publisher.
///
/// The socket is left unconnected so an absent receiver does not surface
/// as ICMP-driven send errors.
pub struct BusSink {
    name: String,
    config: BusSinkConfig,
    socket: Option<UdpSocket>,
}

impl BusSink {
    /// Create a new BusSink
    #[instrument(name = "bus_sink_new", skip(name, config))]
    pub async fn new(name: impl Into<String>, config: BusSinkConfig) -> std::io::Result<Self> {
        let name = name.into();
        let bind_addr: SocketAddr = if config.addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr).await?;

        debug!(
            channel = %name,
            target = %config.addr,
            format = ?config.format,
            "BusSink ready"
        );

        Ok(Self {
            name,
            config,
            socket: Some(socket),
        })
    }

    /// Create from params (for factory)
    #[instrument(name = "bus_sink_from_params", skip(name, params))]
    pub async fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, ContractError> {
        let name = name.into();
        let config = BusSinkConfig::from_params(params)
            .map_err(|e| ContractError::transport_setup(&name, e))?;

        Self::new(name.clone(), config)
            .await
            .map_err(|e| ContractError::transport_setup(&name, e.to_string()))
    }

    pub fn target(&self) -> SocketAddr {
        self.config.addr
    }

    fn prepare_payload(&self, sample: &Sample) -> Result<Vec<u8>, ContractError> {
        let message = BusMessage::from_sample(sample);
        let data = codec::encode(&message, self.config.format)?;

        if data.len() > self.config.max_packet_size {
            warn!(
                channel = %self.name,
                size = data.len(),
                max = self.config.max_packet_size,
                "Bus record exceeds max packet size"
            );
            return Err(ContractError::transport_send(
                &self.name,
                format!("record of {} bytes exceeds max packet size", data.len()),
            ));
        }

        Ok(data)
    }
}

impl TransportSink for BusSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_audience(&self) -> bool {
        true
    }

    #[instrument(
        name = "bus_sink_send",
        skip(self, sample),
        fields(channel = %self.name, sequence = sample.sequence)
    )]
    async fn send(&mut self, sample: &Sample) -> Result<(), ContractError> {
        let data = self.prepare_payload(sample)?;
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| ContractError::transport_send(&self.name, "socket closed"))?;

        let sent = socket
            .send_to(&data, self.config.addr)
            .await
            .map_err(|e| ContractError::transport_send(&self.name, e.to_string()))?;

        debug!(channel = %self.name, sequence = sample.sequence, bytes = sent, "Published");
        Ok(())
    }

    #[instrument(name = "bus_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        self.socket = None;
        debug!(channel = %self.name, "BusSink closed");
        Ok(())
    }
}
