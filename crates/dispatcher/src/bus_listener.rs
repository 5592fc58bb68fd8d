//! BusListener - subscriber-side receiver feeding the cache

use std::net::SocketAddr;
use std::sync::Arc;

use contracts::{ContractError, Sample, WireFormat};
use scheduler::ShutdownSignal;
use shared_state::LatestValueCache;
use tokio::net::UdpSocket;
use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::DispatcherError;

/// Receive buffer size; larger datagrams are truncated and rejected
const RECV_BUFFER_SIZE: usize = 65536;

/// Counters collected by a listener run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub received: u64,
    pub accepted: u64,
    pub rejected: u64,
}

/// Receives bus records and writes their coordinates into the cache.
///
/// The bus `count` is not reused: the cache assigns its own sequence so the
/// local gap-free numbering holds even when datagrams are lost.
pub struct BusListener {
    socket: UdpSocket,
    format: WireFormat,
    cache: Arc<LatestValueCache>,
    stats: ListenerStats,
}

impl BusListener {
    #[instrument(name = "bus_listener_bind", skip(cache))]
    pub async fn bind(
        addr: SocketAddr,
        format: WireFormat,
        cache: Arc<LatestValueCache>,
    ) -> Result<Self, DispatcherError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|source| DispatcherError::Bind { addr, source })?;

        info!(addr = %socket.local_addr()?, ?format, "Bus listener bound");

        Ok(Self {
            socket,
            format,
            cache,
            stats: ListenerStats::default(),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn stats(&self) -> ListenerStats {
        self.stats
    }

    /// Decode one datagram and publish its coordinate
    ///
    /// # Errors
    /// Returns a codec error for undecodable records or malformed text.
    pub fn handle_datagram(&mut self, bytes: &[u8]) -> Result<Arc<Sample>, ContractError> {
        self.stats.received += 1;

        let parsed = codec::decode(bytes, self.format).and_then(|message| message.coordinate());
        observability::record_bus_received(parsed.is_ok());

        match parsed {
            Ok(coordinate) => {
                self.stats.accepted += 1;
                Ok(self.cache.update(coordinate))
            }
            Err(e) => {
                self.stats.rejected += 1;
                Err(e)
            }
        }
    }

    /// Receive until `shutdown` fires
    pub async fn run(mut self, shutdown: &ShutdownSignal) -> ListenerStats {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                received = self.socket.recv_from(&mut buf) => received,
            };

            match received {
                Ok((len, peer)) => match self.handle_datagram(&buf[..len]) {
                    Ok(sample) => {
                        debug!(%peer, sequence = sample.sequence, "Bus record received");
                    }
                    Err(e) => {
                        warn!(%peer, error = %e, "Dropping malformed bus record");
                    }
                },
                Err(e) => {
                    warn!(error = %e, "Bus receive failed");
                }
            }
        }

        info!(
            received = self.stats.received,
            accepted = self.stats.accepted,
            rejected = self.stats.rejected,
            "Bus listener stopped"
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BusMessage, Coordinate};
    use std::time::Duration;

    async fn listener(format: WireFormat) -> (BusListener, Arc<LatestValueCache>) {
        let cache = Arc::new(LatestValueCache::new());
        let listener = BusListener::bind("127.0.0.1:0".parse().unwrap(), format, cache.clone())
            .await
            .unwrap();
        (listener, cache)
    }

    fn record(count: u64) -> BusMessage {
        let sample = Sample::from_coordinate(Coordinate::new(107.1, 20.8, 1234), count);
        BusMessage::from_sample(&sample)
    }

    #[tokio::test]
    async fn test_handle_valid_datagram() {
        let (mut listener, cache) = listener(WireFormat::Json).await;
        let bytes = codec::encode(&record(99), WireFormat::Json).unwrap();

        let sample = listener.handle_datagram(&bytes).unwrap();
        // local numbering, not the bus counter
        assert_eq!(sample.sequence, 1);
        assert!((sample.longitude - 107.1).abs() < 1e-9);
        assert_eq!(sample.timestamp_ms, 1234);
        assert_eq!(cache.latest_sequence(), 1);
    }

    #[tokio::test]
    async fn test_malformed_datagrams_are_rejected() {
        let (mut listener, cache) = listener(WireFormat::Json).await;

        assert!(listener.handle_datagram(b"garbage").is_err());

        let mut bad_text = record(1);
        bad_text.text = "1.0,abc,5".to_string();
        let bytes = codec::encode(&bad_text, WireFormat::Json).unwrap();
        assert!(listener.handle_datagram(&bytes).is_err());

        assert!(!cache.has_data());
        assert_eq!(
            listener.stats(),
            ListenerStats {
                received: 2,
                accepted: 0,
                rejected: 2
            }
        );
    }

    #[tokio::test]
    async fn test_run_receives_until_shutdown() {
        let (listener, cache) = listener(WireFormat::Bincode).await;
        let addr = listener.local_addr().unwrap();
        let shutdown = ShutdownSignal::new();

        let handle = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { listener.run(&shutdown).await })
        };

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        for count in 1..=3 {
            let bytes = codec::encode(&record(count), WireFormat::Bincode).unwrap();
            sender.send_to(&bytes, addr).await.unwrap();
        }

        tokio::time::timeout(Duration::from_secs(2), async {
            while cache.latest_sequence() < 3 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("datagrams not received");

        shutdown.trigger();
        let stats = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("listener did not stop")
            .unwrap();
        assert_eq!(stats.accepted, 3);
    }
}
