//! TransportSink trait - DistributionLoop output interface
//!
//! Defines the abstract interface for outbound channels.

use crate::{ContractError, Sample};

/// Outbound transport adapter
///
/// All channel implementations must implement this trait.
#[trait_variant::make(TransportSink: Send)]
pub trait LocalTransportSink {
    /// Channel name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Whether anyone is currently listening.
    ///
    /// Connection-less transports always report `true`.
    fn has_audience(&self) -> bool;

    /// Hand one sample to the transport
    ///
    /// # Errors
    /// Returns send error (should include context)
    async fn send(&mut self, sample: &Sample) -> Result<(), ContractError>;

    /// Release transport resources
    async fn close(&mut self) -> Result<(), ContractError>;
}
