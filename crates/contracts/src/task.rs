//! PeriodicTask trait - scheduler callback interface

use crate::ContractError;

/// Work executed once per scheduler tick.
///
/// A returned error is logged by the scheduler and never stops the loop;
/// the next tick runs as usual.
#[trait_variant::make(PeriodicTask: Send)]
pub trait LocalPeriodicTask {
    /// Task name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Run one tick
    async fn on_tick(&mut self) -> Result<(), ContractError>;
}
