//! Configuration validation
//!
//! Rules:
//! - producer and channel rates are finite and > 0, with a representable period
//! - log_every >= 1
//! - trajectory centre is a valid lon/lat, amplitude and step are finite
//! - channel names are non-empty and unique
//! - bus channels carry a valid `addr`, websocket channels a valid `bind`
//! - `format` params name a known wire format
//! - subscriber role has a valid listen address

use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::Duration;

use contracts::{ChannelConfig, ChannelKind, ContractError, PipelineBlueprint, Role, WireFormat};
use validator::Validate;

/// Validate a PipelineBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    validate_rates(blueprint)?;
    validate_derived_rules(blueprint)?;
    validate_trajectory(blueprint)?;
    validate_channels(blueprint)?;
    validate_subscriber(blueprint)?;
    Ok(())
}

/// Field-level rules declared on the contract types
fn validate_derived_rules(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// NaN and infinity slip through range rules
fn validate_rates(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    check_rate("producer.rate_hz", blueprint.producer.rate_hz)?;
    for channel in &blueprint.channels {
        check_rate(&format!("channels[{}].rate_hz", channel.name), channel.rate_hz)?;
    }
    Ok(())
}

fn check_rate(field: &str, rate_hz: f64) -> Result<(), ContractError> {
    if !rate_hz.is_finite() || rate_hz <= 0.0 {
        return Err(ContractError::config_validation(
            field,
            format!("rate_hz must be > 0, got {rate_hz}"),
        ));
    }
    match Duration::try_from_secs_f64(1.0 / rate_hz) {
        Ok(period) if !period.is_zero() => Ok(()),
        _ => Err(ContractError::config_validation(
            field,
            format!("rate_hz {rate_hz} has no representable tick period"),
        )),
    }
}

fn validate_trajectory(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let trajectory = &blueprint.trajectory;

    if !(-180.0..=180.0).contains(&trajectory.center_lon) {
        return Err(ContractError::config_validation(
            "trajectory.center_lon",
            format!("longitude must be within [-180, 180], got {}", trajectory.center_lon),
        ));
    }
    if !(-90.0..=90.0).contains(&trajectory.center_lat) {
        return Err(ContractError::config_validation(
            "trajectory.center_lat",
            format!("latitude must be within [-90, 90], got {}", trajectory.center_lat),
        ));
    }
    if !trajectory.amplitude.is_finite() || trajectory.amplitude < 0.0 {
        return Err(ContractError::config_validation(
            "trajectory.amplitude",
            format!("amplitude must be finite and >= 0, got {}", trajectory.amplitude),
        ));
    }
    if !trajectory.angular_step.is_finite() {
        return Err(ContractError::config_validation(
            "trajectory.angular_step",
            "angular_step must be finite",
        ));
    }
    Ok(())
}

/// Checked on the effective layout so role defaults are covered too
fn validate_channels(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    let channels = blueprint.effective_channels();
    let mut seen = HashSet::new();

    for (idx, channel) in channels.iter().enumerate() {
        if channel.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("channels[{idx}].name"),
                "channel name cannot be empty",
            ));
        }
        if !seen.insert(channel.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("channels[name={}]", channel.name),
                "duplicate channel name",
            ));
        }
        validate_channel_params(channel)?;
    }
    Ok(())
}

fn validate_channel_params(channel: &ChannelConfig) -> Result<(), ContractError> {
    let required = match channel.kind {
        ChannelKind::Bus => Some("addr"),
        ChannelKind::Websocket => Some("bind"),
        ChannelKind::Log => None,
    };

    if let Some(key) = required {
        let field = format!("channels[{}].params.{key}", channel.name);
        let value = channel
            .params
            .get(key)
            .ok_or_else(|| ContractError::config_validation(&field, format!("missing '{key}'")))?;
        check_socket_addr(&field, value)?;
    }

    if let Some(format) = channel.params.get("format") {
        if WireFormat::from_param(format).is_none() {
            return Err(ContractError::config_validation(
                format!("channels[{}].params.format", channel.name),
                format!("unknown format '{format}'"),
            ));
        }
    }
    Ok(())
}

fn validate_subscriber(blueprint: &PipelineBlueprint) -> Result<(), ContractError> {
    if blueprint.role == Role::Subscriber {
        check_socket_addr("subscriber.listen_addr", &blueprint.subscriber.listen_addr)?;
    }
    Ok(())
}

fn check_socket_addr(field: &str, value: &str) -> Result<(), ContractError> {
    value.parse::<SocketAddr>().map(|_| ()).map_err(|e| {
        ContractError::config_validation(field, format!("invalid address '{value}': {e}"))
    })
}
