//! PipelineBlueprint - Config Loader output
//!
//! Describes the whole pipeline: role, producer rate, trajectory shape and
//! the outbound channels with their own rates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Default bus destination / subscriber listen port
pub const DEFAULT_BUS_PORT: u16 = 7400;

/// Default WebSocket port in publisher role
pub const PUBLISHER_WEBSOCKET_PORT: u16 = 8081;

/// Default WebSocket port in subscriber role
pub const SUBSCRIBER_WEBSOCKET_PORT: u16 = 8082;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete pipeline blueprint
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PipelineBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Which data source feeds the cache
    #[serde(default)]
    pub role: Role,

    /// Producer loop settings
    #[serde(default)]
    #[validate(nested)]
    pub producer: ProducerConfig,

    /// Figure-eight trajectory shape
    #[serde(default)]
    #[validate(nested)]
    pub trajectory: TrajectoryConfig,

    /// Bus listener settings (subscriber role only)
    #[serde(default)]
    pub subscriber: SubscriberConfig,

    /// Outbound channels; empty means the role's default layout
    #[serde(default)]
    #[validate(nested)]
    pub channels: Vec<ChannelConfig>,
}

/// Process role, selected once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Generate the trajectory locally and publish it
    #[default]
    Publisher,
    /// Receive coordinates from the bus and forward them
    Subscriber,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Publisher => f.write_str("publisher"),
            Self::Subscriber => f.write_str("subscriber"),
        }
    }
}

/// Producer loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProducerConfig {
    /// Samples per second
    #[serde(default = "default_producer_rate")]
    #[validate(range(exclusive_min = 0.0))]
    pub rate_hz: f64,

    /// Emit a progress log every N ticks
    #[serde(default = "default_log_every")]
    #[validate(range(min = 1))]
    pub log_every: u64,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_producer_rate(),
            log_every: default_log_every(),
        }
    }
}

fn default_producer_rate() -> f64 {
    50.0
}

fn default_log_every() -> u64 {
    100
}

/// Figure-eight trajectory parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct TrajectoryConfig {
    /// Curve centre longitude (degrees)
    #[serde(default = "default_center_lon")]
    pub center_lon: f64,

    /// Curve centre latitude (degrees)
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,

    /// Curve half-width (degrees)
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,

    /// Phase advance per sample (radians)
    #[serde(default = "default_angular_step")]
    pub angular_step: f64,
}

impl Default for TrajectoryConfig {
    fn default() -> Self {
        Self {
            center_lon: default_center_lon(),
            center_lat: default_center_lat(),
            amplitude: default_amplitude(),
            angular_step: default_angular_step(),
        }
    }
}

fn default_center_lon() -> f64 {
    107.02243
}

fn default_center_lat() -> f64 {
    20.76300
}

fn default_amplitude() -> f64 {
    0.05
}

fn default_angular_step() -> f64 {
    0.01
}

/// Bus listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberConfig {
    /// UDP address to receive bus records on
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Expected wire format
    #[serde(default)]
    pub format: WireFormat,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            format: WireFormat::default(),
        }
    }
}

fn default_listen_addr() -> String {
    format!("0.0.0.0:{DEFAULT_BUS_PORT}")
}

/// Bus record serialization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireFormat {
    /// JSON (human-readable, larger)
    #[default]
    Json,
    /// Bincode (binary, compact)
    Bincode,
}

impl WireFormat {
    /// Parse a `format` parameter value
    pub fn from_param(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "bincode" => Some(Self::Bincode),
            _ => None,
        }
    }
}

/// Outbound channel configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChannelConfig {
    /// Channel name
    #[validate(length(min = 1))]
    pub name: String,

    /// Channel type
    pub kind: ChannelKind,

    /// Ticks per second of this channel's distribution loop
    #[validate(range(exclusive_min = 0.0))]
    pub rate_hz: f64,

    /// Forwarding policy (defaults per kind)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ForwardPolicy>,

    /// Kind-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl ChannelConfig {
    /// Create a channel with the kind's default policy and no params
    pub fn new(name: impl Into<String>, kind: ChannelKind, rate_hz: f64) -> Self {
        Self {
            name: name.into(),
            kind,
            rate_hz,
            policy: None,
            params: HashMap::new(),
        }
    }

    /// Add a parameter
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Configured policy, or the kind's default
    pub fn effective_policy(&self) -> ForwardPolicy {
        self.policy.unwrap_or_else(|| self.kind.default_policy())
    }
}

/// Channel type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Message-bus publisher (UDP datagrams)
    Bus,
    /// WebSocket push broadcaster
    Websocket,
    /// Log output
    Log,
}

impl ChannelKind {
    /// Interactive fan-out skips ticks with nobody connected
    pub fn default_policy(self) -> ForwardPolicy {
        match self {
            Self::Websocket => ForwardPolicy::RequireAudience,
            Self::Bus | Self::Log => ForwardPolicy::Always,
        }
    }
}

/// When a distribution loop performs the handoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardPolicy {
    /// Forward every new sample
    #[default]
    Always,
    /// Forward only while the transport reports an audience
    RequireAudience,
}

impl PipelineBlueprint {
    /// Configured channels, or the default layout for the role
    pub fn effective_channels(&self) -> Vec<ChannelConfig> {
        if !self.channels.is_empty() {
            return self.channels.clone();
        }

        match self.role {
            Role::Publisher => vec![
                ChannelConfig::new("bus", ChannelKind::Bus, 20.0)
                    .with_param("addr", format!("127.0.0.1:{DEFAULT_BUS_PORT}")),
                ChannelConfig::new("websocket", ChannelKind::Websocket, 10.0)
                    .with_param("bind", format!("0.0.0.0:{PUBLISHER_WEBSOCKET_PORT}")),
            ],
            Role::Subscriber => vec![ChannelConfig::new("websocket", ChannelKind::Websocket, 10.0)
                .with_param("bind", format!("0.0.0.0:{SUBSCRIBER_WEBSOCKET_PORT}"))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_blueprint_is_publisher_layout() {
        let blueprint = PipelineBlueprint::default();
        assert_eq!(blueprint.role, Role::Publisher);
        assert_eq!(blueprint.producer.rate_hz, 50.0);
        assert_eq!(blueprint.trajectory.center_lon, 107.02243);

        let channels = blueprint.effective_channels();
        assert_eq!(channels.len(), 2);
        assert_eq!(channels[0].kind, ChannelKind::Bus);
        assert_eq!(channels[0].rate_hz, 20.0);
        assert_eq!(channels[1].kind, ChannelKind::Websocket);
        assert_eq!(channels[1].rate_hz, 10.0);
        assert_eq!(
            channels[1].params.get("bind").map(String::as_str),
            Some("0.0.0.0:8081")
        );
    }

    #[test]
    fn subscriber_layout_uses_its_own_port() {
        let blueprint = PipelineBlueprint {
            role: Role::Subscriber,
            ..Default::default()
        };
        let channels = blueprint.effective_channels();
        assert_eq!(channels.len(), 1);
        assert_eq!(
            channels[0].params.get("bind").map(String::as_str),
            Some("0.0.0.0:8082")
        );
    }

    #[test]
    fn policy_defaults_per_kind() {
        let ws = ChannelConfig::new("ws", ChannelKind::Websocket, 10.0);
        assert_eq!(ws.effective_policy(), ForwardPolicy::RequireAudience);

        let mut bus = ChannelConfig::new("bus", ChannelKind::Bus, 20.0);
        assert_eq!(bus.effective_policy(), ForwardPolicy::Always);
        bus.policy = Some(ForwardPolicy::RequireAudience);
        assert_eq!(bus.effective_policy(), ForwardPolicy::RequireAudience);
    }

    #[test]
    fn blueprint_deserializes_with_defaults() {
        let blueprint: PipelineBlueprint = serde_json::from_str(r#"{"role":"subscriber"}"#).unwrap();
        assert_eq!(blueprint.role, Role::Subscriber);
        assert_eq!(blueprint.producer.log_every, 100);
        assert_eq!(blueprint.subscriber.listen_addr, "0.0.0.0:7400");
        assert!(blueprint.channels.is_empty());
    }

    #[test]
    fn wire_format_from_param() {
        assert_eq!(WireFormat::from_param("JSON"), Some(WireFormat::Json));
        assert_eq!(WireFormat::from_param("bincode"), Some(WireFormat::Bincode));
        assert_eq!(WireFormat::from_param("xml"), None);
    }
}
