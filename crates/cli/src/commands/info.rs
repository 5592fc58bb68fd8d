//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{PipelineBlueprint, Role};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

use super::load_blueprint;
use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    producer: Option<ProducerInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subscriber: Option<SubscriberInfo>,
    channels: Vec<ChannelInfo>,
}

#[derive(Serialize)]
struct ProducerInfo {
    rate_hz: f64,
    log_every: u64,
    center_lon: f64,
    center_lat: f64,
    amplitude: f64,
    angular_step: f64,
}

#[derive(Serialize)]
struct SubscriberInfo {
    listen_addr: String,
    format: String,
}

#[derive(Serialize)]
struct ChannelInfo {
    name: String,
    kind: String,
    rate_hz: f64,
    policy: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;
    if let Some(role) = args.role {
        blueprint.role = role.into();
    }

    info!(role = %blueprint.role, "Loaded configuration info");

    let info = build_config_info(&blueprint);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &PipelineBlueprint) -> ConfigInfo {
    let producer = (blueprint.role == Role::Publisher).then(|| ProducerInfo {
        rate_hz: blueprint.producer.rate_hz,
        log_every: blueprint.producer.log_every,
        center_lon: blueprint.trajectory.center_lon,
        center_lat: blueprint.trajectory.center_lat,
        amplitude: blueprint.trajectory.amplitude,
        angular_step: blueprint.trajectory.angular_step,
    });

    let subscriber = (blueprint.role == Role::Subscriber).then(|| SubscriberInfo {
        listen_addr: blueprint.subscriber.listen_addr.clone(),
        format: format!("{:?}", blueprint.subscriber.format).to_lowercase(),
    });

    let channels = blueprint
        .effective_channels()
        .into_iter()
        .map(|channel| ChannelInfo {
            kind: format!("{:?}", channel.kind).to_lowercase(),
            policy: format!("{:?}", channel.effective_policy()),
            name: channel.name,
            rate_hz: channel.rate_hz,
            params: channel.params,
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        role: blueprint.role.to_string(),
        producer,
        subscriber,
        channels,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("\n=== Pipeline Configuration ===\n");
    println!("Version: {}", info.version);
    println!("Role: {}", info.role);

    if let Some(ref producer) = info.producer {
        println!("\nProducer:");
        println!("  Rate: {} Hz (log every {} samples)", producer.rate_hz, producer.log_every);
        println!(
            "  Trajectory: centre ({}, {}), amplitude {}, step {} rad",
            producer.center_lon, producer.center_lat, producer.amplitude, producer.angular_step
        );
    }

    if let Some(ref subscriber) = info.subscriber {
        println!("\nSubscriber:");
        println!("  Listen: {} ({})", subscriber.listen_addr, subscriber.format);
    }

    println!("\nChannels ({}):", info.channels.len());
    for channel in &info.channels {
        println!(
            "  - {} ({}) @ {} Hz, policy {}",
            channel.name, channel.kind, channel.rate_hz, channel.policy
        );
        let mut params: Vec<_> = channel.params.iter().collect();
        params.sort();
        for (key, value) in params {
            println!("      {} = {}", key, value);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publisher_info() {
        let info = build_config_info(&PipelineBlueprint::default());

        assert_eq!(info.role, "publisher");
        assert!(info.producer.is_some());
        assert!(info.subscriber.is_none());
        assert_eq!(info.channels.len(), 2);
        assert_eq!(info.channels[0].kind, "bus");
        assert_eq!(info.channels[1].policy, "RequireAudience");
    }

    #[test]
    fn test_subscriber_info_json() {
        let blueprint = PipelineBlueprint {
            role: Role::Subscriber,
            ..Default::default()
        };
        let json = serde_json::to_value(build_config_info(&blueprint)).unwrap();

        assert_eq!(json["role"], "subscriber");
        assert!(json.get("producer").is_none());
        assert_eq!(json["subscriber"]["listen_addr"], "0.0.0.0:7400");
        assert_eq!(json["channels"][0]["params"]["bind"], "0.0.0.0:8082");
    }
}
