//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{ChannelKind, ForwardPolicy, PipelineBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    role: String,
    producer_rate_hz: f64,
    channel_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    role: blueprint.role.to_string(),
                    producer_rate_hz: blueprint.producer.rate_hz,
                    channel_count: blueprint.effective_channels().len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &PipelineBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.channels.is_empty() {
        warnings.push(format!(
            "No channels configured - using the default {} layout",
            blueprint.role
        ));
    }

    for channel in blueprint.effective_channels() {
        if channel.rate_hz > blueprint.producer.rate_hz {
            warnings.push(format!(
                "Channel '{}' ticks faster ({} Hz) than the producer ({} Hz); extra ticks will be stale",
                channel.name, channel.rate_hz, blueprint.producer.rate_hz
            ));
        }
        if channel.kind == ChannelKind::Websocket
            && channel.effective_policy() == ForwardPolicy::Always
        {
            warnings.push(format!(
                "Channel '{}' counts every tick without clients as a failed send",
                channel.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Role: {}", summary.role);
            println!("  Producer rate: {} Hz", summary.producer_rate_hz);
            println!("  Channels: {}", summary.channel_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ChannelConfig;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_valid_config() {
        let file = write_config("role = \"publisher\"\n[producer]\nrate_hz = 40.0\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });

        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.role, "publisher");
        assert_eq!(summary.producer_rate_hz, 40.0);
        assert_eq!(summary.channel_count, 2);
    }

    #[test]
    fn test_invalid_config() {
        let file = write_config("[producer]\nrate_hz = -1.0\n");
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };

        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.is_some());
        assert!(run_validate(&args).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: "/nonexistent/config.toml".into(),
            json: false,
        });
        assert!(!result.valid);
    }

    #[test]
    fn test_warnings() {
        let blueprint = PipelineBlueprint {
            channels: vec![
                ChannelConfig::new("fast", ChannelKind::Log, 100.0),
                ChannelConfig {
                    policy: Some(ForwardPolicy::Always),
                    ..ChannelConfig::new("ws", ChannelKind::Websocket, 10.0)
                        .with_param("bind", "127.0.0.1:0")
                },
            ],
            ..Default::default()
        };

        let warnings = collect_warnings(&blueprint);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("fast"));
        assert!(warnings[1].contains("ws"));

        assert_eq!(collect_warnings(&PipelineBlueprint::default()).len(), 1);
    }
}
