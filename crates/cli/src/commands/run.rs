//! `run` command implementation.

use anyhow::{Context, Result};
use contracts::{ChannelKind, PipelineBlueprint, Role};
use std::time::Duration;
use tracing::{error, info, warn};

use super::load_blueprint;
use crate::cli::RunArgs;
use crate::error::{self, CliError};
use crate::pipeline::Pipeline;

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let blueprint = resolve_blueprint(args)?;

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    log_banner(&blueprint);

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        return Ok(());
    }

    let pipeline = Pipeline::start(&blueprint)
        .await
        .context("Failed to start pipeline")?;

    // Signal task stops the pipeline through the shared shutdown signal
    let shutdown = pipeline.shutdown_signal();
    let signal_task = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            match wait_for_signal().await {
                Ok(name) => warn!(signal = name, "Received shutdown signal, stopping pipeline..."),
                Err(e) => error!(error = %e, "Signal handling failed, stopping pipeline"),
            }
            shutdown.trigger();
        })
    };

    let run_for = (args.duration > 0).then(|| Duration::from_secs(args.duration));
    tokio::select! {
        _ = shutdown.wait() => {}
        _ = sleep_or_forever(run_for) => {
            info!(duration_secs = args.duration, "Run duration elapsed");
        }
    }

    pipeline.stop();
    signal_task.abort();

    let stats = pipeline.join().await?;
    stats.print_summary();

    info!("Trajectory pipeline finished");
    Ok(())
}

/// Load configuration and apply CLI overrides
fn resolve_blueprint(args: &RunArgs) -> Result<PipelineBlueprint> {
    let mut blueprint = load_blueprint(args.config.as_deref())?;

    if let Some(role) = args.role {
        info!(role = ?role, "Overriding role from CLI");
        blueprint.role = role.into();
    }
    if let Some(rate_hz) = args.producer_rate {
        info!(rate_hz, "Overriding producer rate from CLI");
        blueprint.producer.rate_hz = rate_hz;
    }

    config_loader::ConfigLoader::validate(&blueprint)
        .map_err(|e| CliError::config_validation(e.to_string()))?;

    Ok(blueprint)
}

async fn sleep_or_forever(duration: Option<Duration>) {
    match duration {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}

/// Wait for Ctrl+C, SIGTERM, SIGQUIT or SIGHUP
#[cfg(unix)]
async fn wait_for_signal() -> error::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).map_err(CliError::Signal)?;
    let mut quit = signal(SignalKind::quit()).map_err(CliError::Signal)?;
    let mut hangup = signal(SignalKind::hangup()).map_err(CliError::Signal)?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|_| "SIGINT").map_err(CliError::Signal),
        _ = terminate.recv() => Ok("SIGTERM"),
        _ = quit.recv() => Ok("SIGQUIT"),
        _ = hangup.recv() => Ok("SIGHUP"),
    }
}

/// Wait for Ctrl+C
#[cfg(not(unix))]
async fn wait_for_signal() -> error::Result<&'static str> {
    tokio::signal::ctrl_c().await.map_err(CliError::Signal)?;
    Ok("Ctrl+C")
}

/// Start-up banner: role, rates, centre, endpoints
fn log_banner(blueprint: &PipelineBlueprint) {
    match blueprint.role {
        Role::Publisher => info!(
            role = %blueprint.role,
            producer_rate_hz = blueprint.producer.rate_hz,
            center_lon = blueprint.trajectory.center_lon,
            center_lat = blueprint.trajectory.center_lat,
            amplitude = blueprint.trajectory.amplitude,
            "Configuration loaded"
        ),
        Role::Subscriber => info!(
            role = %blueprint.role,
            listen_addr = %blueprint.subscriber.listen_addr,
            format = ?blueprint.subscriber.format,
            "Configuration loaded"
        ),
    }

    for channel in blueprint.effective_channels() {
        let endpoint = match channel.kind {
            ChannelKind::Bus => channel.params.get("addr").cloned(),
            ChannelKind::Websocket => channel.params.get("bind").cloned(),
            ChannelKind::Log => None,
        };
        info!(
            channel = %channel.name,
            kind = ?channel.kind,
            rate_hz = channel.rate_hz,
            policy = ?channel.effective_policy(),
            endpoint = endpoint.as_deref().unwrap_or("-"),
            "Channel configured"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RoleArg;

    fn args() -> RunArgs {
        RunArgs {
            config: None,
            role: None,
            producer_rate: None,
            duration: 0,
            metrics_port: 0,
            dry_run: false,
        }
    }

    #[test]
    fn test_overrides_are_applied() {
        let blueprint = resolve_blueprint(&RunArgs {
            role: Some(RoleArg::Subscriber),
            producer_rate: Some(25.0),
            ..args()
        })
        .unwrap();

        assert_eq!(blueprint.role, Role::Subscriber);
        assert_eq!(blueprint.producer.rate_hz, 25.0);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let err = resolve_blueprint(&RunArgs {
            producer_rate: Some(0.0),
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }

    #[tokio::test]
    async fn test_dry_run_returns_immediately() {
        run_pipeline(&RunArgs {
            dry_run: true,
            ..args()
        })
        .await
        .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_or_forever_with_duration() {
        sleep_or_forever(Some(Duration::from_secs(5))).await;
    }
}
