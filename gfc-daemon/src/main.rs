//! gpio-fan-control daemon
//!
//! Switches a fan wired to a GPIO line on and off from a sysfs thermal
//! sensor, exports its state for Prometheus, and restarts or powers off the
//! system once the critical temperature is reached.
//!
//! # Exit codes
//! - `0`: terminated by signal, fan switched off and line released
//! - `1`: invalid parameters, hardware unavailable, or the critical action
//!   did not take the system down

mod cli;
mod logging;
mod metrics_server;
mod signals;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use gfc_core::{
    BuildInfo, CdevLine, ControlParameters, FanController, FanMetrics, FanState, LoopExit,
    SysfsSensor, SystemActuator,
};
use gfc_error::FanControlError;
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::metrics_server::MetricsServer;
use crate::signals::ShutdownSignal;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    std::panic::set_hook(Box::new(|panic_info| {
        let location = panic_info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        eprintln!("PANIC at {}: {}", location, panic_info);
    }));

    let cli = Cli::parse_with_build_info();
    let target = logging::init(cli.verbose);

    let params = match ControlParameters::resolve(cli.to_input()) {
        Ok(params) => params,
        Err(e) => {
            error!("Invalid parameters: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.dump_config {
        return match serde_json::to_string_pretty(&params) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Failed to serialize parameters: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    info!("Logging to {}", target.describe());
    match run(params).await {
        Ok(LoopExit::Terminated) => ExitCode::SUCCESS,
        Ok(LoopExit::Critical) => {
            error!("System is still running after the critical action, exiting");
            ExitCode::FAILURE
        }
        Err(e) => {
            match e.downcast_ref::<FanControlError>() {
                Some(cause) if cause.is_startup_fatal() => {
                    error!("Cannot start fan control: {:#}", e)
                }
                _ => error!("{:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(params: ControlParameters) -> anyhow::Result<LoopExit> {
    let build = BuildInfo::current();
    info!("Starting gpio-fan-control {}", build.describe());
    log_parameters(&params);

    let shutdown = ShutdownSignal::install().context("failed to install signal handler")?;

    let line = CdevLine::open(params.pin, FanState::Off)
        .with_context(|| format!("failed to claim GPIO {} ({})", params.gpio_label, params.pin))?;
    let sensor = SysfsSensor::open(&params.sensor_path)
        .with_context(|| format!("failed to open sensor {}", params.sensor_path.display()))?;

    let metrics = Arc::new(
        FanMetrics::new(
            params.gpio_label.clone(),
            params.sensor_label(),
            params.threshold_celsius,
            params.critical_celsius,
            params.poll_interval.as_secs_f64(),
        )
        .with_build_info(build),
    );

    let server = if params.metrics.enabled {
        match MetricsServer::start(params.metrics.port, Arc::clone(&metrics)) {
            Ok(server) => Some(server),
            Err(e) => {
                warn!("Metrics endpoint unavailable, continuing without it: {}", e);
                None
            }
        }
    } else {
        info!("Metrics endpoint disabled");
        None
    };

    let controller = FanController::new(params, sensor, line, SystemActuator, metrics);
    let exit = controller.run(shutdown.wait()).await;

    if let Some(server) = server {
        server.stop();
    }
    Ok(exit)
}

fn log_parameters(params: &ControlParameters) {
    info!("Starting fan control with following parameters:");
    info!("  GPIO pin for fan: {} ({})", params.gpio_label, params.pin);
    info!("  Threshold temperature: {:.2}°C", params.threshold_celsius);
    info!(
        "  Critical temperature: {:.2}°C (action: {})",
        params.critical_celsius, params.critical_action
    );
    info!("  Refresh time: {:?}", params.poll_interval);
    info!("  Sensor path: {}", params.sensor_path.display());
    if params.metrics.enabled {
        info!("  Metrics port: {}", params.metrics.port);
    }
}
