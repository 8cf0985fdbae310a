//! Command Line Interface
//!
//! Flag names and defaults match the go-fan-control command line so
//! existing systemd units keep working.

use std::time::Duration;

use clap::{CommandFactory, FromArgMatches, Parser};
use gfc_core::constants::defaults;
use gfc_core::{BuildInfo, ParameterInput};

#[derive(Parser, Debug)]
#[command(name = "gpio-fan-control")]
#[command(version)]
#[command(about = "Fan control using gpio")]
#[command(long_about = "Fan control for SBC, using GPIO control, and sysfs for reading the
temperature from sensors.

The fan is switched on once the sensor reaches the threshold temperature and
off again as soon as it drops below it. At the critical temperature the system
is restarted (or powered off with --critical-shutdown).

EXAMPLES:
    gpio-fan-control                          Defaults: GPIO 70, 45°C / 77°C
    gpio-fan-control -g 12 -t 50 -r 10s       Fan on GPIO 12, start at 50°C
    gpio-fan-control -d -c 85                 Power off at 85°C
    gpio-fan-control --dump-config            Print resolved parameters as JSON

ENVIRONMENT VARIABLES:
    GFC_LOG=debug          Override the log filter (tracing EnvFilter syntax)")]
pub struct Cli {
    /// GPIO pin number where the fan is connected.
    #[arg(short = 'g', long = "gpio", default_value = defaults::GPIO_PIN)]
    pub gpio: String,

    /// Temperature in celsius to start the fan.
    #[arg(
        short = 't',
        long,
        default_value_t = defaults::THRESHOLD_CELSIUS,
        allow_negative_numbers = true
    )]
    pub threshold_temp: f64,

    /// Temperature in celsius to reboot system.
    #[arg(
        short = 'c',
        long,
        default_value_t = defaults::CRITICAL_CELSIUS,
        allow_negative_numbers = true
    )]
    pub critical_temp: f64,

    /// Time between each temperature check (e.g. 5s, 500ms, 1m).
    #[arg(
        short = 'r',
        long,
        default_value = defaults::REFRESH_TIME_STR,
        value_parser = parse_refresh_time
    )]
    pub refresh_time: Duration,

    /// SysFS path to the temperature sensor.
    #[arg(short = 's', long, default_value = defaults::SENSOR_PATH)]
    pub sensor_path: String,

    /// Port to expose metrics.
    #[arg(short = 'p', long, default_value_t = defaults::METRICS_PORT)]
    pub port: u16,

    /// Do not start the metrics endpoint.
    #[arg(long)]
    pub no_metrics: bool,

    /// Use shutdown instead of reboot when critical temperature is reached.
    #[arg(short = 'd', long)]
    pub critical_shutdown: bool,

    /// Verbose mode.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Print the resolved parameters as JSON and exit.
    #[arg(long)]
    pub dump_config: bool,
}

impl Cli {
    /// Parse the process arguments, reporting the full build string for `--version`
    pub fn parse_with_build_info() -> Self {
        let matches = Self::command()
            .version(BuildInfo::current().describe())
            .get_matches();
        Self::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
    }

    pub fn to_input(&self) -> ParameterInput {
        ParameterInput {
            gpio_pin: self.gpio.clone(),
            threshold_celsius: self.threshold_temp,
            critical_celsius: self.critical_temp,
            refresh_time: self.refresh_time,
            sensor_path: self.sensor_path.clone(),
            critical_shutdown: self.critical_shutdown,
            metrics_enabled: !self.no_metrics,
            metrics_port: self.port,
        }
    }
}

fn parse_refresh_time(value: &str) -> Result<Duration, String> {
    gfc_core::parse_duration(value).map_err(|e| e.to_string())
}
