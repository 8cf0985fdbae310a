//! Startup parameters
//!
//! The daemon collects raw values (command-line flags, defaults) into a
//! [`ParameterInput`] and resolves them once into an immutable
//! [`ControlParameters`]. Every check happens here, before any hardware
//! resource is opened.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::constants::defaults;
use crate::error::{FanControlError, Result};
use crate::pin::{self, PinAddress};

/// Safety response when the critical temperature is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CriticalAction {
    Restart,
    PowerOff,
}

impl CriticalAction {
    /// `--critical-shutdown` selects power-off, restart otherwise
    pub fn from_shutdown_flag(shutdown: bool) -> Self {
        if shutdown {
            Self::PowerOff
        } else {
            Self::Restart
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Restart => "restart",
            Self::PowerOff => "power-off",
        }
    }
}

impl fmt::Display for CriticalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics endpoint settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSettings {
    pub enabled: bool,
    pub port: u16,
}

/// Unvalidated values as handed over by the command line
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInput {
    pub gpio_pin: String,
    pub threshold_celsius: f64,
    pub critical_celsius: f64,
    pub refresh_time: Duration,
    pub sensor_path: String,
    pub critical_shutdown: bool,
    pub metrics_enabled: bool,
    pub metrics_port: u16,
}

impl Default for ParameterInput {
    fn default() -> Self {
        Self {
            gpio_pin: defaults::GPIO_PIN.to_string(),
            threshold_celsius: defaults::THRESHOLD_CELSIUS,
            critical_celsius: defaults::CRITICAL_CELSIUS,
            refresh_time: defaults::REFRESH_TIME,
            sensor_path: defaults::SENSOR_PATH.to_string(),
            critical_shutdown: false,
            metrics_enabled: true,
            metrics_port: defaults::METRICS_PORT,
        }
    }
}

/// Validated, immutable parameters for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlParameters {
    /// Pin number exactly as configured, used for metric labels
    pub gpio_label: String,
    pub pin: PinAddress,
    pub threshold_celsius: f64,
    pub critical_celsius: f64,
    #[serde(serialize_with = "serialize_seconds")]
    pub poll_interval: Duration,
    pub sensor_path: PathBuf,
    pub critical_action: CriticalAction,
    pub metrics: MetricsSettings,
}

impl ControlParameters {
    /// Validate raw input
    ///
    /// Rejects a non-numeric pin, non-finite temperatures, a critical
    /// temperature not above the threshold, a zero poll interval and an
    /// empty sensor path.
    pub fn resolve(input: ParameterInput) -> Result<Self> {
        let pin = pin::parse(&input.gpio_pin)?;

        if !input.threshold_celsius.is_finite() {
            return Err(FanControlError::invalid_config(
                "threshold-temp",
                "must be a finite number",
            ));
        }
        if !input.critical_celsius.is_finite() {
            return Err(FanControlError::invalid_config("critical-temp", "must be a finite number"));
        }
        if input.critical_celsius <= input.threshold_celsius {
            return Err(FanControlError::invalid_config(
                "critical-temp",
                format!(
                    "{:.2}°C must be above the threshold temperature {:.2}°C",
                    input.critical_celsius, input.threshold_celsius
                ),
            ));
        }
        if input.refresh_time.is_zero() {
            return Err(FanControlError::invalid_config("refresh-time", "must be positive"));
        }
        if input.sensor_path.trim().is_empty() {
            return Err(FanControlError::invalid_config("sensor-path", "must not be empty"));
        }

        Ok(Self {
            gpio_label: input.gpio_pin.trim().to_string(),
            pin,
            threshold_celsius: input.threshold_celsius,
            critical_celsius: input.critical_celsius,
            poll_interval: input.refresh_time,
            sensor_path: PathBuf::from(input.sensor_path),
            critical_action: CriticalAction::from_shutdown_flag(input.critical_shutdown),
            metrics: MetricsSettings {
                enabled: input.metrics_enabled,
                port: input.metrics_port,
            },
        })
    }

    /// Sensor path as shown in logs and metric labels
    pub fn sensor_label(&self) -> String {
        self.sensor_path.to_string_lossy().into_owned()
    }
}

fn serialize_seconds<S: serde::Serializer>(
    d: &Duration,
    s: S,
) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// Parse a duration such as `5s`, `500ms`, `1m30s` or `2h`
///
/// A bare number is taken as seconds. Fractional values (`1.5s`) are allowed.
pub fn parse_duration(input: &str) -> Result<Duration> {
    let text = input.trim();
    if text.is_empty() {
        return Err(FanControlError::invalid_duration(input, "empty value"));
    }
    if let Ok(secs) = text.parse::<f64>() {
        return seconds_to_duration(input, secs);
    }

    let mut total = 0.0f64;
    let mut rest = text;
    while !rest.is_empty() {
        let num_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if num_len == 0 {
            return Err(FanControlError::invalid_duration(input, "expected a number"));
        }
        let value: f64 = rest[..num_len]
            .parse()
            .map_err(|_| FanControlError::invalid_duration(input, "malformed number"))?;
        rest = &rest[num_len..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit() || c == '.').unwrap_or(rest.len());
        let scale = match &rest[..unit_len] {
            "ms" => 0.001,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            "" => return Err(FanControlError::invalid_duration(input, "missing unit")),
            other => {
                return Err(FanControlError::invalid_duration(
                    input,
                    format!("unknown unit '{}'", other),
                ))
            }
        };
        rest = &rest[unit_len..];
        total += value * scale;
    }
    seconds_to_duration(input, total)
}

fn seconds_to_duration(input: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| FanControlError::invalid_duration(input, "out of range or negative"))
}
