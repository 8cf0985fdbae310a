//! Metrics sink shared between the control loop and the exposition thread
//!
//! The control loop is the only writer, the HTTP exposition thread the only
//! reader. Every value is stored independently (atomics, or a short mutex
//! section for the optional temperature) so neither side ever waits on the
//! other for longer than a single store or load.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::constants::metrics::NAMESPACE;
use crate::control::FanState;
use crate::version::BuildInfo;

/// Receiver of control loop observations
pub trait MetricsSink: Send + Sync {
    fn set_fan_state(&self, state: FanState);

    fn set_temperature(&self, celsius: f64);

    fn record_sensor_error(&self) {}

    fn record_write_error(&self) {}
}

/// Sink that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn set_fan_state(&self, _state: FanState) {}

    fn set_temperature(&self, _celsius: f64) {}
}

/// Point-in-time copy of the dynamic values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsSnapshot {
    pub fan_state: FanState,
    pub temperature: Option<f64>,
    pub sensor_errors: u64,
    pub write_errors: u64,
}

/// Gauge set labeled by GPIO pin and sensor path
#[derive(Debug)]
pub struct FanMetrics {
    gpio_pin: String,
    sensor_path: String,
    threshold_celsius: f64,
    critical_celsius: f64,
    refresh_seconds: f64,
    build: BuildInfo,
    fan_state: AtomicU8,
    temperature: Mutex<Option<f64>>,
    sensor_errors: AtomicU64,
    write_errors: AtomicU64,
}

impl FanMetrics {
    /// Static configuration gauges are fixed here and never change afterwards
    pub fn new(
        gpio_pin: impl Into<String>,
        sensor_path: impl Into<String>,
        threshold_celsius: f64,
        critical_celsius: f64,
        refresh_seconds: f64,
    ) -> Self {
        Self {
            gpio_pin: gpio_pin.into(),
            sensor_path: sensor_path.into(),
            threshold_celsius,
            critical_celsius,
            refresh_seconds,
            build: BuildInfo::current(),
            fan_state: AtomicU8::new(FanState::Off.value()),
            temperature: Mutex::new(None),
            sensor_errors: AtomicU64::new(0),
            write_errors: AtomicU64::new(0),
        }
    }

    pub fn with_build_info(mut self, build: BuildInfo) -> Self {
        self.build = build;
        self
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fan_state: FanState::from_value(self.fan_state.load(Ordering::Relaxed)),
            temperature: *self.temperature.lock(),
            sensor_errors: self.sensor_errors.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }

    /// Render every metric in the Prometheus text exposition format
    ///
    /// The temperature series is omitted until the first successful sample,
    /// so a sensor that never reads shows up as a gap rather than a zero.
    pub fn render(&self) -> String {
        let snap = self.snapshot();
        let labels = format!(
            "gpio_pin=\"{}\",sensor_path=\"{}\"",
            escape_label(&self.gpio_pin),
            escape_label(&self.sensor_path)
        );
        let build_labels = format!(
            "version=\"{}\",commitHash=\"{}\",branch=\"{}\",buildTimestamp=\"{}\",builtBy=\"{}\"",
            escape_label(self.build.version),
            escape_label(self.build.commit_hash),
            escape_label(self.build.branch),
            escape_label(self.build.build_timestamp),
            escape_label(self.build.built_by),
        );

        let mut out = String::new();
        push_metric(
            &mut out,
            "build_info",
            "gauge",
            "A metric with a constant '1' value labeled by version, commitHash, branch, buildTimestamp, builtBy.",
            &build_labels,
            1.0,
        );
        push_metric(
            &mut out,
            "threshold_temp",
            "gauge",
            "Temperature to start the fan.",
            &labels,
            self.threshold_celsius,
        );
        push_metric(
            &mut out,
            "critical_temp",
            "gauge",
            "Temperature to shutdown system.",
            &labels,
            self.critical_celsius,
        );
        push_metric(
            &mut out,
            "refresh_time",
            "gauge",
            "Time between each temperature check.",
            &labels,
            self.refresh_seconds,
        );
        push_metric(
            &mut out,
            "gpio_state",
            "gauge",
            "GPIO state for the fan.",
            &labels,
            f64::from(snap.fan_state.value()),
        );
        if let Some(celsius) = snap.temperature {
            push_metric(&mut out, "temperature", "gauge", "Current temperature.", &labels, celsius);
        }
        push_metric(
            &mut out,
            "sensor_errors_total",
            "counter",
            "Failed temperature reads.",
            &labels,
            snap.sensor_errors as f64,
        );
        push_metric(
            &mut out,
            "gpio_write_errors_total",
            "counter",
            "Failed GPIO writes.",
            &labels,
            snap.write_errors as f64,
        );
        out
    }
}

impl MetricsSink for FanMetrics {
    fn set_fan_state(&self, state: FanState) {
        self.fan_state.store(state.value(), Ordering::Relaxed);
    }

    fn set_temperature(&self, celsius: f64) {
        *self.temperature.lock() = Some(celsius);
    }

    fn record_sensor_error(&self) {
        self.sensor_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }
}

fn push_metric(out: &mut String, name: &str, kind: &str, help: &str, labels: &str, value: f64) {
    // Writing into a String cannot fail
    let _ = writeln!(out, "# HELP {}_{} {}", NAMESPACE, name, help);
    let _ = writeln!(out, "# TYPE {}_{} {}", NAMESPACE, name, kind);
    let _ = writeln!(out, "{}_{}{{{}}} {}", NAMESPACE, name, labels, value);
}

/// Escape a label value per the text exposition format
fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn metrics() -> FanMetrics {
        FanMetrics::new("70", "/sys/class/thermal/thermal_zone0/temp", 45.0, 77.0, 5.0)
            .with_build_info(BuildInfo {
                version: "0.1.0",
                branch: "main",
                commit_hash: "abc123",
                build_timestamp: "n/a",
                built_by: "ci",
            })
    }

    #[test]
    fn test_initial_snapshot() {
        let snap = metrics().snapshot();
        assert_eq!(snap.fan_state, FanState::Off);
        assert_eq!(snap.temperature, None);
        assert_eq!(snap.sensor_errors, 0);
        assert_eq!(snap.write_errors, 0);
    }

    #[test]
    fn test_render_static_gauges() {
        let text = metrics().render();
        let labels = "gpio_pin=\"70\",sensor_path=\"/sys/class/thermal/thermal_zone0/temp\"";
        assert!(text.contains(&format!("gpio_fan_control_threshold_temp{{{}}} 45", labels)));
        assert!(text.contains(&format!("gpio_fan_control_critical_temp{{{}}} 77", labels)));
        assert!(text.contains(&format!("gpio_fan_control_refresh_time{{{}}} 5", labels)));
        assert!(text.contains(&format!("gpio_fan_control_gpio_state{{{}}} 0", labels)));
        assert!(text.contains(concat!(
            "gpio_fan_control_build_info{version=\"0.1.0\",commitHash=\"abc123\",",
            "branch=\"main\",buildTimestamp=\"n/a\",builtBy=\"ci\"} 1",
        )));
        assert!(text.contains("# TYPE gpio_fan_control_gpio_state gauge"));
        assert!(!text.contains("gpio_fan_control_temperature{"));
    }

    #[test]
    fn test_render_dynamic_values() {
        let m = metrics();
        m.set_temperature(45.821);
        m.set_fan_state(FanState::On);
        m.record_sensor_error();
        m.record_sensor_error();
        m.record_write_error();

        let text = m.render();
        assert!(text.contains("gpio_fan_control_temperature{gpio_pin=\"70\""));
        assert!(text.contains("} 45.821\n"));
        assert!(text.contains("gpio_fan_control_sensor_errors_total{"));
        assert!(text.contains("# TYPE gpio_fan_control_gpio_write_errors_total counter"));

        let snap = m.snapshot();
        assert_eq!(snap.fan_state, FanState::On);
        assert_eq!(snap.sensor_errors, 2);
        assert_eq!(snap.write_errors, 1);
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label("plain"), "plain");
        assert_eq!(escape_label("a\"b"), "a\\\"b");
        assert_eq!(escape_label("a\\b\nc"), "a\\\\b\\nc");
    }

    #[test]
    fn test_concurrent_reader_and_writer() {
        let m = Arc::new(metrics());
        let writer = {
            let m = Arc::clone(&m);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    m.set_temperature(i as f64);
                    m.set_fan_state(if i % 2 == 0 { FanState::On } else { FanState::Off });
                }
            })
        };
        for _ in 0..100 {
            let text = m.render();
            assert!(text.contains("gpio_fan_control_gpio_state"));
        }
        writer.join().unwrap();
        assert_eq!(m.snapshot().temperature, Some(999.0));
    }
}
