//! Constants and default values for gpio-fan-control
//!
//! Defaults match the command-line defaults of the daemon.

use std::time::Duration;

/// Startup parameter defaults
pub mod defaults {
    use super::Duration;

    /// GPIO pin number the fan transistor is wired to
    pub const GPIO_PIN: &str = "70";

    /// Temperature in °C at which the fan is switched on
    pub const THRESHOLD_CELSIUS: f64 = 45.0;

    /// Temperature in °C at which the system is restarted or powered off
    pub const CRITICAL_CELSIUS: f64 = 77.0;

    /// Time between two temperature checks
    pub const REFRESH_TIME: Duration = Duration::from_secs(5);

    /// Textual form of [`REFRESH_TIME`] for CLI defaults
    pub const REFRESH_TIME_STR: &str = "5s";

    /// Thermal zone exposed by most SBC kernels
    pub const SENSOR_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

    /// Port of the metrics endpoint
    pub const METRICS_PORT: u16 = 6560;
}

/// GPIO character device addressing
pub mod gpio {
    /// Lines exposed by one controller (bank)
    pub const LINES_PER_CHIP: u32 = 32;

    /// Directory holding the gpiochip character devices
    pub const DEV_DIR: &str = "/dev";

    /// Chip device name prefix (`gpiochip0`, `gpiochip1`, ...)
    pub const CHIP_PREFIX: &str = "gpiochip";

    /// Consumer label shown by `gpioinfo` for the claimed line
    pub const CONSUMER: &str = "gpio-fan-control";
}

/// Temperature sensor format
pub mod sensor {
    /// Bytes read from offset 0 on every sample ("45821" = 45.821 °C)
    pub const SAMPLE_WIDTH: usize = 5;

    /// sysfs reports millidegrees Celsius
    pub const MILLIDEGREE_DIVISOR: f64 = 1000.0;
}

/// Control loop tuning
pub mod control {
    /// Consecutive tick failures between two repeated warnings
    pub const ERROR_LOG_EVERY: u32 = 10;
}

/// Metrics naming
pub mod metrics {
    /// Prefix shared by every exported metric
    pub const NAMESPACE: &str = "gpio_fan_control";

    /// HTTP path serving the exposition
    pub const PATH: &str = "/metrics";

    /// Prometheus text exposition content type
    pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";
}
