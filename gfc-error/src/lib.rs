//! Unified error handling for gpio-fan-control
//!
//! A single error type shared by the core library and the daemon.
//! Variants are grouped by how the daemon reacts to them:
//! configuration and resource errors are fatal at startup, tick errors are
//! transient and only logged, everything else belongs to the outer surfaces.

use std::io;
use std::path::PathBuf;

/// Result type alias using FanControlError
pub type Result<T> = std::result::Result<T, FanControlError>;

/// Unified error type for all gpio-fan-control operations
#[derive(thiserror::Error, Debug)]
pub enum FanControlError {
    // ============================================================================
    // Configuration Errors (fatal, reported before hardware is touched)
    // ============================================================================
    #[error("Invalid GPIO pin '{0}': expected a non-negative integer")]
    InvalidPinFormat(String),

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    #[error("Invalid duration '{input}': {reason}")]
    InvalidDuration {
        input: String,
        reason: String,
    },

    // ============================================================================
    // Resource Acquisition Errors (fatal)
    // ============================================================================
    #[error("Failed to open sensor {path}: {source}")]
    SensorOpen {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to claim GPIO line {chip}:{line}: {reason}")]
    GpioOpen {
        chip: String,
        line: u32,
        reason: String,
    },

    // ============================================================================
    // Transient Tick Errors (logged, loop continues)
    // ============================================================================
    #[error("Failed to read sensor {path}: {source}")]
    SensorRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to parse sensor {path}: {raw:?} is not a millidegree value")]
    SensorParse {
        path: PathBuf,
        raw: String,
    },

    #[error("Failed to write GPIO line {chip}:{line}: {reason}")]
    GpioWrite {
        chip: String,
        line: u32,
        reason: String,
    },

    // ============================================================================
    // System and Surface Errors
    // ============================================================================
    #[error("Critical action {action} failed: {source}")]
    CriticalAction {
        action: &'static str,
        source: io::Error,
    },

    #[error("Metrics server error: {0}")]
    MetricsServer(String),

    #[error("Signal handler error: {0}")]
    Signal(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl FanControlError {
    /// Create an invalid configuration error
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }

    /// Create an invalid duration error
    pub fn invalid_duration(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create a GPIO write error
    pub fn gpio_write(chip: impl Into<String>, line: u32, reason: impl ToString) -> Self {
        Self::GpioWrite {
            chip: chip.into(),
            line,
            reason: reason.to_string(),
        }
    }

    /// Errors a single tick can raise without ending the control loop
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::SensorRead { .. } | Self::SensorParse { .. } | Self::GpioWrite { .. }
        )
    }

    /// Errors that must stop the daemon before the control loop starts
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::InvalidPinFormat(_)
                | Self::InvalidConfig { .. }
                | Self::InvalidDuration { .. }
                | Self::SensorOpen { .. }
                | Self::GpioOpen { .. }
        )
    }
}
