//! GPIO pin addressing
//!
//! Board documentation numbers pins globally (e.g. `GPIO 70`), while the
//! Linux character device API addresses a line by controller and offset.
//! Each controller exposes 32 lines, so pin 70 is line 6 of `gpiochip2`.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::constants::gpio;
use crate::error::{FanControlError, Result};

/// Controller/line pair of a single GPIO
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PinAddress {
    pub chip: u32,
    pub line: u32,
}

impl PinAddress {
    /// Character device name of the controller (`gpiochip2`)
    pub fn chip_name(&self) -> String {
        format!("{}{}", gpio::CHIP_PREFIX, self.chip)
    }

    /// Full path of the controller device (`/dev/gpiochip2`)
    pub fn chip_path(&self) -> PathBuf {
        PathBuf::from(gpio::DEV_DIR).join(self.chip_name())
    }
}

impl fmt::Display for PinAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.chip_name(), self.line)
    }
}

/// Map a global pin number to its controller and line offset
pub fn resolve(pin: u32) -> PinAddress {
    PinAddress {
        chip: pin / gpio::LINES_PER_CHIP,
        line: pin % gpio::LINES_PER_CHIP,
    }
}

/// Parse a textual pin number and resolve it
///
/// Surrounding whitespace is accepted; signs, decimals and anything else
/// non-numeric are rejected with [`FanControlError::InvalidPinFormat`].
pub fn parse(pin: &str) -> Result<PinAddress> {
    let trimmed = pin.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FanControlError::InvalidPinFormat(pin.to_string()));
    }
    trimmed
        .parse::<u32>()
        .map(resolve)
        .map_err(|_| FanControlError::InvalidPinFormat(pin.to_string()))
}
