//! Digital output line driving the fan
//!
//! The fan is switched through a single GPIO line claimed from the Linux
//! character device API (`/dev/gpiochipN`). While the handle is held no other
//! process can claim the line; dropping it returns the line to the kernel.
//!
//! # Line Values
//!
//! - 0 = fan off
//! - 1 = fan on

use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use tracing::{debug, warn};

use crate::constants::gpio;
use crate::control::FanState;
use crate::error::{FanControlError, Result};
use crate::pin::PinAddress;

/// A claimed digital output
#[cfg_attr(test, mockall::automock)]
pub trait OutputLine {
    /// Drive the line to the value matching `state`
    fn set_value(&mut self, state: FanState) -> Result<()>;

    /// Give the line back without changing its value. Idempotent.
    fn release(&mut self);
}

/// Drive the line low, then release it
///
/// Best-effort: a failed write is logged and the line is released anyway.
/// Returns whether the line was actually driven low.
pub fn close<L: OutputLine + ?Sized>(line: &mut L) -> bool {
    let driven_low = match line.set_value(FanState::Off) {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not drive fan line low before release: {}", e);
            false
        }
    };
    line.release();
    driven_low
}

fn open_error(address: PinAddress, reason: impl std::fmt::Display) -> FanControlError {
    FanControlError::GpioOpen {
        chip: address.chip_name(),
        line: address.line,
        reason: reason.to_string(),
    }
}

/// Output line backed by the GPIO character device
pub struct CdevLine {
    address: PinAddress,
    handle: Option<LineHandle>,
}

impl CdevLine {
    /// Claim `address` as an output, initially driven to `initial`
    pub fn open(address: PinAddress, initial: FanState) -> Result<Self> {
        let mut chip = Chip::new(address.chip_path()).map_err(|e| open_error(address, e))?;
        let handle = chip
            .get_line(address.line)
            .map_err(|e| open_error(address, e))?
            .request(LineRequestFlags::OUTPUT, initial.value(), gpio::CONSUMER)
            .map_err(|e| open_error(address, e))?;

        debug!(line = %address, initial = initial.value(), "Claimed GPIO output line");
        Ok(Self {
            address,
            handle: Some(handle),
        })
    }

    pub fn is_held(&self) -> bool {
        self.handle.is_some()
    }
}

impl OutputLine for CdevLine {
    fn set_value(&mut self, state: FanState) -> Result<()> {
        let handle = self.handle.as_ref().ok_or_else(|| {
            FanControlError::gpio_write(
                self.address.chip_name(),
                self.address.line,
                "line already released",
            )
        })?;
        handle
            .set_value(state.value())
            .map_err(|e| {
                FanControlError::gpio_write(self.address.chip_name(), self.address.line, e)
            })
    }

    fn release(&mut self) {
        if self.handle.take().is_some() {
            debug!(line = %self.address, "Released GPIO output line");
        }
    }
}

impl Drop for CdevLine {
    fn drop(&mut self) {
        if self.is_held() {
            close(self);
        }
    }
}
