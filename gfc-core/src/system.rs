//! System-level critical action
//!
//! Restart or power-off through reboot(2). Filesystems are synced first since
//! the kernel does not do it for us. The request is fire-and-forget: on
//! success the machine goes down and the call never meaningfully returns.

use tracing::error;

use crate::config::CriticalAction;
use crate::error::{FanControlError, Result};

/// Performs the irreversible safety action
#[cfg_attr(test, mockall::automock)]
pub trait CriticalActuator {
    fn trigger(&mut self, action: CriticalAction) -> Result<()>;
}

/// Actuator issuing the reboot(2) system call
#[derive(Debug, Default)]
pub struct SystemActuator;

impl CriticalActuator for SystemActuator {
    #[cfg(target_os = "linux")]
    fn trigger(&mut self, action: CriticalAction) -> Result<()> {
        let cmd = match action {
            CriticalAction::Restart => libc::LINUX_REBOOT_CMD_RESTART,
            CriticalAction::PowerOff => libc::LINUX_REBOOT_CMD_POWER_OFF,
        };

        // SAFETY: sync takes no arguments and cannot fail.
        unsafe { libc::sync() };

        // SAFETY: reboot is called with one of the documented LINUX_REBOOT_CMD_*
        // constants. It either does not return or returns -1 with errno set.
        let rc = unsafe { libc::reboot(cmd) };
        if rc != 0 {
            let source = std::io::Error::last_os_error();
            error!("reboot({}) failed: {}", action, source);
            return Err(FanControlError::CriticalAction {
                action: action.as_str(),
                source,
            });
        }
        Ok(())
    }

    #[cfg(not(target_os = "linux"))]
    fn trigger(&mut self, action: CriticalAction) -> Result<()> {
        Err(FanControlError::CriticalAction {
            action: action.as_str(),
            source: std::io::Error::new(std::io::ErrorKind::Unsupported, "reboot(2) is Linux-only"),
        })
    }
}
