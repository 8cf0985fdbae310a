//! Termination handling
//!
//! SIGINT and SIGTERM (plus SIGHUP through ctrlc's `termination` feature)
//! flip a watch channel; the control loop awaits it between ticks.

use gfc_error::{FanControlError, Result};
use tokio::sync::watch;
use tracing::info;

/// Resolves once termination was requested
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

/// Requests shutdown of the paired [`ShutdownSignal`]
///
/// Dropping the trigger without firing it also releases the waiter.
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn fire(&self) {
        // No receiver left means the loop already returned
        let _ = self.tx.send(true);
    }
}

impl ShutdownSignal {
    pub fn channel() -> (ShutdownTrigger, Self) {
        let (tx, rx) = watch::channel(false);
        (ShutdownTrigger { tx }, Self { rx })
    }

    /// Route process termination signals into a new signal
    ///
    /// Can only be installed once per process.
    pub fn install() -> Result<Self> {
        let (trigger, signal) = Self::channel();
        ctrlc::set_handler(move || {
            info!("Received termination signal, shutting down");
            trigger.fire();
        })
        .map_err(|e| FanControlError::Signal(e.to_string()))?;
        Ok(signal)
    }

    pub async fn wait(mut self) {
        // An error means the trigger is gone, which counts as a request
        let _ = self.rx.wait_for(|requested| *requested).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fire_releases_waiter() {
        let (trigger, signal) = ShutdownSignal::channel();
        assert!(!*signal.rx.borrow());

        let waiter = tokio::spawn(signal.wait());
        trigger.fire();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .unwrap();
    }

    #[tokio::test]
    async fn test_fire_before_wait() {
        let (trigger, signal) = ShutdownSignal::channel();
        trigger.fire();
        assert!(*signal.rx.borrow());
        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .expect("already requested");
    }

    #[tokio::test]
    async fn test_dropped_trigger_releases_waiter() {
        let (trigger, signal) = ShutdownSignal::channel();
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .expect("dropped trigger");
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_while_not_requested() {
        let (_trigger, signal) = ShutdownSignal::channel();
        let result = tokio::time::timeout(Duration::from_secs(30), signal.wait()).await;
        assert!(result.is_err());
    }
}
