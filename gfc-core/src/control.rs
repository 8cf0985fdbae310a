//! Fan control loop
//!
//! Sense-decide-act cycle driving a single on/off fan.
//!
//! # Policy
//!
//! Evaluated once per tick, in this order:
//! 1. **Critical**: temperature at or above the critical ceiling triggers the
//!    configured restart/power-off and ends the loop. Takes priority over
//!    everything else.
//! 2. **Rising edge**: at or above the threshold while off, switch on.
//! 3. **Falling edge**: below the threshold while on, switch off.
//! 4. Otherwise nothing is written to the hardware.
//!
//! The same threshold is used for both edges; there is no deadband.
//!
//! # Failure Handling
//! - Sensor and GPIO write failures are logged and counted, the tick is
//!   treated as if no transition happened and the loop keeps going
//! - Shutdown is only honored between ticks; a tick always runs to completion

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::ControlParameters;
use crate::constants::control::ERROR_LOG_EVERY;
use crate::error::FanControlError;
use crate::gpio::{self, OutputLine};
use crate::metrics::MetricsSink;
use crate::sensor::{Sample, TemperatureSource};
use crate::system::CriticalActuator;

/// Logical state of the fan line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FanState {
    #[default]
    Off,
    On,
}

impl FanState {
    /// Line value (0 or 1)
    pub fn value(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }

    /// Any non-zero value reads as on
    pub fn from_value(value: u8) -> Self {
        if value == 0 {
            Self::Off
        } else {
            Self::On
        }
    }
}

impl fmt::Display for FanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => f.write_str("off"),
            Self::On => f.write_str("on"),
        }
    }
}

/// What a sample calls for, before any hardware is touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Critical,
    Switch(FanState),
    Hold,
}

/// Hysteresis decision for one sample
pub fn decide(state: FanState, celsius: f64, threshold: f64, critical: f64) -> Decision {
    if celsius >= critical {
        Decision::Critical
    } else if celsius >= threshold && state == FanState::Off {
        Decision::Switch(FanState::On)
    } else if celsius < threshold && state == FanState::On {
        Decision::Switch(FanState::Off)
    } else {
        Decision::Hold
    }
}

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No transition needed
    Steady(FanState),
    /// Line written and state changed
    Switched(FanState),
    /// Sample could not be read or parsed; state unchanged
    SensorFailed,
    /// Transition wanted but the line write failed; state unchanged
    WriteFailed,
    /// Critical action issued, the loop must stop
    Critical,
}

/// Why the loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// Shutdown requested between ticks
    Terminated,
    /// Critical temperature reached and the system action was issued
    Critical,
}

/// Owns the fan state together with the sensor and output line handles
pub struct FanController<S, L, A> {
    params: ControlParameters,
    sensor: S,
    line: L,
    actuator: A,
    metrics: Arc<dyn MetricsSink>,
    state: FanState,
    critical_issued: bool,
    consecutive_failures: u32,
}

impl<S, L, A> FanController<S, L, A>
where
    S: TemperatureSource,
    L: OutputLine,
    A: CriticalActuator,
{
    /// `line` must already be driven to [`FanState::Off`]
    pub fn new(
        params: ControlParameters,
        sensor: S,
        line: L,
        actuator: A,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        metrics.set_fan_state(FanState::Off);
        Self {
            params,
            sensor,
            line,
            actuator,
            metrics,
            state: FanState::Off,
            critical_issued: false,
            consecutive_failures: 0,
        }
    }

    pub fn state(&self) -> FanState {
        self.state
    }

    /// Run one sense-decide-act cycle
    pub fn tick(&mut self) -> TickOutcome {
        if self.critical_issued {
            return TickOutcome::Critical;
        }

        let sample = match self.sensor.read_celsius() {
            Ok(celsius) => Sample::now(celsius),
            Err(e) => {
                self.metrics.record_sensor_error();
                self.note_failure(&e);
                return TickOutcome::SensorFailed;
            }
        };

        self.metrics.set_temperature(sample.celsius);
        debug!("Current temperature: {:.2}", sample.celsius);

        match decide(
            self.state,
            sample.celsius,
            self.params.threshold_celsius,
            self.params.critical_celsius,
        ) {
            Decision::Critical => {
                self.issue_critical(sample.celsius);
                TickOutcome::Critical
            }
            Decision::Hold => {
                self.note_success();
                TickOutcome::Steady(self.state)
            }
            Decision::Switch(next) => {
                match next {
                    FanState::On => info!("Starting fan, temperature: {:.2}", sample.celsius),
                    FanState::Off => info!("Stopping fan, temperature: {:.2}", sample.celsius),
                }
                match self.line.set_value(next) {
                    Ok(()) => {
                        let latency = sample.taken_at.elapsed();
                        debug!("Fan line set {} {:?} after sampling", next, latency);
                        self.state = next;
                        self.metrics.set_fan_state(next);
                        self.note_success();
                        TickOutcome::Switched(next)
                    }
                    Err(e) => {
                        self.metrics.record_write_error();
                        self.note_failure(&e);
                        TickOutcome::WriteFailed
                    }
                }
            }
        }
    }

    /// Tick every poll interval until `shutdown` resolves or a critical
    /// temperature is reached, then release the hardware
    ///
    /// The interval is measured from the end of the previous tick. A shutdown
    /// request only wins against the wait, never against a running tick.
    pub async fn run<F>(mut self, shutdown: F) -> LoopExit
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        debug!("Starting fan control loop");

        let exit = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break LoopExit::Terminated,
                _ = tokio::time::sleep(self.params.poll_interval) => {
                    if self.tick() == TickOutcome::Critical {
                        break LoopExit::Critical;
                    }
                }
            }
        };

        self.finish(exit);
        exit
    }

    fn issue_critical(&mut self, celsius: f64) {
        let action = self.params.critical_action;
        error!("Critical temperature reached: {:.2}, requesting system {}", celsius, action);
        self.critical_issued = true;
        if let Err(e) = self.actuator.trigger(action) {
            error!("Critical action failed: {}", e);
        }
    }

    /// Release the line and the sensor
    ///
    /// On termination the fan is switched off first. After a critical action
    /// the line is released as-is so the fan keeps running while the system
    /// goes down.
    fn finish(self, exit: LoopExit) {
        let Self {
            sensor,
            mut line,
            metrics,
            ..
        } = self;

        match exit {
            LoopExit::Terminated => {
                info!("Stopping fan control");
                if gpio::close(&mut line) {
                    metrics.set_fan_state(FanState::Off);
                } else {
                    metrics.record_write_error();
                }
            }
            LoopExit::Critical => line.release(),
        }
        drop(sensor);
    }

    fn note_failure(&mut self, e: &FanControlError) {
        self.consecutive_failures += 1;
        let count = self.consecutive_failures;
        if !e.is_transient() {
            error!("Tick failed (consecutive: {}): {}", count, e);
        } else if count == 1 || count % ERROR_LOG_EVERY == 0 {
            warn!("Tick failed (consecutive: {}): {}", count, e);
        } else {
            debug!("Tick failed (consecutive: {}): {}", count, e);
        }
    }

    fn note_success(&mut self) {
        if self.consecutive_failures > 0 {
            info!("Control loop recovered after {} failed ticks", self.consecutive_failures);
            self.consecutive_failures = 0;
        }
    }
}
