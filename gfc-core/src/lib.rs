//! gpio-fan-control core library
//!
//! Temperature-driven on/off fan control for single-board computers.
//!
//! # Features
//!
//! - **Pin addressing**: global GPIO numbers mapped to `gpiochipN` + line offset
//! - **Sensor sampling**: fixed-width millidegree reads from sysfs thermal zones
//! - **Fan switching**: one GPIO output line claimed through the character device
//! - **Safety**: restart or power-off once the critical temperature is reached
//! - **Metrics**: lock-light gauge set readable from another thread
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use gfc_core::{CdevLine, ControlParameters, FanController, FanMetrics, FanState,
//!                ParameterInput, SysfsSensor, SystemActuator};
//!
//! # async fn demo() -> gfc_core::Result<()> {
//! let params = ControlParameters::resolve(ParameterInput::default())?;
//! let metrics = Arc::new(FanMetrics::new("70", params.sensor_label(), 45.0, 77.0, 5.0));
//! let line = CdevLine::open(params.pin, FanState::Off)?;
//! let sensor = SysfsSensor::open(&params.sensor_path)?;
//! let controller = FanController::new(params, sensor, line, SystemActuator, metrics);
//! controller.run(std::future::pending::<()>()).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod control;
pub mod error;
pub mod gpio;
pub mod metrics;
pub mod pin;
pub mod sensor;
pub mod system;
pub mod version;

pub use config::{
    parse_duration, ControlParameters, CriticalAction, MetricsSettings, ParameterInput,
};
pub use control::{decide, Decision, FanController, FanState, LoopExit, TickOutcome};
pub use error::{FanControlError, Result};
pub use gpio::{CdevLine, OutputLine};
pub use metrics::{FanMetrics, MetricsSink, MetricsSnapshot, NoopMetrics};
pub use pin::PinAddress;
pub use sensor::{Sample, SysfsSensor, TemperatureSource};
pub use system::{CriticalActuator, SystemActuator};
pub use version::BuildInfo;
