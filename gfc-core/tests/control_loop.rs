/*
 * Integration tests for the fan control loop
 *
 * These drive the controller against a real sensor file and in-memory
 * line/actuator doubles, checking the behavior observable from outside
 * the crate: line writes, critical requests and exported metrics.
 */

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use gfc_core::{
    ControlParameters, CriticalAction, CriticalActuator, FanController, FanMetrics, FanState,
    LoopExit, OutputLine, ParameterInput, Result, SysfsSensor, TickOutcome,
};
use parking_lot::Mutex;
use tempfile::NamedTempFile;

#[derive(Debug, Clone, PartialEq)]
enum LineEvent {
    Write(u8),
    Release,
}

/// Line double recording every call
#[derive(Clone, Default)]
struct RecordingLine {
    events: Arc<Mutex<Vec<LineEvent>>>,
}

impl RecordingLine {
    fn writes(&self) -> Vec<u8> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                LineEvent::Write(v) => Some(*v),
                LineEvent::Release => None,
            })
            .collect()
    }

    fn events(&self) -> Vec<LineEvent> {
        self.events.lock().clone()
    }
}

impl OutputLine for RecordingLine {
    fn set_value(&mut self, state: FanState) -> Result<()> {
        self.events.lock().push(LineEvent::Write(state.value()));
        Ok(())
    }

    fn release(&mut self) {
        self.events.lock().push(LineEvent::Release);
    }
}

#[derive(Clone, Default)]
struct RecordingActuator {
    requests: Arc<Mutex<Vec<CriticalAction>>>,
}

impl CriticalActuator for RecordingActuator {
    fn trigger(&mut self, action: CriticalAction) -> Result<()> {
        self.requests.lock().push(action);
        Ok(())
    }
}

fn sensor_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn set_sensor(file: &NamedTempFile, content: &str) {
    std::fs::write(file.path(), content).unwrap();
}

fn params_for(file: &NamedTempFile, critical_shutdown: bool) -> ControlParameters {
    ControlParameters::resolve(ParameterInput {
        gpio_pin: "70".into(),
        threshold_celsius: 45.0,
        critical_celsius: 77.0,
        refresh_time: Duration::from_secs(5),
        sensor_path: file.path().to_string_lossy().into_owned(),
        critical_shutdown,
        ..Default::default()
    })
    .unwrap()
}

#[test]
fn test_hysteresis_cycle_against_sensor_file() {
    let file = sensor_file("30000\n");
    let params = params_for(&file, false);
    let metrics = Arc::new(FanMetrics::new(
        params.gpio_label.clone(),
        params.sensor_label(),
        params.threshold_celsius,
        params.critical_celsius,
        params.poll_interval.as_secs_f64(),
    ));
    let line = RecordingLine::default();
    let actuator = RecordingActuator::default();
    let sensor = SysfsSensor::open(&params.sensor_path).unwrap();
    let mut ctl =
        FanController::new(params, sensor, line.clone(), actuator.clone(), metrics.clone());

    assert_eq!(ctl.tick(), TickOutcome::Steady(FanState::Off));

    set_sensor(&file, "45000\n");
    assert_eq!(ctl.tick(), TickOutcome::Switched(FanState::On));
    assert_eq!(ctl.tick(), TickOutcome::Steady(FanState::On));

    set_sensor(&file, "44990\n");
    assert_eq!(ctl.tick(), TickOutcome::Switched(FanState::Off));

    assert_eq!(line.writes(), vec![1, 0]);
    assert!(actuator.requests.lock().is_empty());

    let text = metrics.render();
    assert!(text.contains("gpio_fan_control_gpio_state{gpio_pin=\"70\""));
    assert!(text.contains("} 44.99\n"));
}

#[test]
fn test_garbage_sample_keeps_fan_running() {
    let file = sensor_file("50000\n");
    let params = params_for(&file, false);
    let metrics = Arc::new(FanMetrics::new("70", params.sensor_label(), 45.0, 77.0, 5.0));
    let line = RecordingLine::default();
    let sensor = SysfsSensor::open(&params.sensor_path).unwrap();
    let actuator = RecordingActuator::default();
    let mut ctl = FanController::new(params, sensor, line.clone(), actuator, metrics.clone());

    assert_eq!(ctl.tick(), TickOutcome::Switched(FanState::On));

    set_sensor(&file, "xx\n");
    assert_eq!(ctl.tick(), TickOutcome::SensorFailed);
    assert_eq!(ctl.state(), FanState::On);

    set_sensor(&file, "20000\n");
    assert_eq!(ctl.tick(), TickOutcome::Switched(FanState::Off));

    assert_eq!(line.writes(), vec![1, 0]);
    assert_eq!(metrics.snapshot().sensor_errors, 1);
}

#[test]
fn test_unreadable_sensor_keeps_state() {
    // Opening a directory succeeds; reading it fails with EISDIR on every tick
    let dir = tempfile::tempdir().unwrap();
    let params = ControlParameters::resolve(ParameterInput {
        sensor_path: dir.path().to_string_lossy().into_owned(),
        ..Default::default()
    })
    .unwrap();
    let metrics = Arc::new(FanMetrics::new("70", params.sensor_label(), 45.0, 77.0, 5.0));
    let line = RecordingLine::default();
    let sensor = SysfsSensor::open(&params.sensor_path).unwrap();
    let actuator = RecordingActuator::default();
    let mut ctl = FanController::new(params, sensor, line.clone(), actuator, metrics.clone());

    for _ in 0..3 {
        assert_eq!(ctl.tick(), TickOutcome::SensorFailed);
        assert_eq!(ctl.state(), FanState::Off);
    }

    assert!(line.events().is_empty());
    let snap = metrics.snapshot();
    assert_eq!(snap.sensor_errors, 3);
    assert_eq!(snap.temperature, None);
}

#[tokio::test(start_paused = true)]
async fn test_run_until_signal_then_cleanup() {
    let file = sensor_file("60000\n");
    let params = params_for(&file, false);
    let line = RecordingLine::default();
    let sensor = SysfsSensor::open(&params.sensor_path).unwrap();
    let ctl = FanController::new(
        params,
        sensor,
        line.clone(),
        RecordingActuator::default(),
        Arc::new(gfc_core::NoopMetrics),
    );

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        ctl.run(async move {
            let _ = rx.await;
        })
        .await
    });

    // Several ticks at an identical temperature
    tokio::time::sleep(Duration::from_secs(23)).await;
    tx.send(()).unwrap();
    let exit = handle.await.unwrap();

    assert_eq!(exit, LoopExit::Terminated);
    assert_eq!(
        line.events(),
        vec![LineEvent::Write(1), LineEvent::Write(0), LineEvent::Release]
    );
}

#[tokio::test(start_paused = true)]
async fn test_critical_power_off_requested_once() {
    let file = sensor_file("40000\n");
    let params = params_for(&file, true);
    let line = RecordingLine::default();
    let actuator = RecordingActuator::default();
    let sensor = SysfsSensor::open(&params.sensor_path).unwrap();
    let ctl = FanController::new(
        params,
        sensor,
        line.clone(),
        actuator.clone(),
        Arc::new(gfc_core::NoopMetrics),
    );

    set_sensor(&file, "80000\n");
    let exit = ctl.run(std::future::pending::<()>()).await;

    assert_eq!(exit, LoopExit::Critical);
    assert_eq!(*actuator.requests.lock(), vec![CriticalAction::PowerOff]);
    assert_eq!(line.events(), vec![LineEvent::Release]);
}
