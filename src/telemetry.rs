//! Optional telemetry for the control loop.
//!
//! The controller hands every intermediate vector of a tick to a sink after
//! the tick's outputs are fixed. Sinks observe; they never feed back.

use std::cell::RefCell;
use std::rc::Rc;

use nalgebra::Vector3;
use tracing::trace;

use crate::actuator::PropellerOutput;

/// Everything the controller computed during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlTelemetry {
    pub tick: u64,
    pub position: Vector3<f64>,
    pub target: Vector3<f64>,
    pub pos_error: Vector3<f64>,
    pub pos_error_delta: Vector3<f64>,
    pub target_force: Vector3<f64>,
    pub rot_error: Vector3<f64>,
    pub rot_error_delta: Vector3<f64>,
    pub rotation_input: Vector3<f64>,
    pub vertical_thrust: f64,
    pub throttles: [f64; 4],
}

/// Receiver of control-loop telemetry.
pub trait TelemetrySink {
    fn record(&mut self, sample: &ControlTelemetry);

    /// Called once per propeller after it applied its wrench.
    fn record_propeller(&mut self, _tick: u64, _index: usize, _output: &PropellerOutput) {}
}

impl<F> TelemetrySink for F
where
    F: FnMut(&ControlTelemetry),
{
    fn record(&mut self, sample: &ControlTelemetry) {
        self(sample)
    }
}

/// Keeps every sample in memory. Clones share the same buffer, so a clone
/// can be handed to the controller and the recorder read back later.
#[derive(Debug, Clone, Default)]
pub struct TelemetryRecorder {
    samples: Rc<RefCell<Vec<ControlTelemetry>>>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> Vec<ControlTelemetry> {
        self.samples.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.samples.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.borrow().is_empty()
    }

    pub fn last(&self) -> Option<ControlTelemetry> {
        self.samples.borrow().last().copied()
    }
}

impl TelemetrySink for TelemetryRecorder {
    fn record(&mut self, sample: &ControlTelemetry) {
        self.samples.borrow_mut().push(*sample);
    }
}

/// Emits every sample as a `trace`-level event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn record(&mut self, sample: &ControlTelemetry) {
        trace!(
            tick = sample.tick,
            pos_error = ?sample.pos_error,
            target_force = ?sample.target_force,
            rotation_input = ?sample.rotation_input,
            throttles = ?sample.throttles,
            "Control tick"
        );
    }

    fn record_propeller(&mut self, tick: u64, index: usize, output: &PropellerOutput) {
        trace!(
            tick,
            index,
            force = ?output.force,
            reactive_torque = output.reactive_torque,
            "Propeller output"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tick: u64) -> ControlTelemetry {
        ControlTelemetry {
            tick,
            position: Vector3::zeros(),
            target: Vector3::zeros(),
            pos_error: Vector3::zeros(),
            pos_error_delta: Vector3::zeros(),
            target_force: Vector3::new(0.0, 2.45, 0.0),
            rot_error: Vector3::zeros(),
            rot_error_delta: Vector3::zeros(),
            rotation_input: Vector3::zeros(),
            vertical_thrust: 2.45,
            throttles: [2.45; 4],
        }
    }

    #[test]
    fn test_closure_sink() {
        let mut ticks = Vec::new();
        {
            let mut sink = |s: &ControlTelemetry| ticks.push(s.tick);
            sink.record(&sample(3));
            sink.record(&sample(4));
        }
        assert_eq!(ticks, vec![3, 4]);
    }

    #[test]
    fn test_recorder_clones_share_buffer() {
        let recorder = TelemetryRecorder::new();
        let mut sink = recorder.clone();
        sink.record(&sample(1));
        sink.record(&sample(2));

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.samples()[0].vertical_thrust, 2.45);
        assert_eq!(recorder.last().map(|s| s.tick), Some(2));
    }
}
