use std::f64::consts::TAU;
use std::fmt;

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actuator::{MotorRole, Propeller, PropellerOutput};
use crate::dynamics::RigidBody;
use crate::math::{clamp_magnitude, lerp_clamped, project_on_plane, signed_angle};
use crate::target::{Target, TargetHandle};
use crate::telemetry::{ControlTelemetry, TelemetrySink};

/// Horizontal distance to the target below which yaw stops facing the
/// direction of travel and settles on world forward (meters).
pub const YAW_BLEND_DISTANCE: f64 = 3.0;

/// Heading the vehicle settles on once it has arrived.
pub fn world_forward() -> Vector3<f64> {
    Vector3::z()
}

/// World up, the normal of the plane horizontal error is measured in.
pub fn world_up() -> Vector3<f64> {
    Vector3::y()
}

/// Tuning of the two PD stages, applied component-wise.
///
/// Components are ordered body X, Y, Z. For the rotational stage that is
/// roll, yaw, pitch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gains {
    /// Proportional gain on position error
    pub movement_p: Vector3<f64>,
    /// Derivative gain on the per-tick change of position error
    pub movement_d: Vector3<f64>,
    /// Proportional gain on attitude error
    pub rotation_p: Vector3<f64>,
    /// Derivative gain on the per-tick change of attitude error
    pub rotation_d: Vector3<f64>,
}

impl Default for Gains {
    /// Tuned for the default 1 kg airframe stepped at 50 Hz.
    fn default() -> Self {
        Self {
            movement_p: Vector3::new(0.5, 1.0, 0.5),
            movement_d: Vector3::new(30.0, 40.0, 30.0),
            rotation_p: Vector3::new(0.65, 4.0, 0.65),
            rotation_d: Vector3::new(5.7, 100.0, 5.7),
        }
    }
}

/// How the translational stage saturates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ThrustClamp {
    /// Clamp only the proportional term to the combined rated thrust.
    /// Damping and gravity compensation are added on top unclamped.
    #[default]
    Proportional,
    /// Additionally clamp the summed target force to the combined rated thrust.
    Combined,
}

/// Error values remembered from the previous tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErrorState {
    pub last_pos_error: Vector3<f64>,
    pub last_rot_error: Vector3<f64>,
    pub last_target: Vector3<f64>,
}

/// Result of one control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutput {
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

/// Change of position error over one tick caused by the vehicle's own motion.
///
/// The target's displacement since the last tick is removed, so a target
/// moving under a stationary vehicle yields zero.
pub fn position_error_delta(
    pos_error: Vector3<f64>,
    last_pos_error: Vector3<f64>,
    target: Vector3<f64>,
    last_target: Vector3<f64>,
) -> Vector3<f64> {
    (pos_error - last_pos_error) + (last_target - target)
}

/// Yaw correction in fractions of a full turn.
///
/// Far from the target the vehicle turns to face its direction of travel;
/// within [`YAW_BLEND_DISTANCE`] it turns to face [`world_forward`]. The
/// two blend linearly over the following meter. Only the horizontal part
/// of `pos_error` counts, so climbing never reads as a heading error.
pub fn yaw_error(forward: &Vector3<f64>, up: &Vector3<f64>, pos_error: &Vector3<f64>) -> f64 {
    let horizontal = project_on_plane(pos_error, &world_up());
    let toward_travel = signed_angle(forward, &horizontal, up) / TAU;
    let toward_default = signed_angle(forward, &world_forward(), up) / TAU;

    lerp_clamped(
        toward_default,
        toward_travel,
        horizontal.norm() - YAW_BLEND_DISTANCE,
    )
}

/// Attitude error that aligns body up with `target_force`.
///
/// X and Z are the target force expressed in the body frame, read directly
/// as roll and pitch corrections. Y is replaced by [`yaw_error`].
pub fn rotation_error(
    target_force: &Vector3<f64>,
    pos_error: &Vector3<f64>,
    orientation: &UnitQuaternion<f64>,
) -> Vector3<f64> {
    let mut dir_error = orientation.inverse_transform_vector(target_force);

    let up = orientation.transform_vector(&Vector3::y());
    let forward = orientation.transform_vector(&Vector3::z());
    dir_error.y = yaw_error(&forward, &up, pos_error);

    dir_error
}

/// Distributes vertical thrust and rotation input across the X layout.
///
/// Order is front-left, front-right, rear-left, rear-right. Roll (X) and
/// pitch (Z) act through differential thrust on diagonal pairs; yaw (Y)
/// acts through the reactive torque of the clockwise pair (front-left,
/// rear-right) against the counter-clockwise pair.
pub fn mix(vertical: f64, rotation_input: &Vector3<f64>) -> [f64; 4] {
    let (rx, ry, rz) = (rotation_input.x, rotation_input.y, rotation_input.z);
    [
        vertical + rx - rz + ry, // front left
        vertical - rx - rz - ry, // front right
        vertical + rx + rz - ry, // rear left
        vertical - rx + rz + ry, // rear right
    ]
}

/// Cascaded PD controller steering a quadrotor toward a target point.
///
/// Each tick the translational stage turns position error into a target
/// force, the rotational stage turns the misalignment between body up and
/// that force into a rotation input, and both are mixed into four
/// throttle commands written to the propellers the controller owns.
///
/// # Control Architecture
///
/// Target → Position Error → Translational PD (+ gravity) → Target Force
///                                                           ↓
///                       Attitude Error ← Body-frame Target Force + Yaw Blend
///                             ↓
///                       Rotational PD → Rotation Input
///                                            ↓
/// Target Force · Body Up → Vertical Thrust → Mixing → Propeller Throttles
///
pub struct FlightController {
    gains: Gains,
    propellers: [Propeller; 4],
    target: Target,
    thrust_clamp: ThrustClamp,
    /// `None` until the first tick primes it
    state: Option<ErrorState>,
    tick: u64,
    telemetry: Option<Box<dyn TelemetrySink>>,
}

impl fmt::Debug for FlightController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlightController")
            .field("gains", &self.gains)
            .field("propellers", &self.propellers)
            .field("target", &self.target)
            .field("thrust_clamp", &self.thrust_clamp)
            .field("state", &self.state)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl FlightController {
    /// Creates a controller heading for a fixed `target`.
    ///
    /// # Arguments
    ///
    /// * `gains` - PD gains for both stages
    /// * `propellers` - Propellers in [`MotorRole`] order
    /// * `target` - Initial literal target (world frame)
    pub fn new(gains: Gains, propellers: [Propeller; 4], target: Vector3<f64>) -> Self {
        Self {
            gains,
            propellers,
            target: Target::Fixed(target),
            thrust_clamp: ThrustClamp::default(),
            state: None,
            tick: 0,
            telemetry: None,
        }
    }

    pub fn with_thrust_clamp(mut self, thrust_clamp: ThrustClamp) -> Self {
        self.thrust_clamp = thrust_clamp;
        self
    }

    pub fn gains(&self) -> &Gains {
        &self.gains
    }

    pub fn thrust_clamp(&self) -> ThrustClamp {
        self.thrust_clamp
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Target position as it would resolve this tick.
    pub fn target_position(&self) -> Vector3<f64> {
        self.target.resolve()
    }

    /// Sets the literal target. Has no effect while following a live target.
    pub fn set_target_position(&mut self, position: Vector3<f64>) {
        if !self.target.set_position(position) {
            debug!(?position, "Ignoring literal target while following");
        }
    }

    /// Locks the target to a live position.
    pub fn follow(&mut self, handle: TargetHandle) {
        debug!(fallback = ?self.target.literal(), "Following live target");
        self.target.follow(handle);
    }

    /// Releases the live target and returns to the literal one.
    pub fn unfollow(&mut self) {
        if self.target.is_following() {
            debug!(target = ?self.target.literal(), "Released live target");
        }
        self.target.unfollow();
    }

    pub fn propellers(&self) -> &[Propeller; 4] {
        &self.propellers
    }

    pub fn propeller(&self, role: MotorRole) -> &Propeller {
        &self.propellers[role.index()]
    }

    pub fn propeller_mut(&mut self, role: MotorRole) -> &mut Propeller {
        &mut self.propellers[role.index()]
    }

    /// Combined rated force of all propellers.
    pub fn total_max_force(&self) -> f64 {
        self.propellers.iter().map(Propeller::max_force).sum()
    }

    /// Errors remembered from the last tick, `None` before the first tick.
    pub fn error_state(&self) -> Option<&ErrorState> {
        self.state.as_ref()
    }

    /// Number of completed ticks.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn set_telemetry<S: TelemetrySink + 'static>(&mut self, sink: S) {
        self.telemetry = Some(Box::new(sink));
    }

    pub fn clear_telemetry(&mut self) {
        self.telemetry = None;
    }

    /// Force each propeller should contribute, world frame.
    ///
    /// The proportional term is clamped to [`total_max_force`](Self::total_max_force)
    /// before damping and gravity compensation are added. Gravity is spread
    /// evenly across the propellers so zero error means hover.
    pub fn target_force(
        &self,
        pos_error: Vector3<f64>,
        pos_error_delta: Vector3<f64>,
        gravity: Vector3<f64>,
        mass: f64,
    ) -> Vector3<f64> {
        let total_max_force = self.total_max_force();

        let proportional = clamp_magnitude(
            self.gains.movement_p.component_mul(&pos_error),
            total_max_force,
        );
        let damping = self.gains.movement_d.component_mul(&pos_error_delta);
        let gravity_compensation = -gravity * mass / self.propellers.len() as f64;

        let target_force = proportional + damping + gravity_compensation;

        match self.thrust_clamp {
            ThrustClamp::Proportional => target_force,
            ThrustClamp::Combined => clamp_magnitude(target_force, total_max_force),
        }
    }

    /// Rotational PD stage, per axis with no cross coupling.
    pub fn rotation_input(
        &self,
        rot_error: &Vector3<f64>,
        rot_error_delta: &Vector3<f64>,
    ) -> Vector3<f64> {
        self.gains.rotation_p.component_mul(rot_error)
            + self.gains.rotation_d.component_mul(rot_error_delta)
    }

    /// Seeds the error history from the body's current pose so the first
    /// derivative sample is zero.
    pub fn prime<B: RigidBody + ?Sized>(&mut self, body: &B) -> ErrorState {
        let target = self.target.resolve();
        let pos_error = target - body.position();
        let target_force =
            self.target_force(pos_error, Vector3::zeros(), body.gravity(), body.mass());
        let rot_error = rotation_error(&target_force, &pos_error, &body.orientation());

        let state = ErrorState {
            last_pos_error: pos_error,
            last_rot_error: rot_error,
            last_target: target,
        };
        self.state = Some(state);
        state
    }

    /// Runs one control tick and writes the throttles to the propellers.
    ///
    /// The error history is updated once, after every output is computed.
    pub fn update<B: RigidBody + ?Sized>(&mut self, body: &B) -> ControlOutput {
        let last = match self.state {
            Some(state) => state,
            None => self.prime(body),
        };

        let target = self.target.resolve();
        let pos_error = target - body.position();
        let pos_error_delta =
            position_error_delta(pos_error, last.last_pos_error, target, last.last_target);

        let target_force =
            self.target_force(pos_error, pos_error_delta, body.gravity(), body.mass());

        let rot_error = rotation_error(&target_force, &pos_error, &body.orientation());
        let rot_error_delta = rot_error - last.last_rot_error;
        let rotation_input = self.rotation_input(&rot_error, &rot_error_delta);

        let vertical_thrust = target_force.dot(&body.up());
        let throttles = mix(vertical_thrust, &rotation_input);

        for (propeller, throttle) in self.propellers.iter_mut().zip(throttles) {
            propeller.set_throttle(throttle);
        }

        self.state = Some(ErrorState {
            last_pos_error: pos_error,
            last_rot_error: rot_error,
            last_target: target,
        });

        let output = ControlOutput {
            target,
            pos_error,
            pos_error_delta,
            target_force,
            rot_error,
            rot_error_delta,
            rotation_input,
            vertical_thrust,
            throttles,
        };

        if let Some(sink) = self.telemetry.as_mut() {
            sink.record(&ControlTelemetry {
                tick: self.tick,
                position: body.position(),
                target,
                pos_error,
                pos_error_delta,
                target_force,
                rot_error,
                rot_error_delta,
                rotation_input,
                vertical_thrust,
                throttles,
            });
        }
        self.tick += 1;

        output
    }

    /// Lets every propeller apply its force and reactive torque to `body`.
    pub fn apply_actuators<B: RigidBody + ?Sized>(&mut self, body: &mut B) -> [PropellerOutput; 4] {
        let outputs: [PropellerOutput; 4] =
            std::array::from_fn(|i| self.propellers[i].apply(&mut *body));

        // Propeller samples belong to the tick that set the throttles
        if let (Some(sink), Some(tick)) = (self.telemetry.as_mut(), self.tick.checked_sub(1)) {
            for (index, output) in outputs.iter().enumerate() {
                sink.record_propeller(tick, index, output);
            }
        }

        outputs
    }
}
