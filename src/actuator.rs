use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::dynamics::RigidBody;
use crate::math::clamp_magnitude;

/// Sense of rotation of a propeller seen from above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpinDirection {
    Clockwise,
    CounterClockwise,
}

impl SpinDirection {
    /// `+1` for clockwise, `-1` for counter-clockwise.
    pub fn sign(self) -> f64 {
        match self {
            SpinDirection::Clockwise => 1.0,
            SpinDirection::CounterClockwise => -1.0,
        }
    }
}

/// Fixed logical position of a propeller in the X layout.
///
/// The mixing signs in [`crate::control::mix`] depend on this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotorRole {
    FrontLeft = 0,
    FrontRight = 1,
    RearLeft = 2,
    RearRight = 3,
}

impl MotorRole {
    pub const ALL: [MotorRole; 4] = [
        MotorRole::FrontLeft,
        MotorRole::FrontRight,
        MotorRole::RearLeft,
        MotorRole::RearRight,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Wrench a propeller applied during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropellerOutput {
    /// Force in world coordinates after clamping (N)
    pub force: Vector3<f64>,
    /// World-space point the force was applied at
    pub point: Vector3<f64>,
    /// Signed reactive torque about the body up axis (N⋅m)
    pub reactive_torque: f64,
}

/// A propeller rigidly mounted on the body, pushing along body up.
///
/// The throttle is stored exactly as written. Clamping to the rated force
/// happens only when the force is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Propeller {
    /// Mount position relative to the center of mass, body frame (m)
    mount_offset: Vector3<f64>,
    spin: SpinDirection,
    /// Rated maximum force (N)
    max_force: f64,
    /// Reactive torque per newton per meter of arm
    torque_coefficient: f64,
    throttle: f64,
}

impl Propeller {
    pub fn new(
        mount_offset: Vector3<f64>,
        spin: SpinDirection,
        max_force: f64,
        torque_coefficient: f64,
    ) -> Self {
        Self {
            mount_offset,
            spin,
            max_force,
            torque_coefficient,
            throttle: 0.0,
        }
    }

    // Getters
    pub fn throttle(&self) -> f64 {
        self.throttle
    }

    pub fn max_force(&self) -> f64 {
        self.max_force
    }

    pub fn mount_offset(&self) -> Vector3<f64> {
        self.mount_offset
    }

    pub fn spin(&self) -> SpinDirection {
        self.spin
    }

    pub fn torque_coefficient(&self) -> f64 {
        self.torque_coefficient
    }

    /// Distance from the center of mass to the mount point.
    pub fn arm_length(&self) -> f64 {
        self.mount_offset.norm()
    }

    /// Sets the throttle command. Any signed value is accepted.
    pub fn set_throttle(&mut self, throttle: f64) {
        self.throttle = throttle;
    }

    /// Force produced along `up` at the current throttle, clamped to the rating.
    pub fn force(&self, up: &Vector3<f64>) -> Vector3<f64> {
        clamp_magnitude(up * self.throttle, self.max_force)
    }

    /// Reactive torque about body up for a force of the given magnitude.
    pub fn reactive_torque(&self, force_magnitude: f64) -> f64 {
        self.arm_length() * force_magnitude * self.torque_coefficient * self.spin.sign()
    }

    /// Applies this tick's force and reactive torque to `body`.
    pub fn apply<B: RigidBody + ?Sized>(&self, body: &mut B) -> PropellerOutput {
        let force = self.force(&body.up());
        let point = body.transform_point(&self.mount_offset);
        body.add_force_at_position(force, point);

        let reactive_torque = self.reactive_torque(force.norm());
        body.add_relative_torque(Vector3::y() * reactive_torque);

        PropellerOutput {
            force,
            point,
            reactive_torque,
        }
    }
}
