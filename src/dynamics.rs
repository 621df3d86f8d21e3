use fast_ode;
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use tracing::warn;

use crate::error::{SimulationError, SimulationResult};

/// Number of scalar states integrated per rigid body.
pub const STATE_DIM: usize = 13;

/// Complete kinematic state of a rigid body in 3D space.
///
/// Orientation maps body-frame vectors into the world frame. The body frame
/// uses +Y as up, +Z as forward and +X as right.
///
/// # Fields
///
/// * `position` - Center of mass in the world frame (meters)
/// * `velocity` - Linear velocity in the world frame (m/s)
/// * `orientation` - Rotation from body to world frame
/// * `angular_velocity` - Angular velocity in the body frame (rad/s)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct State {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub angular_velocity: Vector3<f64>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            orientation: UnitQuaternion::identity(),
            angular_velocity: Vector3::zeros(),
        }
    }
}

impl State {
    /// A body at rest at `position` with identity orientation.
    pub fn at_rest(position: Vector3<f64>) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Converts the state structure to a fixed-size array.
    ///
    /// # Returns
    ///
    /// A 13-element array in the following order:
    /// [pos_x, pos_y, pos_z, vel_x, vel_y, vel_z, q_w, q_i, q_j, q_k, rate_x, rate_y, rate_z]
    pub fn to_array(&self) -> [f64; STATE_DIM] {
        let q = self.orientation.quaternion();
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.velocity.x,
            self.velocity.y,
            self.velocity.z,
            q.w,
            q.i,
            q.j,
            q.k,
            self.angular_velocity.x,
            self.angular_velocity.y,
            self.angular_velocity.z,
        ]
    }

    /// Creates a state structure from a fixed-size array.
    ///
    /// The quaternion part is renormalized, which removes the drift the
    /// integrator accumulates on the unit constraint.
    ///
    /// # Arguments
    ///
    /// * `arr` - A 13-element array in the same order as `to_array()`
    pub fn from_array(arr: &[f64; STATE_DIM]) -> Self {
        State {
            position: Vector3::new(arr[0], arr[1], arr[2]),
            velocity: Vector3::new(arr[3], arr[4], arr[5]),
            orientation: UnitQuaternion::from_quaternion(Quaternion::new(
                arr[6], arr[7], arr[8], arr[9],
            )),
            angular_velocity: Vector3::new(arr[10], arr[11], arr[12]),
        }
    }
}

/// Physical constants and properties of the body.
///
/// # Fields
///
/// * `gravity` - Gravitational acceleration in the world frame (m/s²)
/// * `mass` - Total mass (kg)
/// * `ixx`, `iyy`, `izz` - Principal moments of inertia about body axes (kg⋅m²)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Consts {
    pub gravity: Vector3<f64>,
    pub mass: f64,
    pub ixx: f64,
    pub iyy: f64,
    pub izz: f64,
}

impl Consts {
    /// Principal moments of inertia as a vector.
    pub fn inertia(&self) -> Vector3<f64> {
        Vector3::new(self.ixx, self.iyy, self.izz)
    }
}

/// Rigid-body equations of motion under a constant wrench.
///
/// The force acts in the world frame, the torque about body axes. Both are
/// held constant over the integration span (zero-order hold).
pub struct BodyOde {
    pub consts: Consts,
    pub force: Vector3<f64>,
    pub torque: Vector3<f64>,
}

impl fast_ode::DifferentialEquation<STATE_DIM> for BodyOde {
    /// Computes the time derivatives of the state vector.
    ///
    /// 1. Position derivatives: ṗ = v
    /// 2. Velocity derivatives: v̇ = F/m + g
    /// 3. Attitude derivatives: q̇ = ½ q ⊗ (0, ω)
    /// 4. Angular velocity derivatives: Euler's rotational equations
    fn ode_dot_y(&self, _t: f64, y: &fast_ode::Coord<STATE_DIM>) -> (fast_ode::Coord<STATE_DIM>, bool) {
        let state = y.0;

        let velocity = Vector3::new(state[3], state[4], state[5]);
        let q = Quaternion::new(state[6], state[7], state[8], state[9]);
        let omega = Vector3::new(state[10], state[11], state[12]);

        let accel = self.force / self.consts.mass + self.consts.gravity;
        let q_dot = q * Quaternion::new(0.0, omega.x, omega.y, omega.z) * 0.5;

        // I ω̇ = τ − ω × (I ω)
        let inertia = self.consts.inertia();
        let angular_momentum = inertia.component_mul(&omega);
        let omega_dot = (self.torque - omega.cross(&angular_momentum)).component_div(&inertia);

        let mut dot_y = [0.0; STATE_DIM];

        dot_y[0] = velocity.x;
        dot_y[1] = velocity.y;
        dot_y[2] = velocity.z;

        dot_y[3] = accel.x;
        dot_y[4] = accel.y;
        dot_y[5] = accel.z;

        dot_y[6] = q_dot.w;
        dot_y[7] = q_dot.i;
        dot_y[8] = q_dot.j;
        dot_y[9] = q_dot.k;

        dot_y[10] = omega_dot.x;
        dot_y[11] = omega_dot.y;
        dot_y[12] = omega_dot.z;

        (fast_ode::Coord(dot_y), true)
    }
}

/// Integrates rigid-body motion over a time interval.
///
/// # Arguments
///
/// * `initial_state` - Starting state of the body
/// * `consts` - Physical parameters of the body
/// * `force` - Applied force in the world frame (N), gravity excluded
/// * `torque` - Applied torque about body axes (N⋅m)
/// * `time_span` - Tuple (t_start, t_end) defining integration interval (seconds)
/// * `tolerance` - Absolute tolerance for the numerical integrator
///
/// # Returns
///
/// * `Ok(State)` - Final state after integration
/// * `Err(SimulationError::IntegrationFailed)` - If the solver stops early
pub fn simulate_body(
    initial_state: State,
    consts: Consts,
    force: Vector3<f64>,
    torque: Vector3<f64>,
    time_span: (f64, f64),
    tolerance: f64,
) -> SimulationResult<State> {
    let ode = BodyOde {
        consts,
        force,
        torque,
    };

    let initial_coord = fast_ode::Coord(initial_state.to_array());

    let result = fast_ode::solve_ivp(
        &ode,
        time_span,
        initial_coord,
        |_, _| true,
        tolerance,
        tolerance * 10.0,
    );

    match result {
        fast_ode::IvpResult::FinalTimeReached(final_coord) => Ok(State::from_array(&final_coord.0)),
        _ => Err(SimulationError::IntegrationFailed {
            t0: time_span.0,
            t1: time_span.1,
        }),
    }
}

/// The physics collaborator seen by the controller and the propellers.
///
/// Implementors supply pose and mass, and accumulate the wrench applied
/// during a tick. Integration is the implementor's business.
pub trait RigidBody {
    fn position(&self) -> Vector3<f64>;

    fn velocity(&self) -> Vector3<f64>;

    /// Rotation from body to world frame.
    fn orientation(&self) -> UnitQuaternion<f64>;

    fn mass(&self) -> f64;

    /// World gravity acting on this body.
    fn gravity(&self) -> Vector3<f64>;

    /// Applies a world-frame force at a world-space point.
    ///
    /// An off-center point also induces torque about the center of mass.
    fn add_force_at_position(&mut self, force: Vector3<f64>, point: Vector3<f64>);

    /// Applies a torque expressed in the body frame.
    fn add_relative_torque(&mut self, torque: Vector3<f64>);

    /// Body +Y axis in world coordinates.
    fn up(&self) -> Vector3<f64> {
        self.orientation().transform_vector(&Vector3::y())
    }

    /// Body +Z axis in world coordinates.
    fn forward(&self) -> Vector3<f64> {
        self.orientation().transform_vector(&Vector3::z())
    }

    /// Maps a body-frame point to world coordinates.
    fn transform_point(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.position() + self.orientation().transform_vector(local)
    }
}

/// A rigid body advanced by [`simulate_body`] in fixed steps.
///
/// Forces and torques applied between two calls to [`SimulatedBody::step`]
/// are summed and held constant over the next step, then cleared.
#[derive(Clone, Debug)]
pub struct SimulatedBody {
    state: State,
    consts: Consts,
    tolerance: f64,
    time: f64,
    /// Accumulated world-frame force
    force: Vector3<f64>,
    /// Accumulated body-frame torque
    torque: Vector3<f64>,
}

impl SimulatedBody {
    pub fn new(state: State, consts: Consts) -> Self {
        Self {
            state,
            consts,
            tolerance: 1e-6,
            time: 0.0,
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
        }
    }

    /// Sets the integrator tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn consts(&self) -> &Consts {
        &self.consts
    }

    /// Simulated time elapsed (seconds).
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Force accumulated since the last step, world frame.
    pub fn accumulated_force(&self) -> Vector3<f64> {
        self.force
    }

    /// Torque accumulated since the last step, body frame.
    pub fn accumulated_torque(&self) -> Vector3<f64> {
        self.torque
    }

    /// Advances the body by `dt` seconds under the accumulated wrench.
    ///
    /// The accumulators are cleared whether or not integration succeeds;
    /// on failure the state is left untouched.
    pub fn step(&mut self, dt: f64) -> SimulationResult<()> {
        let force = std::mem::replace(&mut self.force, Vector3::zeros());
        let torque = std::mem::replace(&mut self.torque, Vector3::zeros());

        if !(dt.is_finite() && dt > 0.0) {
            return Err(SimulationError::InvalidTimestep(dt));
        }

        let span = (self.time, self.time + dt);
        let result = simulate_body(
            self.state,
            self.consts,
            force,
            torque,
            span,
            self.tolerance,
        );

        match result {
            Ok(next) => {
                self.state = next;
                self.time = span.1;
                Ok(())
            }
            Err(err) => {
                warn!(t0 = span.0, t1 = span.1, "Rigid body integration failed");
                Err(err)
            }
        }
    }
}

impl RigidBody for SimulatedBody {
    fn position(&self) -> Vector3<f64> {
        self.state.position
    }

    fn velocity(&self) -> Vector3<f64> {
        self.state.velocity
    }

    fn orientation(&self) -> UnitQuaternion<f64> {
        self.state.orientation
    }

    fn mass(&self) -> f64 {
        self.consts.mass
    }

    fn gravity(&self) -> Vector3<f64> {
        self.consts.gravity
    }

    fn add_force_at_position(&mut self, force: Vector3<f64>, point: Vector3<f64>) {
        self.force += force;
        let lever = point - self.state.position;
        let world_torque = lever.cross(&force);
        self.torque += self.state.orientation.inverse_transform_vector(&world_torque);
    }

    fn add_relative_torque(&mut self, torque: Vector3<f64>) {
        self.torque += torque;
    }
}
