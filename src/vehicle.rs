use std::rc::Rc;

use nalgebra::Vector3;
use tracing::debug;

use crate::actuator::PropellerOutput;
use crate::config::VehicleConfig;
use crate::control::{ControlOutput, FlightController};
use crate::dynamics::{RigidBody, SimulatedBody, State};
use crate::error::{ConfigResult, SimulationResult};
use crate::peers::{PeerRegistry, VehicleId};
use crate::target::{TargetAnchor, TargetHandle};

/// One simulated quadrotor: rigid body, controller and propellers.
///
/// A tick runs in a fixed order: the controller computes and writes the
/// throttles, the propellers apply their wrench, then the body is
/// integrated over one timestep.
#[derive(Debug)]
pub struct Vehicle {
    body: SimulatedBody,
    controller: FlightController,
    dt: f64,
    /// Mirrors the body position so others can follow this vehicle
    anchor: TargetAnchor,
    peers: Option<(VehicleId, Rc<PeerRegistry>)>,
    last_propellers: Option<[PropellerOutput; 4]>,
}

impl Vehicle {
    pub fn new(body: SimulatedBody, controller: FlightController, dt: f64) -> Self {
        let anchor = TargetAnchor::new(body.position());
        Self {
            body,
            controller,
            dt,
            anchor,
            peers: None,
            last_propellers: None,
        }
    }

    /// Builds a vehicle from a validated configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Vehicle configuration, validated here
    /// * `initial_state` - Pose and velocity at time zero
    /// * `target` - Initial literal target
    pub fn from_config(
        config: &VehicleConfig,
        initial_state: State,
        target: Vector3<f64>,
    ) -> ConfigResult<Self> {
        config.validate()?;

        let body = SimulatedBody::new(initial_state, config.body.to_consts())
            .with_tolerance(config.tolerance);
        let controller = FlightController::new(config.gains, config.build_propellers(), target)
            .with_thrust_clamp(config.thrust_clamp);

        debug!(
            position = ?initial_state.position,
            ?target,
            dt = config.dt,
            "Created vehicle"
        );

        Ok(Self::new(body, controller, config.dt))
    }

    /// Gives this vehicle read access to its peers' positions.
    pub fn with_peers(mut self, id: VehicleId, peers: Rc<PeerRegistry>) -> Self {
        self.peers = Some((id, peers));
        self
    }

    pub fn body(&self) -> &SimulatedBody {
        &self.body
    }

    pub fn controller(&self) -> &FlightController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut FlightController {
        &mut self.controller
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn state(&self) -> &State {
        self.body.state()
    }

    pub fn position(&self) -> Vector3<f64> {
        self.body.position()
    }

    /// Anchor tracking this vehicle's position, updated after every tick.
    pub fn anchor(&self) -> &TargetAnchor {
        &self.anchor
    }

    /// Weak handle to this vehicle's position for followers and registries.
    pub fn handle(&self) -> TargetHandle {
        self.anchor.handle()
    }

    /// Propeller wrench applied during the most recent tick.
    pub fn last_propellers(&self) -> Option<&[PropellerOutput; 4]> {
        self.last_propellers.as_ref()
    }

    /// Current positions of the other registered vehicles.
    pub fn peer_positions(&self) -> Vec<(VehicleId, Vector3<f64>)> {
        match &self.peers {
            Some((id, registry)) => registry.others(*id).collect(),
            None => Vec::new(),
        }
    }

    /// Advances the vehicle by one fixed timestep.
    ///
    /// A tick is not atomic. If integration fails the body and the anchor
    /// keep their previous position and the propeller wrench is dropped,
    /// but the controller has already counted the tick and moved its error
    /// history forward.
    pub fn tick(&mut self) -> SimulationResult<ControlOutput> {
        let output = self.controller.update(&self.body);
        self.last_propellers = Some(self.controller.apply_actuators(&mut self.body));
        self.body.step(self.dt)?;
        self.anchor.set_position(self.body.position());
        Ok(output)
    }

    /// Runs `ticks` steps and returns the last control output.
    pub fn run(&mut self, ticks: usize) -> SimulationResult<Option<ControlOutput>> {
        let mut last = None;
        for _ in 0..ticks {
            last = Some(self.tick()?);
        }
        Ok(last)
    }
}
