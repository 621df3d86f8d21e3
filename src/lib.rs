//! Point-to-point flight control for simulated quadrotors.
//!
//! A [`FlightController`] steers one vehicle toward a target position with a
//! cascaded PD loop: position error becomes a target force, misalignment
//! between that force and body up becomes a rotation input, and the two
//! are mixed into four propeller throttles. [`Vehicle`] couples the
//! controller with a rigid body integrated by `fast_ode`.
//!
//! The world frame is +Y up, +Z forward and +X right.
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector3;
//! use quadnav::{State, Vehicle, VehicleConfig};
//!
//! let config = VehicleConfig::default();
//! let mut vehicle =
//!     Vehicle::from_config(&config, State::default(), Vector3::new(0.0, 1.0, 0.0)).unwrap();
//! vehicle.run(10).unwrap();
//! assert!(vehicle.position().y > 0.0);
//! ```

pub mod actuator;
pub mod config;
pub mod control;
pub mod dynamics;
pub mod error;
pub mod math;
pub mod peers;
pub mod target;
pub mod telemetry;
pub mod vehicle;

pub use actuator::{MotorRole, Propeller, PropellerOutput, SpinDirection};
pub use config::{BodyConfig, PropellerConfig, VehicleConfig};
pub use control::{ControlOutput, ErrorState, FlightController, Gains, ThrustClamp};
pub use dynamics::{Consts, RigidBody, SimulatedBody, State};
pub use error::{ConfigError, ConfigResult, SimulationError, SimulationResult};
pub use peers::{PeerRegistry, VehicleId};
pub use target::{Target, TargetAnchor, TargetHandle};
pub use telemetry::{ControlTelemetry, TelemetryRecorder, TelemetrySink, TracingSink};
pub use vehicle::Vehicle;
