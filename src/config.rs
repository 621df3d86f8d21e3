//! Vehicle configuration
//!
//! Tuning constants for one vehicle: rigid-body properties, controller
//! gains, propeller layout and the fixed timestep. Loaded from JSON, with
//! every missing field taken from the defaults.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::actuator::{Propeller, SpinDirection};
use crate::control::{Gains, ThrustClamp};
use crate::dynamics::Consts;
use crate::error::{ConfigError, ConfigResult};

/// Rigid-body properties
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyConfig {
    /// Mass [kg]
    pub mass: f64,
    /// Inertia diagonal [kg·m²]
    pub inertia: Vector3<f64>,
    /// World gravity [m/s²]
    pub gravity: Vector3<f64>,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            mass: 1.0,
            inertia: Vector3::new(0.02, 0.04, 0.02),
            gravity: Vector3::new(0.0, -9.81, 0.0),
        }
    }
}

impl BodyConfig {
    pub fn to_consts(&self) -> Consts {
        Consts {
            gravity: self.gravity,
            mass: self.mass,
            ixx: self.inertia.x,
            iyy: self.inertia.y,
            izz: self.inertia.z,
        }
    }
}

/// One propeller's mounting and rating
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PropellerConfig {
    /// Mount position relative to the center of mass, body frame [m]
    pub mount_offset: Vector3<f64>,
    pub spin: SpinDirection,
    /// Rated maximum force [N]
    pub max_force: f64,
    /// Reactive torque coefficient
    pub torque_coefficient: f64,
}

impl PropellerConfig {
    pub fn to_propeller(&self) -> Propeller {
        Propeller::new(
            self.mount_offset,
            self.spin,
            self.max_force,
            self.torque_coefficient,
        )
    }
}

/// Symmetric X layout in [`MotorRole`](crate::actuator::MotorRole) order.
///
/// Front is +Z and right is +X. Front-left and rear-right spin clockwise,
/// which is the pairing the mixing matrix's yaw column expects.
pub fn x_layout(half_span: f64, max_force: f64, torque_coefficient: f64) -> [PropellerConfig; 4] {
    let mount = |x: f64, z: f64, spin| PropellerConfig {
        mount_offset: Vector3::new(x * half_span, 0.0, z * half_span),
        spin,
        max_force,
        torque_coefficient,
    };
    [
        mount(-1.0, 1.0, SpinDirection::Clockwise),
        mount(1.0, 1.0, SpinDirection::CounterClockwise),
        mount(-1.0, -1.0, SpinDirection::CounterClockwise),
        mount(1.0, -1.0, SpinDirection::Clockwise),
    ]
}

/// Complete configuration of one simulated vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Fixed control and physics timestep [s]
    pub dt: f64,
    /// Absolute tolerance of the rigid-body integrator
    pub tolerance: f64,
    pub body: BodyConfig,
    pub gains: Gains,
    /// Propellers in front-left, front-right, rear-left, rear-right order
    pub propellers: [PropellerConfig; 4],
    pub thrust_clamp: ThrustClamp,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            dt: 0.02, // 50 Hz
            tolerance: 1e-6,
            body: BodyConfig::default(),
            gains: Gains::default(),
            propellers: x_layout(0.2, 8.0, 0.5),
            thrust_clamp: ThrustClamp::default(),
        }
    }
}

impl VehicleConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        debug!(
            dt = config.dt,
            mass = config.body.mass,
            thrust_clamp = ?config.thrust_clamp,
            "Loaded vehicle configuration"
        );
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::InvalidTimestep(self.dt));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::InvalidTolerance(self.tolerance));
        }
        if !(self.body.mass.is_finite() && self.body.mass > 0.0) {
            return Err(ConfigError::NonPositiveMass(self.body.mass));
        }
        let inertia = self.body.inertia;
        if !inertia.iter().all(|i| i.is_finite() && *i > 0.0) {
            return Err(ConfigError::NonPositiveInertia(inertia.x, inertia.y, inertia.z));
        }
        for (index, propeller) in self.propellers.iter().enumerate() {
            if !(propeller.max_force.is_finite() && propeller.max_force >= 0.0) {
                return Err(ConfigError::InvalidMaxForce {
                    index,
                    value: propeller.max_force,
                });
            }
        }

        let gains = [
            ("movement_p", self.gains.movement_p),
            ("movement_d", self.gains.movement_d),
            ("rotation_p", self.gains.rotation_p),
            ("rotation_d", self.gains.rotation_d),
        ];
        for (name, gain) in gains {
            if !gain.iter().all(|g| g.is_finite()) {
                return Err(ConfigError::NonFiniteGain(name));
            }
        }

        Ok(())
    }

    pub fn build_propellers(&self) -> [Propeller; 4] {
        std::array::from_fn(|i| self.propellers[i].to_propeller())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VehicleConfig::default();
        assert_eq!(config.dt, 0.02);
        assert!(config.validate().is_ok());
        assert_eq!(config.thrust_clamp, ThrustClamp::Proportional);

        // Rated thrust leaves headroom over hover
        let total: f64 = config.propellers.iter().map(|p| p.max_force).sum();
        assert!(total > 2.0 * config.body.mass * config.body.gravity.norm());
    }

    #[test]
    fn test_x_layout_is_balanced() {
        let layout = x_layout(0.25, 5.0, 0.1);

        let centroid: Vector3<f64> = layout.iter().map(|p| p.mount_offset).sum();
        assert_eq!(centroid, Vector3::zeros());

        let spin_sum: f64 = layout.iter().map(|p| p.spin.sign()).sum();
        assert_eq!(spin_sum, 0.0);

        assert_eq!(layout[0].mount_offset, Vector3::new(-0.25, 0.0, 0.25));
        assert_eq!(layout[3].spin, SpinDirection::Clockwise);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = VehicleConfig::from_json(r#"{ "dt": 0.01, "thrust_clamp": "Combined" }"#).unwrap();

        assert_eq!(config.dt, 0.01);
        assert_eq!(config.thrust_clamp, ThrustClamp::Combined);
        assert_eq!(config.gains, Gains::default());
        assert_eq!(config.body, BodyConfig::default());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = VehicleConfig::default();
        config.gains.rotation_p = Vector3::new(1.0, 2.0, 3.0);
        config.propellers[1].spin = SpinDirection::Clockwise;

        let text = serde_json::to_string(&config).unwrap();
        let parsed = VehicleConfig::from_json(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let err = VehicleConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let mut config = VehicleConfig::default();
        config.body.mass = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::NonPositiveMass(_))));

        let mut config = VehicleConfig::default();
        config.body.inertia.y = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::NonPositiveInertia(..))));

        let mut config = VehicleConfig::default();
        config.propellers[2].max_force = -3.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidMaxForce { index: 2, .. })
        ));

        let mut config = VehicleConfig::default();
        config.gains.rotation_d.x = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::NonFiniteGain("rotation_d"))));

        let mut config = VehicleConfig::default();
        config.dt = -0.01;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTimestep(_))));

        let mut config = VehicleConfig::default();
        config.tolerance = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidTolerance(_))));
    }

    #[test]
    fn test_zero_rated_force_is_allowed() {
        let mut config = VehicleConfig::default();
        for propeller in config.propellers.iter_mut() {
            propeller.max_force = 0.0;
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_physics_conversion() {
        let config = VehicleConfig::default();
        let consts = config.body.to_consts();
        assert_eq!(consts.mass, config.body.mass);
        assert_eq!(consts.inertia(), config.body.inertia);

        let propellers = config.build_propellers();
        assert_eq!(propellers[2].mount_offset(), config.propellers[2].mount_offset);
        assert_eq!(propellers[2].throttle(), 0.0);
    }
}
