//! Error types for configuration and simulation.
//!
//! The control loop itself never fails: saturation and fallback handle
//! every anomaly there. Errors only surface at the edges.

use thiserror::Error;

/// Errors raised while loading or validating a [`VehicleConfig`](crate::config::VehicleConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration text could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// Body mass must be strictly positive.
    #[error("Body mass must be positive, got {0}")]
    NonPositiveMass(f64),

    /// Every principal moment of inertia must be strictly positive.
    #[error("Inertia components must be positive, got [{0}, {1}, {2}]")]
    NonPositiveInertia(f64, f64, f64),

    /// A propeller's rated force is negative or not finite.
    #[error("Propeller {index} has invalid max force {value}")]
    InvalidMaxForce { index: usize, value: f64 },

    /// A gain vector contains NaN or infinity.
    #[error("Gain vector `{0}` contains a non-finite component")]
    NonFiniteGain(&'static str),

    /// Fixed timestep must be positive and finite.
    #[error("Invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// Integrator tolerance must be positive and finite.
    #[error("Invalid integrator tolerance: {0}")]
    InvalidTolerance(f64),
}

/// Errors raised by the rigid-body integrator.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The ODE solver did not reach the end of the requested span.
    #[error("Integration failed over [{t0}, {t1}]")]
    IntegrationFailed { t0: f64, t1: f64 },

    /// Step length must be positive and finite.
    #[error("Invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type for simulation operations.
pub type SimulationResult<T> = std::result::Result<T, SimulationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::InvalidMaxForce {
            index: 2,
            value: -1.0,
        };
        assert_eq!(format!("{err}"), "Propeller 2 has invalid max force -1");

        let err = SimulationError::IntegrationFailed { t0: 0.0, t1: 0.02 };
        assert!(format!("{err}").contains("0.02"));
    }

    #[test]
    fn test_parse_error_conversion() {
        let parse = serde_json::from_str::<f64>("not json").unwrap_err();
        let err: ConfigError = parse.into();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
