//! Configuration for constraints and the Newton solver.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{CcdError, Result};

/// Settings for the collision constraints.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct ConstraintConfig {
    /// Initial barrier epsilon for the first outer iteration. The JSON key
    /// keeps its historical spelling.
    #[cfg_attr(feature = "serde", serde(rename = "custom_inital_epsilon"))]
    pub custom_initial_epsilon: f64,
    /// Epsilon of the swept-volume constraint.
    pub volume_epsilon: f64,
    /// Current barrier epsilon; shrunk monotonically across outer iterations.
    pub barrier_epsilon: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            custom_initial_epsilon: 0.5,
            volume_epsilon: 1e-6,
            barrier_epsilon: 0.01,
        }
    }
}

impl ConstraintConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !(self.custom_initial_epsilon > 0.0) {
            return Err(CcdError::invalid_config(format!(
                "custom_inital_epsilon must be positive, got {}",
                self.custom_initial_epsilon
            )));
        }
        if !(self.volume_epsilon > 0.0) {
            return Err(CcdError::invalid_config(format!(
                "volume_epsilon must be positive, got {}",
                self.volume_epsilon
            )));
        }
        if !(self.barrier_epsilon >= 0.0) {
            return Err(CcdError::invalid_config(format!(
                "barrier_epsilon must be non-negative, got {}",
                self.barrier_epsilon
            )));
        }
        Ok(())
    }
}

/// Settings for the Newton inner solver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(default))]
pub struct NewtonConfig {
    /// Maximum outer Newton iterations.
    pub max_iterations: usize,
    /// Line-search steps shorter than this abort the search.
    pub min_step_length: f64,
    /// Armijo sufficient-decrease coefficient; 0 selects the plain
    /// minimization rule `f(x + s dx) < f(x)`.
    pub armijo_coeff: f64,
    /// Convergence threshold on the max-norm of the free-DoF gradient.
    pub absolute_tolerance: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            min_step_length: 1e-12,
            armijo_coeff: 0.0,
            absolute_tolerance: 1e-8,
        }
    }
}

impl NewtonConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(CcdError::invalid_config("max_iterations must be positive"));
        }
        if !(self.min_step_length > 0.0) {
            return Err(CcdError::invalid_config(format!(
                "min_step_length must be positive, got {}",
                self.min_step_length
            )));
        }
        if !(0.0..=0.5).contains(&self.armijo_coeff) {
            return Err(CcdError::invalid_config(format!(
                "armijo_coeff must be in [0, 0.5], got {}",
                self.armijo_coeff
            )));
        }
        if !(self.absolute_tolerance > 0.0) {
            return Err(CcdError::invalid_config(format!(
                "absolute_tolerance must be positive, got {}",
                self.absolute_tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        ConstraintConfig::default().validate().unwrap();
        NewtonConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = NewtonConfig {
            min_step_length: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ConstraintConfig {
            volume_epsilon: -1.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_historical_json_key() {
        let config: ConstraintConfig =
            serde_json::from_str(r#"{"custom_inital_epsilon": 2.0}"#).unwrap();
        assert_eq!(config.custom_initial_epsilon, 2.0);
        // Unset keys fall back to defaults.
        assert_eq!(config.volume_epsilon, 1e-6);
    }
}
