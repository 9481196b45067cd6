//! Configuration shared by the integrator.

use nalgebra::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default gravity (m/s², Z up).
#[must_use]
pub fn default_gravity() -> Vector3<f64> {
    Vector3::new(0.0, 0.0, -15.0)
}

/// Forces applied to every dynamic body during velocity integration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntegrationParams {
    /// Gravitational acceleration (m/s²).
    pub gravity: Vector3<f64>,
    /// Quadratic linear drag coefficient `Kdl` (force = −Kdl·v·|v|).
    pub linear_drag: f64,
    /// Linear angular damping coefficient `Kda` (torque = −Kda·ω).
    pub angular_damping: f64,
}

impl Default for IntegrationParams {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            linear_drag: 0.0,
            angular_damping: 0.0,
        }
    }
}

impl IntegrationParams {
    /// Parameters without gravity or damping.
    #[must_use]
    pub fn zero_gravity() -> Self {
        Self {
            gravity: Vector3::zeros(),
            ..Default::default()
        }
    }

    /// Set the gravity.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vector3<f64>) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the drag and damping coefficients.
    #[must_use]
    pub fn with_damping(mut self, linear_drag: f64, angular_damping: f64) -> Self {
        self.linear_drag = linear_drag;
        self.angular_damping = angular_damping;
        self
    }

    /// Validate the parameters.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.gravity.iter().all(|x| x.is_finite()) {
            return Err(crate::SimError::invalid_config("gravity must be finite"));
        }
        if !(self.linear_drag.is_finite() && self.linear_drag >= 0.0) {
            return Err(crate::SimError::invalid_config(
                "linear drag must be finite and non-negative",
            ));
        }
        if !(self.angular_damping.is_finite() && self.angular_damping >= 0.0) {
            return Err(crate::SimError::invalid_config(
                "angular damping must be finite and non-negative",
            ));
        }
        Ok(())
    }
}
