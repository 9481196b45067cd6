//! Velocity motor for hinge joints.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Torque below which a motor is treated as switched off (N·m).
pub const MIN_MOTOR_TORQUE: f64 = 0.1;

/// A velocity motor driving the relative spin about a hinge axis.
///
/// The motor impulse is accumulated across substeps and clamped to
/// `±h · max_torque`, so a motor can never exceed its torque budget no matter
/// how far the bodies are from the target speed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HingeMotor {
    /// Whether the motor is driving at all.
    pub enabled: bool,
    /// Target relative angular speed about the hinge axis (rad/s).
    pub speed: f64,
    /// When set, the target speed is zero regardless of `speed`.
    pub braking: bool,
    /// Maximum torque the motor may apply (N·m).
    pub max_torque: f64,
}

impl HingeMotor {
    /// A motor driving towards `speed` with at most `max_torque`.
    #[must_use]
    pub fn velocity(speed: f64, max_torque: f64) -> Self {
        Self {
            enabled: true,
            speed,
            braking: false,
            max_torque: max_torque.abs(),
        }
    }

    /// A disabled motor (free hinge).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            enabled: false,
            speed: 0.0,
            braking: false,
            max_torque: 0.0,
        }
    }

    /// Set the braking flag.
    #[must_use]
    pub fn with_braking(mut self, braking: bool) -> Self {
        self.braking = braking;
        self
    }

    /// Whether the motor contributes an impulse this step.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enabled && self.max_torque.abs() > MIN_MOTOR_TORQUE
    }

    /// Speed the motor is currently driving towards.
    #[must_use]
    pub fn target_speed(&self) -> f64 {
        if self.braking {
            0.0
        } else {
            self.speed
        }
    }

    /// Largest accumulated impulse magnitude for a substep of length `h`.
    #[must_use]
    pub fn max_impulse(&self, h: f64) -> f64 {
        h * self.max_torque.abs()
    }
}

impl Default for HingeMotor {
    fn default() -> Self {
        Self::disabled()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn braking_targets_zero() {
        let motor = HingeMotor::velocity(12.0, 300.0);
        assert_eq!(motor.target_speed(), 12.0);
        assert_eq!(motor.with_braking(true).target_speed(), 0.0);
    }

    #[test]
    fn weak_motor_is_inactive() {
        assert!(!HingeMotor::velocity(5.0, 0.05).is_active());
        assert!(!HingeMotor::disabled().is_active());
        assert!(HingeMotor::velocity(5.0, 10.0).is_active());

        let mut off = HingeMotor::velocity(5.0, 10.0);
        off.enabled = false;
        assert!(!off.is_active());
    }

    #[test]
    fn impulse_budget_scales_with_substep() {
        let motor = HingeMotor::velocity(1.0, -200.0);
        assert_eq!(motor.max_torque, 200.0);
        assert!((motor.max_impulse(0.01) - 2.0).abs() < 1e-12);
    }
}
