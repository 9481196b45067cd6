//! Driver input and its mapping onto wheel motors.

use softstep_core::HingeMotor;

use crate::config::CarConfig;
use crate::WheelPosition;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Forward speed (m/s) above which the brake pedal brakes instead of
/// selecting reverse.
pub const REVERSE_THRESHOLD: f64 = 0.5;

/// One frame of driver controls.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DriverInput {
    /// Accelerator, 0 to 1.
    pub throttle: f64,
    /// Brake pedal, 0 to 1. Reverses once the car is nearly stopped.
    pub brake: f64,
    /// Steering, −1 (full right) to 1 (full left).
    pub steer: f64,
    /// Locks the rear wheels.
    pub handbrake: bool,
    /// Put the car back at its spawn point.
    pub reset: bool,
}

fn unit(value: f64, min: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, 1.0)
    } else {
        0.0
    }
}

impl DriverInput {
    /// Full throttle, no steering.
    #[must_use]
    pub fn accelerate() -> Self {
        Self {
            throttle: 1.0,
            ..Default::default()
        }
    }

    /// Set the steering.
    #[must_use]
    pub fn with_steer(mut self, steer: f64) -> Self {
        self.steer = steer;
        self
    }

    /// Axes clamped to their ranges; non-finite axes read as zero.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            throttle: unit(self.throttle, 0.0),
            brake: unit(self.brake, 0.0),
            steer: unit(self.steer, -1.0),
            ..*self
        }
    }

    /// Motor setting for the wheel at `position`, given the car's forward
    /// speed. Expects clamped input.
    pub(crate) fn motor_for(
        &self,
        config: &CarConfig,
        position: WheelPosition,
        forward_speed: f64,
    ) -> HingeMotor {
        if self.handbrake && position.is_rear() {
            return HingeMotor::velocity(0.0, config.brake_torque).with_braking(true);
        }

        if self.brake > 0.0 {
            if forward_speed > REVERSE_THRESHOLD {
                return HingeMotor::velocity(0.0, config.brake_torque * self.brake)
                    .with_braking(true);
            }
            if position.is_rear() {
                return HingeMotor::velocity(
                    -config.reverse_wheel_speed,
                    config.drive_torque * self.brake,
                );
            }
            return HingeMotor::disabled();
        }

        if self.throttle > 0.0 && position.is_rear() {
            return HingeMotor::velocity(config.max_wheel_speed, config.drive_torque * self.throttle);
        }

        HingeMotor::disabled()
    }
}
