//! Car tuning.

use nalgebra::Vector3;
use softstep_core::{SimError, SoftnessParams};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geometry, mass and drivetrain parameters of a car.
///
/// Offsets are in the chassis frame: X right, Y forward, Z up. Wheel offsets
/// are ordered front-left, front-right, rear-left, rear-right.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CarConfig {
    /// Half extents of the chassis box (m).
    pub chassis_half_extents: Vector3<f64>,
    /// Chassis density (kg/m³).
    pub chassis_density: f64,
    /// Chassis surface friction.
    pub chassis_friction: f64,
    /// Wheel radius (m).
    pub wheel_radius: f64,
    /// Wheel density (kg/m³).
    pub wheel_density: f64,
    /// Wheel surface friction.
    pub wheel_friction: f64,
    /// Wheel centres relative to the chassis origin.
    pub wheel_offsets: [Vector3<f64>; 4],
    /// Suspension spring (distance joint between chassis and wheel).
    pub suspension: SoftnessParams,
    /// Axle stiffness (hinge alignment).
    pub axle: SoftnessParams,
    /// Drive torque per rear wheel at full throttle (N·m).
    pub drive_torque: f64,
    /// Wheel speed the drive motor aims for at full throttle (rad/s).
    pub max_wheel_speed: f64,
    /// Wheel speed when reversing (rad/s).
    pub reverse_wheel_speed: f64,
    /// Brake torque per wheel at full brake (N·m).
    pub brake_torque: f64,
    /// Front wheel steering angle at full lock (rad).
    pub max_steer_angle: f64,
    /// Planar drag on wheels touching the ground (1/s, scaled by wheel mass).
    pub rolling_resistance: f64,
    /// Extra load on wheels touching the ground (N per (m/s)² of planar speed).
    pub downforce: f64,
    /// Final drive ratio from wheel speed to engine speed. The default puts
    /// `max_wheel_speed` just under the redline.
    pub gear_ratio: f64,
    /// Engine speed at rest (rpm).
    pub idle_rpm: f64,
    /// Highest reported engine speed (rpm).
    pub redline_rpm: f64,
}

impl Default for CarConfig {
    fn default() -> Self {
        Self {
            chassis_half_extents: Vector3::new(0.9, 2.0, 0.3),
            chassis_density: 200.0,
            chassis_friction: 0.3,
            wheel_radius: 0.4,
            wheel_density: 200.0,
            wheel_friction: 0.6,
            wheel_offsets: [
                Vector3::new(-1.0, 1.4, -0.35),
                Vector3::new(1.0, 1.4, -0.35),
                Vector3::new(-1.0, -1.4, -0.35),
                Vector3::new(1.0, -1.4, -0.35),
            ],
            suspension: SoftnessParams::new(10.0, 0.7),
            axle: SoftnessParams::stiff(),
            drive_torque: 800.0,
            max_wheel_speed: 60.0,
            reverse_wheel_speed: 15.0,
            brake_torque: 1500.0,
            max_steer_angle: 0.5,
            rolling_resistance: 0.3,
            downforce: 1.5,
            gear_ratio: 12.0,
            idle_rpm: 800.0,
            redline_rpm: 7000.0,
        }
    }
}

fn positive(value: f64, name: &str) -> softstep_core::Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid_config(format!("{name} must be positive")))
    }
}

fn non_negative(value: f64, name: &str) -> softstep_core::Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid_config(format!("{name} must be non-negative")))
    }
}

impl CarConfig {
    /// Set the suspension spring.
    #[must_use]
    pub fn with_suspension(mut self, suspension: SoftnessParams) -> Self {
        self.suspension = suspension;
        self
    }

    /// Set the drive and brake torques.
    #[must_use]
    pub fn with_torques(mut self, drive: f64, brake: f64) -> Self {
        self.drive_torque = drive;
        self.brake_torque = brake;
        self
    }

    /// Set the steering lock.
    #[must_use]
    pub fn with_max_steer_angle(mut self, angle: f64) -> Self {
        self.max_steer_angle = angle;
        self
    }

    /// Engine speed (rpm) of a drive wheel spinning at `wheel_speed` rad/s,
    /// before the idle and redline limits.
    #[must_use]
    pub fn drive_rpm(&self, wheel_speed: f64) -> f64 {
        wheel_speed.abs() * self.gear_ratio * 60.0 / std::f64::consts::TAU
    }

    /// Validate the configuration.
    pub fn validate(&self) -> softstep_core::Result<()> {
        if !self
            .chassis_half_extents
            .iter()
            .all(|e| e.is_finite() && *e > 0.0)
        {
            return Err(SimError::invalid_config(
                "chassis half extents must be positive",
            ));
        }
        if !self
            .wheel_offsets
            .iter()
            .all(|o| o.iter().all(|x| x.is_finite()))
        {
            return Err(SimError::invalid_config("wheel offsets must be finite"));
        }

        positive(self.chassis_density, "chassis density")?;
        positive(self.wheel_radius, "wheel radius")?;
        positive(self.wheel_density, "wheel density")?;
        positive(self.gear_ratio, "gear ratio")?;
        non_negative(self.chassis_friction, "chassis friction")?;
        non_negative(self.wheel_friction, "wheel friction")?;
        non_negative(self.drive_torque, "drive torque")?;
        non_negative(self.brake_torque, "brake torque")?;
        non_negative(self.max_wheel_speed, "max wheel speed")?;
        non_negative(self.reverse_wheel_speed, "reverse wheel speed")?;
        non_negative(self.rolling_resistance, "rolling resistance")?;
        non_negative(self.downforce, "downforce")?;
        non_negative(self.idle_rpm, "idle rpm")?;

        if !(self.max_steer_angle.is_finite()
            && (0.0..std::f64::consts::FRAC_PI_2).contains(&self.max_steer_angle))
        {
            return Err(SimError::invalid_config(
                "max steer angle must be in [0, pi/2)",
            ));
        }
        if !(self.redline_rpm.is_finite() && self.redline_rpm > self.idle_rpm) {
            return Err(SimError::invalid_config("redline must exceed idle rpm"));
        }
        if self.drive_rpm(self.max_wheel_speed) <= self.idle_rpm {
            return Err(SimError::invalid_config(
                "gear ratio keeps the engine at idle up to max wheel speed",
            ));
        }

        self.suspension.validate()?;
        self.axle.validate()?;
        Ok(())
    }
}
