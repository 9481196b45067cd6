//! Per-wheel readouts for debug UI and audio.
//!
//! Nothing here feeds back into the solver.

use crate::config::CarConfig;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Forward speed (m/s) below which slip is measured against this floor.
pub const SLIP_SPEED_FLOOR: f64 = 0.1;

/// State of one wheel after the last step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WheelTelemetry {
    /// `(ω·r − v) / max(|v|, floor)`: positive when spinning, negative when
    /// locking up.
    pub slip_ratio: f64,
    /// Wheel spin relative to the chassis about the axle (rad/s).
    pub angular_speed: f64,
    /// Accumulated suspension impulse magnitude (N·s).
    pub suspension_impulse: f64,
    /// Accumulated axle alignment impulse magnitude (N·m·s).
    pub hinge_impulse: f64,
    /// Accumulated motor impulse (N·m·s).
    pub motor_impulse: f64,
    /// Whether the wheel is touching the ground.
    pub in_contact: bool,
}

/// Longitudinal slip of a wheel whose rim moves at `rim_speed` while the
/// car moves forward at `forward_speed`.
#[must_use]
pub fn slip_ratio(rim_speed: f64, forward_speed: f64) -> f64 {
    (rim_speed - forward_speed) / forward_speed.abs().max(SLIP_SPEED_FLOOR)
}

/// Engine speed implied by the drive wheel speed (rad/s), limited to the
/// idle-to-redline band.
#[must_use]
pub fn engine_rpm(config: &CarConfig, wheel_speed: f64) -> f64 {
    config
        .drive_rpm(wheel_speed)
        .max(config.idle_rpm)
        .min(config.redline_rpm)
}
