//! Soft-constraint coefficients.
//!
//! A soft constraint behaves like a spring-damper with a target frequency and
//! damping ratio instead of a rigid positional correction. For a substep of
//! length `h`:
//!
//! ```text
//! ω = 2π f
//! c = h ω (2ζ + h ω)
//! bias_rate     = ω / (2ζ + h ω)
//! impulse_scale = 1 / (1 + c)
//! mass_scale    = c / (1 + c)
//! ```
//!
//! A constraint solve then computes
//!
//! ```text
//! λ = −mass_scale · K⁻¹ (Jv + bias_rate · C) − impulse_scale · λ_total
//! ```
//!
//! The bias scales with `h` consistently, so shrinking the substep does not
//! inject extra energy the way plain Baumgarte stabilization does.

use std::f64::consts::TAU;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Coefficients of a soft constraint for one substep size.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Softness {
    /// Multiplies the position error to form the velocity bias (1/s).
    pub bias_rate: f64,
    /// Scales the effective mass.
    pub mass_scale: f64,
    /// Scales the accumulated impulse subtracted each iteration.
    pub impulse_scale: f64,
}

impl Softness {
    /// Rigid velocity constraint: no bias, full mass, no impulse feedback.
    pub const RIGID: Self = Self {
        bias_rate: 0.0,
        mass_scale: 1.0,
        impulse_scale: 0.0,
    };

    /// Compute coefficients for `hertz` and `damping_ratio` at substep `h`.
    ///
    /// A zero frequency yields [`Softness::RIGID`], a pure velocity constraint
    /// with no positional correction.
    #[must_use]
    pub fn new(hertz: f64, damping_ratio: f64, h: f64) -> Self {
        if hertz == 0.0 {
            return Self::RIGID;
        }

        let omega = TAU * hertz;
        let a1 = 2.0 * damping_ratio + h * omega;
        let a2 = h * omega * a1;
        let a3 = 1.0 / (1.0 + a2);

        Self {
            bias_rate: omega / a1,
            mass_scale: a2 * a3,
            impulse_scale: a3,
        }
    }

    /// Coefficients for the given pass: `self` when biased, rigid otherwise.
    #[must_use]
    pub fn for_pass(&self, use_bias: bool) -> Self {
        if use_bias {
            *self
        } else {
            Self::RIGID
        }
    }
}

impl Default for Softness {
    fn default() -> Self {
        Self::RIGID
    }
}

/// Frequency and damping ratio describing a soft constraint.
///
/// Resolved into [`Softness`] once per step via [`SoftnessParams::resolve`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SoftnessParams {
    /// Target frequency in Hz.
    pub hertz: f64,
    /// Damping ratio (1.0 = critical).
    pub damping_ratio: f64,
}

impl SoftnessParams {
    /// Create softness parameters.
    #[must_use]
    pub const fn new(hertz: f64, damping_ratio: f64) -> Self {
        Self {
            hertz,
            damping_ratio,
        }
    }

    /// Stiff joint preset (60 Hz, damping ratio 2).
    #[must_use]
    pub const fn stiff() -> Self {
        Self::new(60.0, 2.0)
    }

    /// Resolve into coefficients for substep `h`.
    #[must_use]
    pub fn resolve(&self, h: f64) -> Softness {
        Softness::new(self.hertz, self.damping_ratio, h)
    }

    /// Validate the parameters.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.hertz.is_finite() || self.hertz < 0.0 {
            return Err(crate::SimError::invalid_config(
                "softness hertz must be finite and non-negative",
            ));
        }
        if !self.damping_ratio.is_finite() || self.damping_ratio < 0.0 {
            return Err(crate::SimError::invalid_config(
                "softness damping ratio must be finite and non-negative",
            ));
        }
        Ok(())
    }
}

impl Default for SoftnessParams {
    fn default() -> Self {
        Self::stiff()
    }
}
