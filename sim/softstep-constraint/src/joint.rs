//! The closed set of joint types and their shared solve protocol.

use softstep_types::{body_pair_mut, BodyHandle, Result, RigidBody};

use crate::{AxisJoint, DistanceJoint, FixedJoint, HingeJoint, SliderJoint};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Kind of a [`Joint`], for logging and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum JointKind {
    /// Point-to-point.
    Distance,
    /// Revolute with optional motor.
    Hinge,
    /// Prismatic.
    Slider,
    /// Range-limited travel.
    Axis,
    /// Weld.
    Fixed,
}

impl std::fmt::Display for JointKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Distance => "distance",
            Self::Hinge => "hinge",
            Self::Slider => "slider",
            Self::Axis => "axis",
            Self::Fixed => "fixed",
        };
        f.write_str(name)
    }
}

/// A joint between two bodies of a body arena.
///
/// Every variant follows the same protocol, driven by the stepper:
///
/// 1. [`pre_solve`](Self::pre_solve) once per frame
/// 2. per substep: [`warm_start`](Self::warm_start), [`solve`](Self::solve)
///    with bias, position integration, `solve` without bias
///
/// The accumulated impulses persist for the joint's whole life; they are
/// the warm-start impulses of the next substep and the next frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Joint {
    /// See [`DistanceJoint`].
    Distance(DistanceJoint),
    /// See [`HingeJoint`].
    Hinge(HingeJoint),
    /// See [`SliderJoint`].
    Slider(SliderJoint),
    /// See [`AxisJoint`].
    Axis(AxisJoint),
    /// See [`FixedJoint`].
    Fixed(FixedJoint),
}

impl Joint {
    /// The kind of this joint.
    #[must_use]
    pub fn kind(&self) -> JointKind {
        match self {
            Self::Distance(_) => JointKind::Distance,
            Self::Hinge(_) => JointKind::Hinge,
            Self::Slider(_) => JointKind::Slider,
            Self::Axis(_) => JointKind::Axis,
            Self::Fixed(_) => JointKind::Fixed,
        }
    }

    /// The `(a, b)` bodies this joint connects.
    #[must_use]
    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        match self {
            Self::Distance(j) => j.base.bodies(),
            Self::Hinge(j) => j.base.bodies(),
            Self::Slider(j) => j.base.bodies(),
            Self::Axis(j) => j.base.bodies(),
            Self::Fixed(j) => j.base.bodies(),
        }
    }

    /// Cache per-step quantities from the bodies' current state.
    pub fn pre_solve(&mut self, bodies: &[RigidBody], h: f64) {
        let (a, b) = self.bodies();
        let (a, b) = (&bodies[a.0], &bodies[b.0]);
        match self {
            Self::Distance(j) => j.pre_solve(a, b, h),
            Self::Hinge(j) => j.pre_solve(a, b, h),
            Self::Slider(j) => j.pre_solve(a, b, h),
            Self::Axis(j) => j.pre_solve(a, b, h),
            Self::Fixed(j) => j.pre_solve(a, b, h),
        }
    }

    /// Re-apply the accumulated impulses.
    pub fn warm_start(&self, bodies: &mut [RigidBody]) -> Result<()> {
        let (a, b) = self.bodies();
        let (a, b) = body_pair_mut(bodies, a, b)?;
        match self {
            Self::Distance(j) => j.warm_start(a, b),
            Self::Hinge(j) => j.warm_start(a, b),
            Self::Slider(j) => j.warm_start(a, b),
            Self::Axis(j) => j.warm_start(a, b),
            Self::Fixed(j) => j.warm_start(a, b),
        }
        Ok(())
    }

    /// One iteration; `use_bias` selects the biased or the relax pass.
    pub fn solve(&mut self, bodies: &mut [RigidBody], h: f64, use_bias: bool) -> Result<()> {
        let (a, b) = self.bodies();
        let (a, b) = body_pair_mut(bodies, a, b)?;
        match self {
            Self::Distance(j) => j.solve(a, b, use_bias),
            Self::Hinge(j) => j.solve(a, b, h, use_bias),
            Self::Slider(j) => j.solve(a, b, use_bias),
            Self::Axis(j) => j.solve(a, b, use_bias),
            Self::Fixed(j) => j.solve(a, b, use_bias),
        }
        Ok(())
    }

    /// Magnitude of the positional violation, in the joint's own units.
    #[must_use]
    pub fn position_error(&self, bodies: &[RigidBody]) -> f64 {
        let (a, b) = self.bodies();
        let (a, b) = (&bodies[a.0], &bodies[b.0]);
        match self {
            Self::Distance(j) => j.position_error(a, b),
            Self::Hinge(j) => j.position_error(a, b),
            Self::Slider(j) => j.position_error(a, b),
            Self::Axis(j) => j.position_error(a, b),
            Self::Fixed(j) => j.position_error(a, b),
        }
    }

    /// Magnitude of the accumulated constraint impulse.
    ///
    /// For hinges this excludes the motor; see [`HingeJoint::motor_impulse`].
    #[must_use]
    pub fn impulse_magnitude(&self) -> f64 {
        match self {
            Self::Distance(j) => j.linear_impulse().norm(),
            Self::Hinge(j) => j.angular_impulse().norm(),
            Self::Slider(j) => j.impulse().norm(),
            Self::Axis(j) => {
                let (lower, upper) = j.limit_impulses();
                lower + upper
            }
            Self::Fixed(j) => j.linear_impulse().norm() + j.angular_impulse().norm(),
        }
    }

    /// The hinge inside this joint, if it is one.
    #[must_use]
    pub fn as_hinge(&self) -> Option<&HingeJoint> {
        match self {
            Self::Hinge(j) => Some(j),
            _ => None,
        }
    }

    /// Mutable access to the hinge inside this joint, if it is one.
    pub fn as_hinge_mut(&mut self) -> Option<&mut HingeJoint> {
        match self {
            Self::Hinge(j) => Some(j),
            _ => None,
        }
    }

    /// The distance joint inside this joint, if it is one.
    #[must_use]
    pub fn as_distance(&self) -> Option<&DistanceJoint> {
        match self {
            Self::Distance(j) => Some(j),
            _ => None,
        }
    }
}

impl From<DistanceJoint> for Joint {
    fn from(joint: DistanceJoint) -> Self {
        Self::Distance(joint)
    }
}

impl From<HingeJoint> for Joint {
    fn from(joint: HingeJoint) -> Self {
        Self::Hinge(joint)
    }
}

impl From<SliderJoint> for Joint {
    fn from(joint: SliderJoint) -> Self {
        Self::Slider(joint)
    }
}

impl From<AxisJoint> for Joint {
    fn from(joint: AxisJoint) -> Self {
        Self::Axis(joint)
    }
}

impl From<FixedJoint> for Joint {
    fn from(joint: FixedJoint) -> Self {
        Self::Fixed(joint)
    }
}
