//! Range limit along an axis.
//!
//! Measures the travel `x = axis · d` of B's anchor along an axis fixed in A
//! and acts only when it leaves `[range_min, range_max]`: below the range a
//! lower impulse pushes B forward along the axis, above it an upper impulse
//! pushes B back. Each side's accumulated impulse is non-negative. Inside the
//! range the joint applies nothing.

use nalgebra::{Point3, Vector3};
use softstep_types::math::invert_or_zero;
use softstep_types::{RigidBody, SimError, SoftnessParams};

use crate::base::JointBase;
use crate::slider::{local_axis, SlideFrame};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which side of the range, if any, the travel has left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Violation {
    None,
    Lower,
    Upper,
}

/// One-sided travel limit along an axis.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AxisJoint {
    pub(crate) base: JointBase,
    local_axis_a: Vector3<f64>,
    range_min: f64,
    range_max: f64,
    lower_impulse: f64,
    upper_impulse: f64,
    axial_mass: f64,
}

impl AxisJoint {
    /// Limit the travel of `b` along the world-space `axis` through `anchor`.
    pub fn new(
        a: &RigidBody,
        b: &RigidBody,
        anchor: &Point3<f64>,
        axis: &Vector3<f64>,
        range_min: f64,
        range_max: f64,
        softness: SoftnessParams,
    ) -> softstep_types::Result<Self> {
        if !(range_min.is_finite() && range_max.is_finite()) || range_min > range_max {
            return Err(SimError::invalid_joint(format!(
                "axis range [{range_min}, {range_max}] is empty"
            )));
        }
        Ok(Self {
            base: JointBase::new(a, b, anchor, softness)?,
            local_axis_a: local_axis(a, axis)?,
            range_min,
            range_max,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            axial_mass: 0.0,
        })
    }

    /// The permitted travel `[min, max]`.
    #[must_use]
    pub fn range(&self) -> (f64, f64) {
        (self.range_min, self.range_max)
    }

    /// Accumulated `(lower, upper)` limit impulses (N·s), both non-negative.
    #[must_use]
    pub fn limit_impulses(&self) -> (f64, f64) {
        (self.lower_impulse, self.upper_impulse)
    }

    /// Shared joint state.
    #[must_use]
    pub fn base(&self) -> &JointBase {
        &self.base
    }

    /// Signed travel of B's anchor along the axis.
    #[must_use]
    pub fn travel(&self, a: &RigidBody, b: &RigidBody) -> f64 {
        let frame = SlideFrame::current(&self.base, &self.local_axis_a, a, b);
        frame.axis.dot(&frame.d)
    }

    fn violation(&self, travel: f64) -> Violation {
        if travel < self.range_min {
            Violation::Lower
        } else if travel > self.range_max {
            Violation::Upper
        } else {
            Violation::None
        }
    }

    /// Drop the accumulated impulse of every side that is not violated.
    fn release_inactive(&mut self, violation: Violation) {
        if violation != Violation::Lower {
            self.lower_impulse = 0.0;
        }
        if violation != Violation::Upper {
            self.upper_impulse = 0.0;
        }
    }

    fn apply(&self, a: &mut RigidBody, b: &mut RigidBody, frame: &SlideFrame, lambda: f64) {
        let p = frame.axis * lambda;
        self.base.apply_linear(a, b, &frame.lever_a(), &frame.r_b, &p);
    }

    /// Cache the axial effective mass and soft coefficients for this step.
    pub fn pre_solve(&mut self, a: &RigidBody, b: &RigidBody, h: f64) {
        self.base.prepare(a, b, h);
        let frame = SlideFrame::new(&self.base, &self.local_axis_a, a, b);
        let a1 = frame.lever_a().cross(&frame.axis);
        let a2 = frame.r_b.cross(&frame.axis);
        let k = self.base.inv_mass_a
            + self.base.inv_mass_b
            + a1.dot(&(self.base.inv_i_a * a1))
            + a2.dot(&(self.base.inv_i_b * a2));
        self.axial_mass = invert_or_zero(k);
        self.release_inactive(self.violation(frame.axis.dot(&frame.d)));
    }

    /// Re-apply the impulse of whichever limit is currently violated.
    pub fn warm_start(&self, a: &mut RigidBody, b: &mut RigidBody) {
        let frame = SlideFrame::new(&self.base, &self.local_axis_a, a, b);
        let lambda = match self.violation(frame.axis.dot(&frame.d)) {
            Violation::Lower => self.lower_impulse,
            Violation::Upper => -self.upper_impulse,
            Violation::None => return,
        };
        self.apply(a, b, &frame, lambda);
    }

    /// One soft iteration of the violated limit, if any.
    pub fn solve(&mut self, a: &mut RigidBody, b: &mut RigidBody, use_bias: bool) {
        let frame = SlideFrame::new(&self.base, &self.local_axis_a, a, b);
        let travel = frame.axis.dot(&frame.d);
        let violation = self.violation(travel);
        self.release_inactive(violation);
        if violation == Violation::None {
            return;
        }

        let soft = self.base.softness.for_pass(use_bias);
        let vn = frame.axis.dot(&frame.relative_velocity(a, b));

        match violation {
            Violation::Lower => {
                let c = travel - self.range_min;
                let impulse = -self.axial_mass * soft.mass_scale * (vn + soft.bias_rate * c)
                    - soft.impulse_scale * self.lower_impulse;
                let old = self.lower_impulse;
                self.lower_impulse = (old + impulse).max(0.0);
                self.apply(a, b, &frame, self.lower_impulse - old);
            }
            Violation::Upper => {
                let c = self.range_max - travel;
                let impulse = -self.axial_mass * soft.mass_scale * (-vn + soft.bias_rate * c)
                    - soft.impulse_scale * self.upper_impulse;
                let old = self.upper_impulse;
                self.upper_impulse = (old + impulse).max(0.0);
                self.apply(a, b, &frame, -(self.upper_impulse - old));
            }
            Violation::None => {}
        }
    }

    /// How far the travel lies outside the range (0 inside it).
    #[must_use]
    pub fn position_error(&self, a: &RigidBody, b: &RigidBody) -> f64 {
        let travel = self.travel(a, b);
        (self.range_min - travel).max(travel - self.range_max).max(0.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::test_util::{ball, run_frames, H};
    use crate::Joint;
    use approx::assert_relative_eq;
    use softstep_types::BodyHandle;

    fn limited(min: f64, max: f64) -> (RigidBody, RigidBody, AxisJoint) {
        let a = RigidBody::fixed(BodyHandle(0), Point3::origin());
        let b = ball(1, Point3::new(0.0, 0.0, 1.0));
        let joint = AxisJoint::new(
            &a,
            &b,
            &Point3::new(0.0, 0.0, 1.0),
            &Vector3::z(),
            min,
            max,
            SoftnessParams::stiff(),
        )
        .unwrap();
        (a, b, joint)
    }

    #[test]
    fn rejects_inverted_range() {
        let a = RigidBody::fixed(BodyHandle(0), Point3::origin());
        let b = ball(1, Point3::new(0.0, 0.0, 1.0));
        let result = AxisJoint::new(
            &a,
            &b,
            &Point3::origin(),
            &Vector3::z(),
            0.5,
            -0.5,
            SoftnessParams::stiff(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn inactive_inside_range() {
        let (mut a, mut b, mut joint) = limited(-0.2, 0.2);
        b.velocity = Vector3::new(0.3, 0.0, -1.0);
        joint.pre_solve(&a, &b, H);
        let before = b.clone();
        joint.warm_start(&mut a, &mut b);
        joint.solve(&mut a, &mut b, true);
        joint.solve(&mut a, &mut b, false);
        assert_eq!(b.velocity, before.velocity);
        assert_eq!(joint.limit_impulses(), (0.0, 0.0));
    }

    #[test]
    fn lower_limit_pushes_forward() {
        let (mut a, mut b, mut joint) = limited(-0.2, 0.2);
        b.position.z -= 0.3;
        b.velocity = Vector3::new(0.0, 0.0, -1.0);
        joint.pre_solve(&a, &b, H);
        joint.solve(&mut a, &mut b, true);
        let (lower, upper) = joint.limit_impulses();
        assert!(lower > 0.0);
        assert_eq!(upper, 0.0);
        assert!(b.velocity.z > 0.0);
    }

    #[test]
    fn released_limit_does_not_warm_start() {
        let (mut a, mut b, mut joint) = limited(-0.2, 0.2);
        b.position.z -= 0.3;
        b.velocity = Vector3::new(0.0, 0.0, -1.0);
        joint.pre_solve(&a, &b, H);
        joint.solve(&mut a, &mut b, true);
        assert!(joint.limit_impulses().0 > 0.0);

        // Next frame starts back inside the range.
        b.position.z += 0.3;
        b.velocity = Vector3::zeros();
        joint.pre_solve(&a, &b, H);
        assert_eq!(joint.limit_impulses(), (0.0, 0.0));

        // Crossing the lower limit again mid-frame starts from nothing.
        b.delta_position.z = -0.3;
        joint.warm_start(&mut a, &mut b);
        assert_eq!(b.velocity, Vector3::zeros());
        assert_eq!(b.angular_velocity, Vector3::zeros());
    }

    #[test]
    fn switching_sides_drops_the_other_impulse() {
        let (mut a, mut b, mut joint) = limited(-0.2, 0.2);
        b.position.z -= 0.3;
        b.velocity = Vector3::new(0.0, 0.0, -1.0);
        joint.pre_solve(&a, &b, H);
        joint.solve(&mut a, &mut b, true);
        assert!(joint.limit_impulses().0 > 0.0);

        b.position.z += 0.6;
        b.velocity = Vector3::new(0.0, 0.0, 1.0);
        joint.pre_solve(&a, &b, H);
        assert_eq!(joint.limit_impulses().0, 0.0);
        joint.solve(&mut a, &mut b, true);
        let (lower, upper) = joint.limit_impulses();
        assert_eq!(lower, 0.0);
        assert!(upper > 0.0);
        assert!(b.velocity.z < 1.0);
    }

    #[test]
    fn upper_limit_never_pulls() {
        let (mut a, mut b, mut joint) = limited(-0.2, 0.2);
        b.position.z += 0.3;
        // Already moving back into range fast enough: no impulse needed.
        b.velocity = Vector3::new(0.0, 0.0, -100.0);
        joint.pre_solve(&a, &b, H);
        joint.solve(&mut a, &mut b, true);
        assert_eq!(joint.limit_impulses(), (0.0, 0.0));
        assert_relative_eq!(b.velocity.z, -100.0);
    }

    #[test]
    fn overshoot_converges_back_to_range() {
        let (a, mut b, joint) = limited(-0.2, 0.2);
        b.position.z += 0.3;
        let mut joint = Joint::from(joint);
        let mut bodies = vec![a, b];
        let initial = joint.position_error(&bodies);
        assert_relative_eq!(initial, 0.1, epsilon = 1e-12);

        let errors = run_frames(&mut joint, &mut bodies, 10);
        assert!(*errors.last().unwrap() < 1e-3);
    }
}
