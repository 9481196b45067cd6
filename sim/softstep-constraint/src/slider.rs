//! Slider joint: two translational degrees of freedom removed.
//!
//! The anchor on B may only move along an axis fixed in A. With `n1, n2`
//! spanning the plane perpendicular to the axis and `d` the vector from
//! anchor A to anchor B:
//!
//! ```text
//! C = [n1 · d, n2 · d]
//! ```
//!
//! Body A's lever arm is measured to anchor B (`r_A + d`) since the
//! constraint acts where B's anchor currently sits.

use nalgebra::{Matrix2, Point3, Vector2, Vector3};
use softstep_types::math::{compute_basis, invert_or_zero_2};
use softstep_types::{RigidBody, SimError, SoftnessParams};

use crate::base::JointBase;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Prismatic joint without limits.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SliderJoint {
    pub(crate) base: JointBase,
    local_axis_a: Vector3<f64>,
    impulse: Vector2<f64>,
    effective_mass: Matrix2<f64>,
}

/// Slide geometry for the current orientations.
pub(crate) struct SlideFrame {
    pub r_a: Vector3<f64>,
    pub r_b: Vector3<f64>,
    pub axis: Vector3<f64>,
    pub d: Vector3<f64>,
}

impl SlideFrame {
    pub(crate) fn new(
        base: &JointBase,
        local_axis_a: &Vector3<f64>,
        a: &RigidBody,
        b: &RigidBody,
    ) -> Self {
        let (r_a, r_b) = base.lever_arms(a, b);
        Self {
            axis: a.rotation * local_axis_a,
            d: base.separation(a, b, &r_a, &r_b),
            r_a,
            r_b,
        }
    }

    /// Geometry from absolute positions, valid outside a step.
    pub(crate) fn current(
        base: &JointBase,
        local_axis_a: &Vector3<f64>,
        a: &RigidBody,
        b: &RigidBody,
    ) -> Self {
        let (r_a, r_b) = base.lever_arms(a, b);
        Self {
            axis: a.rotation * local_axis_a,
            d: base.current_separation(a, b, &r_a, &r_b),
            r_a,
            r_b,
        }
    }

    /// Lever arm on A, measured to B's anchor.
    pub(crate) fn lever_a(&self) -> Vector3<f64> {
        self.r_a + self.d
    }

    /// Relative velocity of B's anchor seen from A along the constraint.
    pub(crate) fn relative_velocity(&self, a: &RigidBody, b: &RigidBody) -> Vector3<f64> {
        b.velocity_at(&self.r_b) - a.velocity_at(&self.lever_a())
    }
}

pub(crate) fn local_axis(a: &RigidBody, axis: &Vector3<f64>) -> softstep_types::Result<Vector3<f64>> {
    if axis.norm() < f64::EPSILON {
        return Err(SimError::invalid_joint("slide axis must be non-zero"));
    }
    Ok(a.rotation.transpose() * axis.normalize())
}

impl SliderJoint {
    /// Let `b` slide along the world-space `axis` through `anchor`.
    pub fn new(
        a: &RigidBody,
        b: &RigidBody,
        anchor: &Point3<f64>,
        axis: &Vector3<f64>,
        softness: SoftnessParams,
    ) -> softstep_types::Result<Self> {
        Ok(Self {
            base: JointBase::new(a, b, anchor, softness)?,
            local_axis_a: local_axis(a, axis)?,
            impulse: Vector2::zeros(),
            effective_mass: Matrix2::zeros(),
        })
    }

    /// Accumulated perpendicular impulse (N·s).
    #[must_use]
    pub fn impulse(&self) -> Vector2<f64> {
        self.impulse
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

    fn apply(&self, a: &mut RigidBody, b: &mut RigidBody, frame: &SlideFrame, p: &Vector3<f64>) {
        let lever_a = frame.lever_a();
        self.base.apply_linear(a, b, &lever_a, &frame.r_b, p);
    }

    /// Cache the effective mass and soft coefficients for this step.
    pub fn pre_solve(&mut self, a: &RigidBody, b: &RigidBody, h: f64) {
        self.base.prepare(a, b, h);
        let frame = SlideFrame::new(&self.base, &self.local_axis_a, a, b);
        let (n1, n2) = compute_basis(&frame.axis);
        let lever_a = frame.lever_a();

        let inv_mass = self.base.inv_mass_a + self.base.inv_mass_b;
        let a1 = lever_a.cross(&n1);
        let a2 = lever_a.cross(&n2);
        let b1 = frame.r_b.cross(&n1);
        let b2 = frame.r_b.cross(&n2);
        let (ia, ib) = (&self.base.inv_i_a, &self.base.inv_i_b);

        let k11 = inv_mass + a1.dot(&(ia * a1)) + b1.dot(&(ib * b1));
        let k12 = a1.dot(&(ia * a2)) + b1.dot(&(ib * b2));
        let k22 = inv_mass + a2.dot(&(ia * a2)) + b2.dot(&(ib * b2));
        self.effective_mass = invert_or_zero_2(&Matrix2::new(k11, k12, k12, k22));
    }

    /// Re-apply the accumulated impulse.
    pub fn warm_start(&self, a: &mut RigidBody, b: &mut RigidBody) {
        let frame = SlideFrame::new(&self.base, &self.local_axis_a, a, b);
        let (n1, n2) = compute_basis(&frame.axis);
        let p = n1 * self.impulse.x + n2 * self.impulse.y;
        self.apply(a, b, &frame, &p);
    }

    /// One soft iteration.
    pub fn solve(&mut self, a: &mut RigidBody, b: &mut RigidBody, use_bias: bool) {
        let frame = SlideFrame::new(&self.base, &self.local_axis_a, a, b);
        let (n1, n2) = compute_basis(&frame.axis);
        let soft = self.base.softness.for_pass(use_bias);

        let dv = frame.relative_velocity(a, b);
        let cdot = Vector2::new(n1.dot(&dv), n2.dot(&dv));
        let bias = Vector2::new(n1.dot(&frame.d), n2.dot(&frame.d)) * soft.bias_rate;

        let impulse = -(self.effective_mass * (cdot + bias)) * soft.mass_scale
            - self.impulse * soft.impulse_scale;
        self.impulse += impulse;

        let p = n1 * impulse.x + n2 * impulse.y;
        self.apply(a, b, &frame, &p);
    }

    /// Distance of B's anchor from the slide axis.
    #[must_use]
    pub fn position_error(&self, a: &RigidBody, b: &RigidBody) -> f64 {
        let frame = SlideFrame::current(&self.base, &self.local_axis_a, a, b);
        (frame.d - frame.axis * frame.axis.dot(&frame.d)).norm()
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

    fn rail() -> (RigidBody, RigidBody, SliderJoint) {
        let a = RigidBody::fixed(BodyHandle(0), Point3::origin());
        let b = ball(1, Point3::new(0.0, 0.0, 1.0));
        let joint = SliderJoint::new(
            &a,
            &b,
            &Point3::new(0.0, 0.0, 1.0),
            &Vector3::z(),
            SoftnessParams::stiff(),
        )
        .unwrap();
        (a, b, joint)
    }

    #[test]
    fn motion_along_axis_is_free() {
        let (mut a, mut b, mut joint) = rail();
        b.velocity = Vector3::new(0.0, 0.0, 2.0);
        joint.pre_solve(&a, &b, H);
        joint.solve(&mut a, &mut b, true);
        joint.solve(&mut a, &mut b, false);
        assert_relative_eq!(b.velocity, Vector3::new(0.0, 0.0, 2.0), epsilon = 1e-9);
    }

    #[test]
    fn sideways_motion_is_removed() {
        let (mut a, mut b, mut joint) = rail();
        b.velocity = Vector3::new(1.5, -0.5, 2.0);
        joint.pre_solve(&a, &b, H);
        joint.solve(&mut a, &mut b, false);
        assert_relative_eq!(b.velocity.x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(b.velocity.y, 0.0, epsilon = 1e-9);
        assert_relative_eq!(b.velocity.z, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn travel_measures_axial_offset() {
        let (a, mut b, joint) = rail();
        assert_relative_eq!(joint.travel(&a, &b), 0.0, epsilon = 1e-12);
        b.position.z += 0.25;
        assert_relative_eq!(joint.travel(&a, &b), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn lateral_offset_converges() {
        let (a, mut b, joint) = rail();
        b.position.x += 0.1;
        let mut joint = Joint::from(joint);
        let mut bodies = vec![a, b];
        let initial = joint.position_error(&bodies);
        assert_relative_eq!(initial, 0.1, epsilon = 1e-12);

        let errors = run_frames(&mut joint, &mut bodies, 10);
        assert!(errors[0] < initial);
        assert!(*errors.last().unwrap() < 1e-3);
    }
}
