//! Weld joint: all six relative degrees of freedom removed.
//!
//! The translational part is a point constraint identical to
//! [`DistanceJoint`](crate::DistanceJoint). The rotational part drives the
//! relative orientation back to the one captured at creation:
//!
//! ```text
//! q_err = q_B · (q_A · q_ref)⁻¹
//! C     = 2 · vec(q_err)         (sign chosen so that w ≥ 0)
//! Ċ     = ω_B − ω_A
//! K     = I_A⁻¹ + I_B⁻¹
//! ```
//!
//! Each half has its own soft coefficients and accumulated impulse.

use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};
use softstep_types::math::{invert_or_zero_3, point_effective_mass};
use softstep_types::{RigidBody, Softness, SoftnessParams};

use crate::base::JointBase;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rigid connection between two bodies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FixedJoint {
    pub(crate) base: JointBase,
    angular_softness_params: SoftnessParams,
    angular_softness: Softness,
    /// `q_A⁻¹ · q_B` at creation.
    reference_rotation: UnitQuaternion<f64>,

    linear_impulse: Vector3<f64>,
    angular_impulse: Vector3<f64>,
    linear_mass: Matrix3<f64>,
    angular_mass: Matrix3<f64>,
}

impl FixedJoint {
    /// Weld `a` and `b` at `anchor`, preserving their current relative pose.
    pub fn new(
        a: &RigidBody,
        b: &RigidBody,
        anchor: &Point3<f64>,
        linear_softness: SoftnessParams,
        angular_softness: SoftnessParams,
    ) -> softstep_types::Result<Self> {
        let base = JointBase::new(a, b, anchor, linear_softness)?;
        angular_softness.validate()?;
        Ok(Self {
            base,
            angular_softness_params: angular_softness,
            angular_softness: Softness::RIGID,
            reference_rotation: a.unit_orientation().inverse() * b.unit_orientation(),
            linear_impulse: Vector3::zeros(),
            angular_impulse: Vector3::zeros(),
            linear_mass: Matrix3::zeros(),
            angular_mass: Matrix3::zeros(),
        })
    }

    /// Accumulated linear impulse on B (N·s).
    #[must_use]
    pub fn linear_impulse(&self) -> Vector3<f64> {
        self.linear_impulse
    }

    /// Accumulated angular impulse on B (N·m·s).
    #[must_use]
    pub fn angular_impulse(&self) -> Vector3<f64> {
        self.angular_impulse
    }

    /// Shared joint state.
    #[must_use]
    pub fn base(&self) -> &JointBase {
        &self.base
    }

    /// World-space rotation error vector `2 · vec(q_err)`.
    fn rotation_error(&self, a: &RigidBody, b: &RigidBody) -> Vector3<f64> {
        let target = a.unit_orientation() * self.reference_rotation;
        let q_err = b.unit_orientation() * target.inverse();
        let v = q_err.imag() * 2.0;
        if q_err.w < 0.0 {
            -v
        } else {
            v
        }
    }

    /// Cache both effective masses and soft coefficients for this step.
    pub fn pre_solve(&mut self, a: &RigidBody, b: &RigidBody, h: f64) {
        self.base.prepare(a, b, h);
        self.angular_softness = self.angular_softness_params.resolve(h);

        let (r_a, r_b) = self.base.lever_arms(a, b);
        let k = point_effective_mass(
            self.base.inv_mass_a + self.base.inv_mass_b,
            &r_a,
            &self.base.inv_i_a,
            &r_b,
            &self.base.inv_i_b,
        );
        self.linear_mass = invert_or_zero_3(&k);
        self.angular_mass = invert_or_zero_3(&(self.base.inv_i_a + self.base.inv_i_b));
    }

    /// Re-apply both accumulated impulses.
    pub fn warm_start(&self, a: &mut RigidBody, b: &mut RigidBody) {
        let (r_a, r_b) = self.base.lever_arms(a, b);
        self.base.apply_linear(a, b, &r_a, &r_b, &self.linear_impulse);
        self.base.apply_angular(a, b, &self.angular_impulse);
    }

    /// One soft iteration: rotation first, then translation.
    pub fn solve(&mut self, a: &mut RigidBody, b: &mut RigidBody, use_bias: bool) {
        {
            let soft = self.angular_softness.for_pass(use_bias);
            let bias = if use_bias {
                self.rotation_error(a, b) * soft.bias_rate
            } else {
                Vector3::zeros()
            };
            let cdot = b.angular_velocity - a.angular_velocity;
            let impulse = -(self.angular_mass * (cdot + bias)) * soft.mass_scale
                - self.angular_impulse * soft.impulse_scale;
            self.angular_impulse += impulse;
            self.base.apply_angular(a, b, &impulse);
        }

        let (r_a, r_b) = self.base.lever_arms(a, b);
        let soft = self.base.softness.for_pass(use_bias);
        let bias = if use_bias {
            self.base.separation(a, b, &r_a, &r_b) * soft.bias_rate
        } else {
            Vector3::zeros()
        };
        let cdot = b.velocity_at(&r_b) - a.velocity_at(&r_a);
        let impulse = -(self.linear_mass * (cdot + bias)) * soft.mass_scale
            - self.linear_impulse * soft.impulse_scale;
        self.linear_impulse += impulse;
        self.base.apply_linear(a, b, &r_a, &r_b, &impulse);
    }

    /// Anchor distance plus rotation error angle.
    #[must_use]
    pub fn position_error(&self, a: &RigidBody, b: &RigidBody) -> f64 {
        let pa = a.world_point(&self.base.local_origin_anchor_a);
        let pb = b.world_point(&self.base.local_origin_anchor_b);
        (pb - pa).norm() + self.rotation_error(a, b).norm()
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

    fn welded() -> (RigidBody, RigidBody, FixedJoint) {
        let a = RigidBody::fixed(BodyHandle(0), Point3::origin());
        let b = ball(1, Point3::new(1.0, 0.0, 0.0));
        let joint = FixedJoint::new(
            &a,
            &b,
            &Point3::new(0.5, 0.0, 0.0),
            SoftnessParams::stiff(),
            SoftnessParams::stiff(),
        )
        .unwrap();
        (a, b, joint)
    }

    #[test]
    fn relax_pass_removes_all_relative_motion() {
        let (mut a, mut b, mut joint) = welded();
        b.velocity = Vector3::new(0.4, -1.0, 2.0);
        b.angular_velocity = Vector3::new(-3.0, 0.5, 1.0);
        joint.pre_solve(&a, &b, H);

        // Alternate the two halves until the coupled system settles.
        for _ in 0..50 {
            joint.solve(&mut a, &mut b, false);
        }
        assert_relative_eq!(b.angular_velocity.norm(), 0.0, epsilon = 1e-6);
        assert_relative_eq!(b.velocity.norm(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn rotation_error_is_zero_at_creation() {
        let (a, b, joint) = welded();
        assert_relative_eq!(joint.rotation_error(&a, &b).norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(joint.position_error(&a, &b), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn twisted_weld_recovers() {
        let (a, mut b, joint) = welded();
        b.reset_to(
            b.origin(),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.2),
        );
        b.position.y += 0.05;

        let mut joint = Joint::from(joint);
        let mut bodies = vec![a, b];
        let initial = joint.position_error(&bodies);
        assert!(initial > 0.2);

        let errors = run_frames(&mut joint, &mut bodies, 15);
        assert!(errors[0] < initial);
        assert!(*errors.last().unwrap() < 1e-3);
    }
}
