//! Point-to-point joint.
//!
//! Keeps an anchor on body A coincident with an anchor on body B, removing
//! the three relative translational degrees of freedom while leaving rotation
//! free. A wheel's suspension is one of these with a low frequency.
//!
//! ```text
//! C    = Δc + (Δp_B − Δp_A) + r_B − r_A
//! Ċ    = v_B + ω_B × r_B − v_A − ω_A × r_A
//! K    = (m_A⁻¹ + m_B⁻¹)·I − [r_A]× I_A⁻¹ [r_A]× − [r_B]× I_B⁻¹ [r_B]×
//! ```

use nalgebra::{Matrix3, Point3, Vector3};
use softstep_types::math::{invert_or_zero_3, point_effective_mass};
use softstep_types::{RigidBody, SoftnessParams};

use crate::base::JointBase;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ball-socket joint between two bodies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DistanceJoint {
    pub(crate) base: JointBase,
    linear_impulse: Vector3<f64>,
    effective_mass: Matrix3<f64>,
}

impl DistanceJoint {
    /// Pin `a` and `b` together at the world point `anchor`.
    pub fn new(
        a: &RigidBody,
        b: &RigidBody,
        anchor: &Point3<f64>,
        softness: SoftnessParams,
    ) -> softstep_types::Result<Self> {
        Ok(Self {
            base: JointBase::new(a, b, anchor, softness)?,
            linear_impulse: Vector3::zeros(),
            effective_mass: Matrix3::zeros(),
        })
    }

    /// Accumulated linear impulse applied to B (N·s).
    #[must_use]
    pub fn linear_impulse(&self) -> Vector3<f64> {
        self.linear_impulse
    }

    /// Shared joint state.
    #[must_use]
    pub fn base(&self) -> &JointBase {
        &self.base
    }

    /// Cache the effective mass and soft coefficients for this step.
    pub fn pre_solve(&mut self, a: &RigidBody, b: &RigidBody, h: f64) {
        self.base.prepare(a, b, h);
        let (r_a, r_b) = self.base.lever_arms(a, b);
        let k = point_effective_mass(
            self.base.inv_mass_a + self.base.inv_mass_b,
            &r_a,
            &self.base.inv_i_a,
            &r_b,
            &self.base.inv_i_b,
        );
        self.effective_mass = invert_or_zero_3(&k);
    }

    /// Re-apply the accumulated impulse.
    pub fn warm_start(&self, a: &mut RigidBody, b: &mut RigidBody) {
        let (r_a, r_b) = self.base.lever_arms(a, b);
        self.base.apply_linear(a, b, &r_a, &r_b, &self.linear_impulse);
    }

    /// One soft iteration; `use_bias` selects the biased or relax pass.
    pub fn solve(&mut self, a: &mut RigidBody, b: &mut RigidBody, use_bias: bool) {
        let (r_a, r_b) = self.base.lever_arms(a, b);
        let soft = self.base.softness.for_pass(use_bias);

        let bias = if use_bias {
            self.base.separation(a, b, &r_a, &r_b) * soft.bias_rate
        } else {
            Vector3::zeros()
        };
        let cdot = b.velocity_at(&r_b) - a.velocity_at(&r_a);

        let impulse = -(self.effective_mass * (cdot + bias)) * soft.mass_scale
            - self.linear_impulse * soft.impulse_scale;
        self.linear_impulse += impulse;

        self.base.apply_linear(a, b, &r_a, &r_b, &impulse);
    }

    /// World-space distance between the two anchors.
    #[must_use]
    pub fn position_error(&self, a: &RigidBody, b: &RigidBody) -> f64 {
        let pa = a.world_point(&self.base.local_origin_anchor_a);
        let pb = b.world_point(&self.base.local_origin_anchor_b);
        (pb - pa).norm()
    }
}
